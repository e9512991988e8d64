//! Tracing set-up for the `sweep` binary.
//!
//! The core crates open `debug`-level spans around the scan pipeline:
//! `cone_scan` (one per fan, with its ray count and heading), `trail_query`
//! (one per display refresh) and `trail_prune`. With
//! `OTEL_EXPORTER_OTLP_ENDPOINT` set, those spans are shipped to an OTLP/HTTP
//! collector as well as filtered by `RUST_LOG`, e.g.
//! `RUST_LOG=sweep_perception=debug`.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Filter directives (default `"info"`). |
//! | `SWEEP_LOG_FORMAT=json` | Newline-delimited JSON instead of compact text. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Collector base URL, e.g. `http://localhost:4318`. |

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// Console output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Everything [`init_tracing`] reads from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub filter: String,
    pub format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`; blank values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            format: match get("SWEEP_LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Compact,
            },
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|e| {
            eprintln!("[sweep] ignoring RUST_LOG '{}': {e}", self.filter);
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive until exit; dropping it flushes and shuts
/// down the OTLP exporter, if one was started.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let settings = TelemetrySettings::from_env();
    let provider = settings
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(service_name, endpoint));

    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("sweep")));
    let (json, compact) = match settings.format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Compact => (None, Some(fmt::layer().compact())),
    };

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(otel)
        .with(json)
        .with(compact)
        .init();

    TracerProviderGuard(provider)
}

/// Shuts the OTLP provider down on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[sweep] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

/// OTLP/HTTP provider using the simple exporter; the frame loop has no
/// async runtime to drive a batch one. Failures go to stderr because no
/// subscriber exists yet.
fn build_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[sweep] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use sweep_perception::{ConeScanner, GridMap, TrailDecayManager};
    use sweep_types::{ConeConfig, Point2, Pose};
    use tracing::span;
    use tracing_subscriber::layer::{Context, Layer};

    fn settings(vars: &[(&str, &str)]) -> TelemetrySettings {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        TelemetrySettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let s = settings(&[]);
        assert_eq!(s.filter, "info");
        assert_eq!(s.format, LogFormat::Compact);
        assert_eq!(s.otlp_endpoint, None);
    }

    #[test]
    fn variables_are_honoured() {
        let s = settings(&[
            ("RUST_LOG", "sweep_perception=debug"),
            ("SWEEP_LOG_FORMAT", "json"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4318"),
        ]);
        assert_eq!(s.filter, "sweep_perception=debug");
        assert_eq!(s.format, LogFormat::Json);
        assert_eq!(s.otlp_endpoint.as_deref(), Some("http://localhost:4318"));
    }

    #[test]
    fn blank_endpoint_and_unknown_format_are_ignored() {
        let s = settings(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "  "), ("SWEEP_LOG_FORMAT", "xml")]);
        assert_eq!(s.otlp_endpoint, None);
        assert_eq!(s.format, LogFormat::Compact);
    }

    #[test]
    fn tracer_provider_guard_drop_with_none_is_safe() {
        drop(TracerProviderGuard(None));
    }

    /// Collects the name of every span opened under it.
    struct SpanNames(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for SpanNames {
        fn on_new_span(&self, attrs: &span::Attributes<'_>, _id: &span::Id, _ctx: Context<'_, S>) {
            if let Ok(mut names) = self.0.lock() {
                names.push(attrs.metadata().name().to_string());
            }
        }
    }

    #[test]
    fn scan_pipeline_opens_spans() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanNames(names.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let grid = GridMap::from_occupied(20, 15, 40.0, [(5, 4)]).unwrap();
            let scanner = ConeScanner::new(ConeConfig::default()).unwrap();
            let mut trail = TrailDecayManager::default();
            let now = Instant::now();
            trail.record(scanner.scan_at(&Pose::new(Point2::new(200.0, 120.0), 90.0), &grid, now));
            trail.query(now + Duration::from_millis(100));
        });

        let names = names.lock().unwrap();
        for expected in ["cone_scan", "trail_query", "trail_prune"] {
            assert!(names.iter().any(|n| n == expected), "no {expected} span in {names:?}");
        }
    }
}
