//! `sweep` – terminal front end for the cone LiDAR simulator.
//!
//! 1. Initialises tracing (optionally exporting spans over OTLP).
//! 2. Loads `~/.sweep/config.toml`, writing the defaults on first run.
//! 3. Builds the grid, scanner and trail, then drops into the REPL frame
//!    loop.
//! 4. Intercepts **Ctrl-C** and leaves the loop cleanly.

mod config;
mod emitter;
mod render;
mod repl;
mod telemetry;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let _telemetry = telemetry::init_tracing("sweep");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – leaving the frame loop …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to exit");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            info!(path = %config::config_path().display(), "Config loaded");
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "Could not write default config"),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let session = match repl::Session::from_config(&cfg) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            println!("{}: {}", "Cannot start".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "  Cone {}° wide, {} rays, range {}",
        (cfg.cone.half_width_deg * 2.0).to_string().bold(),
        cfg.cone_config().ray_count().to_string().bold(),
        cfg.cone.max_range.to_string().bold()
    );
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    repl::run(session, shutdown);
    ExitCode::SUCCESS
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════╗".bold().green());
    println!("{}", "  ║     S W E E P  ·  LiDAR      ║".bold().green());
    println!("{}", "  ╚══════════════════════════════╝".bold().green());
    println!();
    println!("  {} {}",
        "Sweep".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Cone LiDAR over an occupancy grid");
    println!();
}
