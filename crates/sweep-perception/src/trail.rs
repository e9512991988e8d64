//! Time-decayed scan history.
//!
//! [`TrailDecayManager`] keeps every recorded [`ScanResult`] until it has
//! fully faded. A sample's intensity falls linearly from 1 at creation to 0
//! once `fade_window` has elapsed:
//!
//! ```text
//! intensity = clamp(1 − elapsed / fade_window, 0, 1)
//! ```
//!
//! History is ordered by creation time, so pruning walks from the oldest
//! entry and stops at the first one that is still visible.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use sweep_perception::{grid::GridMap, scanner::ConeScanner, trail::TrailDecayManager};
//! use sweep_types::{ConeConfig, Point2, Pose};
//!
//! let grid = GridMap::new(10, 10, 1.0).unwrap();
//! let scanner = ConeScanner::new(ConeConfig {
//!     half_width_deg: 0.0,
//!     angular_step_deg: 1.0,
//!     max_range: 3.0,
//! })
//! .unwrap();
//! let mut trail = TrailDecayManager::new(Duration::from_secs(1)).unwrap();
//!
//! let t0 = Instant::now();
//! trail.record(scanner.scan_at(&Pose::new(Point2::new(5.0, 5.0), 0.0), &grid, t0));
//!
//! let half = trail.query(t0 + Duration::from_millis(500));
//! assert_eq!(half.len(), 1);
//! assert!((half[0].intensity - 0.5).abs() < 1e-9);
//!
//! assert!(trail.query(t0 + Duration::from_secs(1)).is_empty());
//! assert!(trail.is_empty());
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use sweep_types::{DecayedSample, ScanResult, SweepError};
use tracing::debug;

/// Fade window of the reference display: one second from full to invisible.
pub const DEFAULT_FADE_WINDOW: Duration = Duration::from_secs(1);

/// Intensity of a sample created at `created_at`, observed at `now`.
///
/// `now` earlier than `created_at` counts as zero elapsed time.
pub fn intensity(created_at: Instant, now: Instant, fade_window: Duration) -> f64 {
    let elapsed = now.saturating_duration_since(created_at);
    (1.0 - elapsed.as_secs_f64() / fade_window.as_secs_f64()).clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// TrailDecayManager
// ────────────────────────────────────────────────────────────────────────────

/// Rolling, time-ordered buffer of scans with linear fade-out.
///
/// Only [`record`][Self::record], [`query`][Self::query],
/// [`prune`][Self::prune] and [`clear`][Self::clear] mutate the history;
/// once a scan is pruned it is gone for good.
#[derive(Debug)]
pub struct TrailDecayManager {
    fade_window: Duration,
    history: VecDeque<ScanResult>,
    next_sequence: u64,
}

impl TrailDecayManager {
    /// Create an empty trail. A zero `fade_window` is rejected.
    pub fn new(fade_window: Duration) -> Result<Self, SweepError> {
        if fade_window.is_zero() {
            return Err(SweepError::invalid("fade_window", "must be greater than zero"));
        }
        Ok(Self {
            fade_window,
            history: VecDeque::new(),
            next_sequence: 1,
        })
    }

    pub fn fade_window(&self) -> Duration {
        self.fade_window
    }

    /// Number of retained scans.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True when no scan is retained.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Number of retained ray samples across all scans.
    pub fn sample_count(&self) -> usize {
        self.history.iter().map(|s| s.samples.len()).sum()
    }

    /// Retained scans, oldest first.
    pub fn scans(&self) -> impl Iterator<Item = &ScanResult> {
        self.history.iter()
    }

    /// Append `scan` to the history and return the sequence number assigned
    /// to it.
    ///
    /// Scans are kept ordered by `created_at`; a scan stamped earlier than
    /// the newest retained one is inserted at its place (after any scan with
    /// the same timestamp). Scans that were already invisible at the newest
    /// timestamp are pruned.
    pub fn record(&mut self, mut scan: ScanResult) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        scan.sequence = sequence;

        let at = scan.created_at;
        let pos = self.history.partition_point(|s| s.created_at <= at);
        self.history.insert(pos, scan);

        if let Some(newest) = self.history.back().map(|s| s.created_at) {
            self.prune(newest);
        }
        sequence
    }

    /// Drop every scan whose intensity at `now` is zero. Returns how many
    /// scans were removed.
    #[tracing::instrument(
        name = "trail_prune",
        level = "debug",
        skip_all,
        fields(retained = self.history.len())
    )]
    pub fn prune(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(front) = self.history.front() {
            if intensity(front.created_at, now, self.fade_window) > 0.0 {
                break;
            }
            self.history.pop_front();
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, retained = self.history.len(), "Pruned faded scans");
        }
        removed
    }

    /// Current intensity of every visible sample, oldest scan first and in
    /// fan order within a scan.
    ///
    /// Fully faded scans are pruned before the result is built, so no
    /// returned sample has zero intensity.
    #[tracing::instrument(
        name = "trail_query",
        level = "debug",
        skip_all,
        fields(scans = self.history.len())
    )]
    pub fn query(&mut self, now: Instant) -> Vec<DecayedSample> {
        self.prune(now);
        let mut out = Vec::with_capacity(self.sample_count());
        for scan in &self.history {
            let level = intensity(scan.created_at, now, self.fade_window);
            out.extend(scan.samples.iter().map(|sample| DecayedSample {
                origin: scan.origin.position,
                sample: *sample,
                intensity: level,
            }));
        }
        out
    }

    /// Forget every retained scan. Sequence numbering continues.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for TrailDecayManager {
    fn default() -> Self {
        Self {
            fade_window: DEFAULT_FADE_WINDOW,
            history: VecDeque::new(),
            next_sequence: 1,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_types::{Point2, Pose, RaySample};

    fn scan_at(created_at: Instant, rays: usize) -> ScanResult {
        ScanResult {
            sequence: 0,
            origin: Pose::new(Point2::new(1.0, 2.0), 0.0),
            samples: (0..rays)
                .map(|i| RaySample {
                    angle_offset_deg: i as f64,
                    endpoint: Point2::new(i as f64, 0.0),
                    hit: i % 2 == 0,
                })
                .collect(),
            created_at,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    // ── intensity ────────────────────────────────────────────────────────────

    #[test]
    fn intensity_is_full_at_creation() {
        let t0 = Instant::now();
        assert_eq!(intensity(t0, t0, DEFAULT_FADE_WINDOW), 1.0);
    }

    #[test]
    fn intensity_is_monotone_and_hits_zero_at_window() {
        let t0 = Instant::now();
        let window = ms(800);
        let mut last = f64::INFINITY;
        for step in 0..=100 {
            let level = intensity(t0, t0 + ms(step * 8), window);
            assert!(level <= last, "intensity rose at {step}");
            last = level;
        }
        assert_eq!(intensity(t0, t0 + window, window), 0.0);
        assert_eq!(intensity(t0, t0 + window * 3, window), 0.0);
    }

    #[test]
    fn intensity_before_creation_is_full() {
        let t0 = Instant::now() + ms(100);
        assert_eq!(intensity(t0, t0 - ms(50), DEFAULT_FADE_WINDOW), 1.0);
    }

    // ── construction ─────────────────────────────────────────────────────────

    #[test]
    fn zero_fade_window_rejected() {
        assert!(TrailDecayManager::new(Duration::ZERO).is_err());
    }

    #[test]
    fn default_uses_one_second_window() {
        assert_eq!(TrailDecayManager::default().fade_window(), Duration::from_secs(1));
    }

    // ── record / query ───────────────────────────────────────────────────────

    #[test]
    fn query_before_record_is_empty() {
        let mut trail = TrailDecayManager::default();
        assert!(trail.query(Instant::now()).is_empty());
    }

    #[test]
    fn every_record_adds_independent_samples() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::default();
        trail.record(scan_at(t0, 3));
        trail.record(scan_at(t0, 3));
        assert_eq!(trail.len(), 2);
        assert_eq!(trail.query(t0).len(), 6);
    }

    #[test]
    fn sequence_numbers_follow_record_order() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::default();
        assert_eq!(trail.record(scan_at(t0, 1)), 1);
        assert_eq!(trail.record(scan_at(t0 + ms(10), 1)), 2);
        let seqs: Vec<u64> = trail.scans().map(|s| s.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn query_reports_per_scan_intensity_in_order() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::new(Duration::from_secs(1)).unwrap();
        trail.record(scan_at(t0, 2));
        trail.record(scan_at(t0 + ms(500), 2));

        let out = trail.query(t0 + ms(750));
        assert_eq!(out.len(), 4);
        assert!((out[0].intensity - 0.25).abs() < 1e-9);
        assert!((out[1].intensity - 0.25).abs() < 1e-9);
        assert!((out[2].intensity - 0.75).abs() < 1e-9);
        assert_eq!(out[0].sample.angle_offset_deg, 0.0);
        assert_eq!(out[1].sample.angle_offset_deg, 1.0);
        assert_eq!(out[0].origin, Point2::new(1.0, 2.0));
    }

    #[test]
    fn faded_samples_are_excluded_and_pruned() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::new(Duration::from_secs(1)).unwrap();
        trail.record(scan_at(t0, 2));
        trail.record(scan_at(t0 + ms(600), 2));

        let out = trail.query(t0 + Duration::from_secs(1));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|d| d.intensity > 0.0));
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn everything_gone_after_window_passes_last_record() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::new(ms(200)).unwrap();
        for i in 0..5 {
            trail.record(scan_at(t0 + ms(i * 50), 4));
        }
        let last = t0 + ms(200);
        assert!(trail.query(last + ms(201)).is_empty());
        assert!(trail.is_empty());
    }

    #[test]
    fn pruned_scans_do_not_come_back() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::new(ms(100)).unwrap();
        trail.record(scan_at(t0, 1));
        assert!(trail.query(t0 + ms(150)).is_empty());
        // Asking about an earlier instant cannot resurrect the pruned scan.
        assert!(trail.query(t0 + ms(10)).is_empty());
    }

    #[test]
    fn record_prunes_lazily() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::new(ms(100)).unwrap();
        trail.record(scan_at(t0, 1));
        trail.record(scan_at(t0 + ms(50), 1));
        assert_eq!(trail.len(), 2);
        trail.record(scan_at(t0 + ms(120), 1));
        assert_eq!(trail.len(), 2, "first scan faded by the third record");
    }

    #[test]
    fn history_bounded_under_continuous_scanning() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::new(ms(100)).unwrap();
        for frame in 0..1_000u64 {
            trail.record(scan_at(t0 + ms(frame * 10), 1));
            // Scans at 10 ms spacing: at most the last 100 ms worth survive.
            assert!(trail.len() <= 10, "frame {frame}: {} retained", trail.len());
        }
    }

    #[test]
    fn out_of_order_record_keeps_time_order() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::default();
        trail.record(scan_at(t0 + ms(300), 1));
        trail.record(scan_at(t0 + ms(100), 1));
        trail.record(scan_at(t0 + ms(200), 1));
        let times: Vec<Instant> = trail.scans().map(|s| s.created_at).collect();
        assert_eq!(times, vec![t0 + ms(100), t0 + ms(200), t0 + ms(300)]);
    }

    #[test]
    fn clear_empties_history() {
        let t0 = Instant::now();
        let mut trail = TrailDecayManager::default();
        trail.record(scan_at(t0, 5));
        assert_eq!(trail.sample_count(), 5);
        trail.clear();
        assert!(trail.is_empty());
        assert!(trail.query(t0).is_empty());
        assert_eq!(trail.record(scan_at(t0, 1)), 2);
    }
}
