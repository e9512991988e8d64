//! Cone scanner.
//!
//! Casts a symmetric fan of rays around the emitter heading and resolves
//! each one against a [`GridMap`]. The scanner keeps no state between scans:
//! the same pose, configuration and grid always give the same samples.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use sweep_perception::{grid::GridMap, scanner::ConeScanner};
//! use sweep_types::{ConeConfig, Point2, Pose};
//!
//! let grid = GridMap::new(20, 15, 40.0).unwrap();
//! let scanner = ConeScanner::new(ConeConfig {
//!     half_width_deg: 30.0,
//!     angular_step_deg: 10.0,
//!     max_range: 100.0,
//! })
//! .unwrap();
//!
//! let pose = Pose::new(Point2::new(400.0, 300.0), 0.0);
//! let scan = scanner.scan_at(&pose, &grid, Instant::now());
//!
//! let offsets: Vec<f64> = scan.samples.iter().map(|s| s.angle_offset_deg).collect();
//! assert_eq!(offsets, vec![-30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0]);
//! assert!(scan.samples.iter().all(|s| !s.hit));
//! ```

use std::time::Instant;

use sweep_types::{ConeConfig, Pose, RaySample, ScanResult, SweepError};
use tracing::debug;

use crate::grid::{GridMap, HitSearch};

/// A validated cone configuration paired with a hit search strategy.
///
/// Construction is the only fallible step; once built, every scan produces
/// the full fan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeScanner {
    config: ConeConfig,
    search: HitSearch,
}

impl ConeScanner {
    /// Validate `config` and build a scanner using [`HitSearch::CellTraversal`].
    pub fn new(config: ConeConfig) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self {
            config,
            search: HitSearch::default(),
        })
    }

    /// Swap the hit search strategy.
    pub fn with_hit_search(mut self, search: HitSearch) -> Result<Self, SweepError> {
        search.validate()?;
        self.search = search;
        Ok(self)
    }

    pub fn config(&self) -> &ConeConfig {
        &self.config
    }

    pub fn hit_search(&self) -> HitSearch {
        self.search
    }

    /// Number of rays every scan produces.
    pub fn ray_count(&self) -> usize {
        self.config.ray_count()
    }

    /// Angle offsets of the fan, from `-half_width` upward in steps of
    /// `angular_step`. The last offset may fall short of `+half_width`.
    pub fn offsets(&self) -> impl Iterator<Item = f64> + '_ {
        let start = -self.config.half_width_deg;
        let step = self.config.angular_step_deg;
        (0..self.ray_count()).map(move |i| start + i as f64 * step)
    }

    /// Cast the fan from `pose`, stamping the result with `created_at`.
    #[tracing::instrument(
        name = "cone_scan",
        level = "debug",
        skip_all,
        fields(rays = self.ray_count(), heading_deg = pose.heading_deg)
    )]
    pub fn scan_at(&self, pose: &Pose, grid: &GridMap, created_at: Instant) -> ScanResult {
        let origin = pose.position;
        let samples: Vec<RaySample> = self
            .offsets()
            .map(|offset| {
                let far = origin.project(pose.heading_deg + offset, self.config.max_range);
                match grid.segment_hit_with(origin, far, self.search) {
                    Some(endpoint) => RaySample {
                        angle_offset_deg: offset,
                        endpoint,
                        hit: true,
                    },
                    None => RaySample {
                        angle_offset_deg: offset,
                        endpoint: far,
                        hit: false,
                    },
                }
            })
            .collect();

        let result = ScanResult {
            sequence: 0,
            origin: *pose,
            samples,
            created_at,
        };
        debug!(
            rays = result.samples.len(),
            hits = result.hit_count(),
            x = origin.x,
            y = origin.y,
            heading_deg = pose.heading_deg,
            "Cone scan complete"
        );
        result
    }

    /// Cast the fan from `pose`, stamped with the current instant.
    pub fn scan(&self, pose: &Pose, grid: &GridMap) -> ScanResult {
        self.scan_at(pose, grid, Instant::now())
    }
}

/// One-shot scan: validate `config`, then cast the fan.
///
/// An invalid configuration is rejected before any ray is cast.
pub fn scan(pose: &Pose, config: &ConeConfig, grid: &GridMap) -> Result<ScanResult, SweepError> {
    Ok(ConeScanner::new(*config)?.scan(pose, grid))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
