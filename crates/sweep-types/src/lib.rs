use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on the number of rays a single scan may cast.
pub const MAX_RAYS_PER_SCAN: usize = 100_000;

/// A point in the 2-D world plane.
///
/// Screen convention: `x` grows to the right, `y` grows downward, so a
/// heading of 90° points toward increasing `y`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// The point reached by travelling `distance` from `self` along
    /// `angle_deg` (degrees, measured from +X toward +Y).
    pub fn project(&self, angle_deg: f64, distance: f64) -> Point2 {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        Point2::new(self.x + cos * distance, self.y + sin * distance)
    }

    /// Linear interpolation: `self + (other - self) * t`.
    pub fn lerp(&self, other: Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Emitter pose: where the sensor sits and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point2,
    /// Heading in degrees. Unbounded; wraps implicitly through sin/cos.
    pub heading_deg: f64,
}

impl Pose {
    /// Create a new pose.
    pub fn new(position: Point2, heading_deg: f64) -> Self {
        Self {
            position,
            heading_deg,
        }
    }
}

/// Shape of the scan fan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeConfig {
    /// Half the angular width of the cone (degrees, ≥ 0).
    pub half_width_deg: f64,
    /// Spacing between neighbouring rays (degrees, > 0).
    pub angular_step_deg: f64,
    /// Ray length when nothing is hit (world units, > 0).
    pub max_range: f64,
}

impl ConeConfig {
    /// Check every field, returning the first violation found.
    ///
    /// A configuration that passes is guaranteed to produce between 1 and
    /// [`MAX_RAYS_PER_SCAN`] rays.
    pub fn validate(&self) -> Result<(), SweepError> {
        if !self.half_width_deg.is_finite() || self.half_width_deg < 0.0 {
            return Err(SweepError::invalid(
                "half_width_deg",
                format!("must be finite and >= 0, got {}", self.half_width_deg),
            ));
        }
        if !self.angular_step_deg.is_finite() || self.angular_step_deg <= 0.0 {
            return Err(SweepError::invalid(
                "angular_step_deg",
                format!("must be finite and > 0, got {}", self.angular_step_deg),
            ));
        }
        if !self.max_range.is_finite() || self.max_range <= 0.0 {
            return Err(SweepError::invalid(
                "max_range",
                format!("must be finite and > 0, got {}", self.max_range),
            ));
        }
        let span = 2.0 * self.half_width_deg / self.angular_step_deg;
        if span >= MAX_RAYS_PER_SCAN as f64 {
            return Err(SweepError::invalid(
                "angular_step_deg",
                format!(
                    "fan of {:.0} rays exceeds the limit of {MAX_RAYS_PER_SCAN}",
                    span.floor() + 1.0
                ),
            ));
        }
        Ok(())
    }

    /// Number of rays in the fan: `floor(2·half_width / step) + 1`.
    ///
    /// A relative tolerance absorbs float error in the division so that,
    /// e.g., a 60° cone at 0.05° spacing yields 1201 rays rather than 1200.
    /// Only meaningful for a configuration that passes [`validate`][Self::validate].
    pub fn ray_count(&self) -> usize {
        let span = 2.0 * self.half_width_deg / self.angular_step_deg;
        (span * (1.0 + 1e-9)).floor() as usize + 1
    }
}

impl Default for ConeConfig {
    fn default() -> Self {
        Self {
            half_width_deg: 30.0,
            angular_step_deg: 0.05,
            max_range: 200.0,
        }
    }
}

/// One resolved ray of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaySample {
    /// Offset from the emitter heading (degrees).
    pub angle_offset_deg: f64,
    /// Collision point when `hit`, otherwise the max-range point.
    pub endpoint: Point2,
    pub hit: bool,
}

/// The fan of rays produced by one scan trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Position in the recording order; assigned when the scan is recorded
    /// into a trail (0 until then).
    pub sequence: u64,
    /// Pose the fan was cast from.
    pub origin: Pose,
    /// Samples ordered by increasing `angle_offset_deg`.
    pub samples: Vec<RaySample>,
    pub created_at: Instant,
}

impl ScanResult {
    /// Number of samples that struck an obstacle.
    pub fn hit_count(&self) -> usize {
        self.samples.iter().filter(|s| s.hit).count()
    }
}

/// A retained ray paired with its current visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayedSample {
    /// Emitter position the ray started from.
    pub origin: Point2,
    pub sample: RaySample,
    /// Visibility in `(0, 1]`; fully faded samples are never produced.
    pub intensity: f64,
}

impl DecayedSample {
    /// Intensity scaled to an 8-bit alpha channel.
    ///
    /// Any positive intensity maps to at least 1, so a visible sample never
    /// rounds to fully transparent.
    pub fn alpha(&self) -> u8 {
        let alpha = (self.intensity.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.intensity > 0.0 { alpha.max(1) } else { alpha }
    }
}

/// Global error type for the sweep workspace.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SweepError {
    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Config Error: {0}")]
    Config(String),
}

impl SweepError {
    /// Shorthand for [`SweepError::InvalidConfig`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SweepError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
