//! Configuration Vault – reads/writes `~/.sweep/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sweep_perception::grid::{DEFAULT_MARCH_INCREMENT, GridMap, HitSearch};
use sweep_types::{ConeConfig, Point2, Pose, SweepError};

/// Which hit search the scanner uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HitSearchKind {
    #[default]
    Traversal,
    FixedStep,
}

impl std::fmt::Display for HitSearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HitSearchKind::Traversal => write!(f, "traversal"),
            HitSearchKind::FixedStep => write!(f, "fixed_step"),
        }
    }
}

/// `[grid]` – map size and the fixed obstacle layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSection {
    #[serde(default = "default_grid_width")]
    pub width: usize,
    #[serde(default = "default_grid_height")]
    pub height: usize,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
    /// Occupied cells as `[column, row]` pairs.
    #[serde(default = "default_layout")]
    pub occupied: Vec<[i64; 2]>,
}

/// `[cone]` – shape of the scan fan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeSection {
    #[serde(default = "default_half_width")]
    pub half_width_deg: f64,
    #[serde(default = "default_angular_step")]
    pub angular_step_deg: f64,
    #[serde(default = "default_max_range")]
    pub max_range: f64,
}

/// `[trail]` – how long rays stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailSection {
    #[serde(default = "default_fade_window")]
    pub fade_window_secs: f64,
}

/// `[scan]` – hit search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSection {
    #[serde(default)]
    pub hit_search: HitSearchKind,
    /// Parametric step for `fixed_step`; ignored by `traversal`.
    #[serde(default = "default_march_increment")]
    pub march_increment: f64,
}

/// `[emitter]` – starting pose and movement granularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmitterSection {
    #[serde(default = "default_start_x")]
    pub x: f64,
    #[serde(default = "default_start_y")]
    pub y: f64,
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,
    #[serde(default = "default_turn_step")]
    pub turn_step_deg: f64,
}

/// Persisted configuration stored in `~/.sweep/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridSection,
    #[serde(default)]
    pub cone: ConeSection,
    #[serde(default)]
    pub trail: TrailSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub emitter: EmitterSection,
}

fn default_grid_width() -> usize {
    20
}
fn default_grid_height() -> usize {
    15
}
fn default_cell_size() -> f64 {
    40.0
}
fn default_layout() -> Vec<[i64; 2]> {
    let mut cells = vec![[5, 4], [6, 4], [5, 5], [5, 6], [8, 10], [8, 9], [8, 8]];
    cells.extend((3..13).map(|column| [column, 8]));
    cells
}
fn default_half_width() -> f64 {
    30.0
}
fn default_angular_step() -> f64 {
    0.05
}
fn default_max_range() -> f64 {
    200.0
}
fn default_fade_window() -> f64 {
    1.0
}
fn default_march_increment() -> f64 {
    DEFAULT_MARCH_INCREMENT
}
fn default_start_x() -> f64 {
    400.0
}
fn default_start_y() -> f64 {
    300.0
}
fn default_move_speed() -> f64 {
    5.0
}
fn default_turn_step() -> f64 {
    2.0
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            width: default_grid_width(),
            height: default_grid_height(),
            cell_size: default_cell_size(),
            occupied: default_layout(),
        }
    }
}

impl Default for ConeSection {
    fn default() -> Self {
        Self {
            half_width_deg: default_half_width(),
            angular_step_deg: default_angular_step(),
            max_range: default_max_range(),
        }
    }
}

impl Default for TrailSection {
    fn default() -> Self {
        Self {
            fade_window_secs: default_fade_window(),
        }
    }
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            hit_search: HitSearchKind::default(),
            march_increment: default_march_increment(),
        }
    }
}

impl Default for EmitterSection {
    fn default() -> Self {
        Self {
            x: default_start_x(),
            y: default_start_y(),
            heading_deg: 0.0,
            move_speed: default_move_speed(),
            turn_step_deg: default_turn_step(),
        }
    }
}

impl Config {
    /// Build the occupancy grid described by `[grid]`.
    pub fn build_grid(&self) -> Result<GridMap, SweepError> {
        GridMap::from_occupied(
            self.grid.width,
            self.grid.height,
            self.grid.cell_size,
            self.grid.occupied.iter().map(|&[column, row]| (column, row)),
        )
    }

    /// The `[cone]` section as a core [`ConeConfig`] (not yet validated).
    pub fn cone_config(&self) -> ConeConfig {
        ConeConfig {
            half_width_deg: self.cone.half_width_deg,
            angular_step_deg: self.cone.angular_step_deg,
            max_range: self.cone.max_range,
        }
    }

    /// The `[scan]` section as a [`HitSearch`] (not yet validated).
    pub fn hit_search(&self) -> HitSearch {
        match self.scan.hit_search {
            HitSearchKind::Traversal => HitSearch::CellTraversal,
            HitSearchKind::FixedStep => HitSearch::FixedStep {
                increment: self.scan.march_increment,
            },
        }
    }

    /// The `[trail]` fade window. Negative or non-finite values are rejected.
    pub fn fade_window(&self) -> Result<Duration, SweepError> {
        Duration::try_from_secs_f64(self.trail.fade_window_secs).map_err(|e| {
            SweepError::invalid(
                "fade_window_secs",
                format!("{} is not a valid duration: {e}", self.trail.fade_window_secs),
            )
        })
    }

    /// The emitter's starting pose.
    pub fn start_pose(&self) -> Pose {
        Pose::new(
            Point2::new(self.emitter.x, self.emitter.y),
            self.emitter.heading_deg,
        )
    }
}

/// Return the path to `~/.sweep/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".sweep").join("config.toml")
}

/// Load the config from disk and apply `SWEEP_*` overrides.
/// Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SweepError> {
    Ok(load_from(&config_path())?.map(|mut cfg| {
        apply_env_overrides(&mut cfg);
        cfg
    }))
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SweepError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SweepError::Config(format!("Failed to read config at {}: {}", path.display(), e))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| SweepError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(Some(cfg))
}

/// Apply `SWEEP_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `SWEEP_HALF_WIDTH` | `cone.half_width_deg` |
/// | `SWEEP_ANGULAR_STEP` | `cone.angular_step_deg` |
/// | `SWEEP_MAX_RANGE` | `cone.max_range` |
/// | `SWEEP_FADE_WINDOW` | `trail.fade_window_secs` |
///
/// Values that do not parse as numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_f64("SWEEP_HALF_WIDTH") {
        cfg.cone.half_width_deg = v;
    }
    if let Some(v) = env_f64("SWEEP_ANGULAR_STEP") {
        cfg.cone.angular_step_deg = v;
    }
    if let Some(v) = env_f64("SWEEP_MAX_RANGE") {
        cfg.cone.max_range = v;
    }
    if let Some(v) = env_f64("SWEEP_FADE_WINDOW") {
        cfg.trail.fade_window_secs = v;
    }
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok()?.trim().parse::<f64>().ok()
}

/// Save the config to disk, creating `~/.sweep/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SweepError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SweepError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SweepError::Config(format!("Failed to create config directory: {}", e))
        })?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                SweepError::Config(format!("Failed to set config directory permissions: {}", e))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| SweepError::Config(format!("Failed to serialize config: {}", e)))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| {
                SweepError::Config(format!("Failed to write config at {}: {}", path.display(), e))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| {
        SweepError::Config(format!("Failed to write config at {}: {}", path.display(), e))
    })?;
    Ok(())
}
