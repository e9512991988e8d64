//! `sweep-perception` – raycasting and decay-trail core.
//!
//! Turns an emitter pose and an occupancy grid into a fan of resolved rays,
//! and keeps a fading history of those fans for display.
//!
//! # Modules
//!
//! - [`grid`] – [`GridMap`][grid::GridMap]: occupancy grid answering point
//!   and segment queries; off-map cells read as free. Also walks the cells
//!   a segment crosses.
//! - [`scanner`] – [`ConeScanner`][scanner::ConeScanner]: casts a symmetric
//!   fan of rays around the heading and resolves each against the grid.
//! - [`trail`] – [`TrailDecayManager`][trail::TrailDecayManager]: time-ordered
//!   scan history whose intensity decays linearly and is pruned once faded.

pub mod grid;
pub mod scanner;
pub mod trail;

pub use grid::{CellCrossing, CellWalk, GridMap, HitSearch};
pub use scanner::ConeScanner;
pub use trail::TrailDecayManager;
