//! Occupancy grid and segment hit search.
//!
//! A [`GridMap`] is a fixed `width × height` array of square cells, each
//! either free or occupied. Any cell outside that range reads as free, so
//! rays can leave the map without special-casing its edges.
//!
//! # Key types
//!
//! | Type | Role |
//! |------|------|
//! | [`GridMap`]   | Occupancy bitmap; point and segment queries.            |
//! | [`HitSearch`] | Strategy used to find the first occupied cell on a segment. |
//!
//! # Example
//!
//! ```rust
//! use sweep_perception::grid::GridMap;
//! use sweep_types::Point2;
//!
//! let grid = GridMap::from_occupied(20, 15, 40.0, [(5, 4)]).unwrap();
//!
//! assert!(grid.is_occupied(5, 4));
//! assert!(!grid.is_occupied(-1, 4)); // off-map reads as free
//! assert_eq!(grid.cell_of(Point2::new(210.0, 170.0)), (5, 4));
//!
//! let hit = grid
//!     .segment_hit(Point2::new(200.0, 120.0), Point2::new(200.0, 320.0))
//!     .unwrap();
//! assert_eq!(hit, Point2::new(200.0, 160.0));
//! ```

use sweep_types::{Point2, SweepError};
use tracing::warn;

/// Parametric step used by the reference marcher.
pub const DEFAULT_MARCH_INCREMENT: f64 = 0.0005;

/// Smallest accepted [`HitSearch::FixedStep`] increment.
pub const MIN_MARCH_INCREMENT: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// HitSearch
// ────────────────────────────────────────────────────────────────────────────

/// How [`GridMap::segment_hit_with`] looks for the first occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HitSearch {
    /// Walk the segment cell by cell (Amanatides–Woo). Visits every cell
    /// the segment crosses exactly once and reports the boundary point
    /// where the segment enters the first occupied one.
    #[default]
    CellTraversal,
    /// Sample the segment at `t = k·increment` for `t ∈ [0, 1)` and report
    /// the first sample that lands in an occupied cell.
    ///
    /// Can tunnel through a cell corner when the step is coarse relative
    /// to `cell_size / segment_length`.
    FixedStep { increment: f64 },
}

impl HitSearch {
    /// The reference marcher with [`DEFAULT_MARCH_INCREMENT`].
    pub fn reference() -> Self {
        HitSearch::FixedStep {
            increment: DEFAULT_MARCH_INCREMENT,
        }
    }

    /// Reject a fixed step outside `[MIN_MARCH_INCREMENT, 1]`.
    pub fn validate(&self) -> Result<(), SweepError> {
        match *self {
            HitSearch::CellTraversal => Ok(()),
            HitSearch::FixedStep { increment } => {
                if increment.is_finite() && (MIN_MARCH_INCREMENT..=1.0).contains(&increment) {
                    Ok(())
                } else {
                    Err(SweepError::invalid(
                        "march_increment",
                        format!("must lie in [{MIN_MARCH_INCREMENT}, 1], got {increment}"),
                    ))
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GridMap
// ────────────────────────────────────────────────────────────────────────────

/// A uniform occupancy grid in world coordinates.
///
/// Cell `(column, row)` covers `[column·cell_size, (column+1)·cell_size)` on
/// X and the analogous range on Y. Storage is row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    width: usize,
    height: usize,
    cell_size: f64,
    cells: Vec<bool>,
}

impl GridMap {
    /// Create an all-free grid.
    ///
    /// Fails when either dimension is zero or `cell_size` is not a positive
    /// finite number.
    pub fn new(width: usize, height: usize, cell_size: f64) -> Result<Self, SweepError> {
        if width == 0 || height == 0 {
            return Err(SweepError::invalid(
                "grid",
                format!("dimensions must be positive, got {width}x{height}"),
            ));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SweepError::invalid(
                "cell_size",
                format!("must be finite and > 0, got {cell_size}"),
            ));
        }
        Ok(Self {
            width,
            height,
            cell_size,
            cells: vec![false; width * height],
        })
    }

    /// Create a grid and mark every `(column, row)` in `occupied`.
    ///
    /// Pairs outside the grid are skipped with a warning.
    pub fn from_occupied(
        width: usize,
        height: usize,
        cell_size: f64,
        occupied: impl IntoIterator<Item = (i64, i64)>,
    ) -> Result<Self, SweepError> {
        let mut grid = Self::new(width, height, cell_size)?;
        for (column, row) in occupied {
            if !grid.set_occupied(column, row, true) {
                warn!(column, row, width, height, "Ignoring occupied cell outside the grid");
            }
        }
        Ok(grid)
    }

    /// Set the occupancy of one cell. Returns `false` (and changes nothing)
    /// when the cell lies outside the grid.
    pub fn set_occupied(&mut self, column: i64, row: i64, occupied: bool) -> bool {
        match self.index(column, row) {
            Some(i) => {
                self.cells[i] = occupied;
                true
            }
            None => false,
        }
    }

    /// `(width, height)` in cells.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// World units per cell edge.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Stored occupancy for in-range cells, `false` everywhere else.
    pub fn is_occupied(&self, column: i64, row: i64) -> bool {
        self.index(column, row).is_some_and(|i| self.cells[i])
    }

    /// The cell containing `point`: `floor(coordinate / cell_size)`.
    ///
    /// May return indices outside the grid.
    pub fn cell_of(&self, point: Point2) -> (i64, i64) {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    /// Iterate over every occupied `(column, row)` in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .map(|(i, _)| ((i % self.width) as i64, (i / self.width) as i64))
    }

    /// First point on `start → end` that lies in an occupied cell, using
    /// [`HitSearch::CellTraversal`].
    pub fn segment_hit(&self, start: Point2, end: Point2) -> Option<Point2> {
        self.traverse(start, end)
    }

    /// First point on `start → end` that lies in an occupied cell, using
    /// the given strategy.
    ///
    /// Whatever the strategy, a returned point `p` satisfies
    /// `is_occupied(cell_of(p))` and lies at a parameter `t ∈ [0, 1)` of
    /// the segment. A start point inside an occupied cell is returned as is.
    pub fn segment_hit_with(&self, start: Point2, end: Point2, search: HitSearch) -> Option<Point2> {
        match search {
            HitSearch::CellTraversal => self.traverse(start, end),
            HitSearch::FixedStep { increment } => self.march(start, end, increment),
        }
    }

    /// Every in-grid cell crossed by `start → end` for `t ∈ [0, 1)`, in the
    /// order the segment visits them.
    ///
    /// The segment is clipped to the grid first, so the walk costs at most
    /// `width + height` steps however long the segment is.
    pub fn cells_along(&self, start: Point2, end: Point2) -> CellWalk {
        let Some(t_in) = self.entry_parameter(start, end) else {
            return CellWalk::finished();
        };
        let entry = start.lerp(end, t_in);
        let (column, row) = self.cell_of(entry);
        let column = column.clamp(0, self.width as i64 - 1);
        let row = row.clamp(0, self.height as i64 - 1);

        let (step_col, t_max_x, t_delta_x) =
            axis_setup(start.x, end.x - start.x, column, self.cell_size);
        let (step_row, t_max_y, t_delta_y) =
            axis_setup(start.y, end.y - start.y, row, self.cell_size);

        CellWalk {
            pending: Some(CellCrossing { column, row, t: t_in }),
            column,
            row,
            step_col,
            step_row,
            t_max_x,
            t_max_y,
            t_delta_x,
            t_delta_y,
            width: self.width as i64,
            height: self.height as i64,
        }
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn index(&self, column: i64, row: i64) -> Option<usize> {
        if column < 0 || row < 0 {
            return None;
        }
        let (c, r) = (column as usize, row as usize);
        (c < self.width && r < self.height).then(|| r * self.width + c)
    }

    fn occupied_at(&self, point: Point2) -> bool {
        let (column, row) = self.cell_of(point);
        self.is_occupied(column, row)
    }

    fn march(&self, start: Point2, end: Point2, increment: f64) -> Option<Point2> {
        if !(increment > 0.0) {
            return None;
        }
        // t is derived from the step index so error does not accumulate.
        let mut k: u64 = 0;
        loop {
            let t = k as f64 * increment;
            if t >= 1.0 {
                return None;
            }
            let p = start.lerp(end, t);
            if self.occupied_at(p) {
                return Some(p);
            }
            k += 1;
        }
    }

    fn traverse(&self, start: Point2, end: Point2) -> Option<Point2> {
        let (column, row) = self.cell_of(start);
        if self.is_occupied(column, row) {
            return Some(start);
        }
        self.cells_along(start, end)
            .find(|c| self.is_occupied(c.column, c.row))
            .map(|c| self.clamp_into(start.lerp(end, c.t.max(0.0)), c.column, c.row))
    }

    /// Segment parameter at which `start → end` enters the grid's bounding
    /// box, or `None` when it never does for `t ∈ [0, 1)`.
    fn entry_parameter(&self, start: Point2, end: Point2) -> Option<f64> {
        let extent = [
            (start.x, end.x - start.x, self.width as f64 * self.cell_size),
            (start.y, end.y - start.y, self.height as f64 * self.cell_size),
        ];
        let (mut t_in, mut t_out) = (0.0_f64, 1.0_f64);
        for (origin, delta, hi) in extent {
            if !origin.is_finite() || !delta.is_finite() {
                return None;
            }
            if delta == 0.0 {
                // Parallel to this slab; the far edge belongs to the next
                // (off-map) cell.
                if origin < 0.0 || origin >= hi {
                    return None;
                }
            } else {
                let a = -origin / delta;
                let b = (hi - origin) / delta;
                t_in = t_in.max(a.min(b));
                t_out = t_out.min(a.max(b));
            }
        }
        (t_in < t_out && t_in < 1.0).then_some(t_in)
    }
    /// Pull a boundary point into the half-open extent of `(column, row)`
    /// when rounding left it in a neighbour.
    fn clamp_into(&self, p: Point2, column: i64, row: i64) -> Point2 {
        if self.cell_of(p) == (column, row) {
            return p;
        }
        let eps = self.cell_size * 1e-9;
        let lo_x = column as f64 * self.cell_size;
        let lo_y = row as f64 * self.cell_size;
        Point2::new(
            p.x.clamp(lo_x + eps, lo_x + self.cell_size - eps),
            p.y.clamp(lo_y + eps, lo_y + self.cell_size - eps),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CellWalk
// ────────────────────────────────────────────────────────────────────────────

/// One cell visited by a [`CellWalk`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCrossing {
    pub column: i64,
    pub row: i64,
    /// Segment parameter at which the walk entered this cell.
    pub t: f64,
}

/// Amanatides–Woo walk over the grid cells a segment crosses.
///
/// Built by [`GridMap::cells_along`]. Ends when the segment does
/// (`t ≥ 1`) or leaves the grid; a clipped segment cannot come back.
#[derive(Debug, Clone)]
pub struct CellWalk {
    pending: Option<CellCrossing>,
    column: i64,
    row: i64,
    step_col: i64,
    step_row: i64,
    t_max_x: f64,
    t_max_y: f64,
    t_delta_x: f64,
    t_delta_y: f64,
    width: i64,
    height: i64,
}

impl CellWalk {
    fn finished() -> Self {
        Self {
            pending: None,
            column: 0,
            row: 0,
            step_col: 0,
            step_row: 0,
            t_max_x: f64::INFINITY,
            t_max_y: f64::INFINITY,
            t_delta_x: f64::INFINITY,
            t_delta_y: f64::INFINITY,
            width: 0,
            height: 0,
        }
    }
}

impl Iterator for CellWalk {
    type Item = CellCrossing;

    fn next(&mut self) -> Option<CellCrossing> {
        if let Some(first) = self.pending.take() {
            return Some(first);
        }
        let t = if self.t_max_x < self.t_max_y {
            self.column += self.step_col;
            let t = self.t_max_x;
            self.t_max_x += self.t_delta_x;
            t
        } else {
            self.row += self.step_row;
            let t = self.t_max_y;
            self.t_max_y += self.t_delta_y;
            t
        };

        // Also exits on the infinite/NaN parameters of degenerate input.
        let inside = (0..self.width).contains(&self.column) && (0..self.height).contains(&self.row);
        if !(t < 1.0) || !inside {
            // Park the walk so later calls stay `None`.
            self.t_max_x = f64::INFINITY;
            self.t_max_y = f64::INFINITY;
            self.width = 0;
            return None;
        }
        Some(CellCrossing {
            column: self.column,
            row: self.row,
            t,
        })
    }
}

/// Per-axis setup for the cell walk: `(cell step, t at first boundary,
/// t between boundaries)`. A zero delta never crosses a boundary.
fn axis_setup(origin: f64, delta: f64, cell: i64, cell_size: f64) -> (i64, f64, f64) {
    if delta > 0.0 {
        let boundary = (cell + 1) as f64 * cell_size;
        (1, (boundary - origin) / delta, cell_size / delta)
    } else if delta < 0.0 {
        let boundary = cell as f64 * cell_size;
        (-1, (boundary - origin) / delta, cell_size / -delta)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
