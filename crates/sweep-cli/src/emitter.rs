//! The sensor-carrying emitter: owns the pose and refuses to walk into walls.

use sweep_perception::GridMap;
use sweep_types::{Point2, Pose, SweepError};
use tracing::debug;

/// Screen-space movement direction (`Up` is toward decreasing `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

/// Movable sensor pose with fixed movement and turning increments.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    pose: Pose,
    move_speed: f64,
    turn_step_deg: f64,
}

impl Emitter {
    /// Fails unless the pose is finite and both increments are finite and
    /// positive.
    pub fn new(pose: Pose, move_speed: f64, turn_step_deg: f64) -> Result<Self, SweepError> {
        let p = pose.position;
        if !(p.x.is_finite() && p.y.is_finite() && pose.heading_deg.is_finite()) {
            return Err(SweepError::invalid(
                "emitter",
                format!("start pose must be finite, got ({}, {}) at {}°", p.x, p.y, pose.heading_deg),
            ));
        }
        for (field, value) in [("move_speed", move_speed), ("turn_step_deg", turn_step_deg)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SweepError::invalid(field, format!("must be finite and > 0, got {value}")));
            }
        }
        Ok(Self {
            pose,
            move_speed,
            turn_step_deg,
        })
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Move one `move_speed` step in `direction`.
    ///
    /// The move is refused (and `false` returned) when the destination
    /// lies in an occupied cell.
    pub fn step(&mut self, direction: Direction, grid: &GridMap) -> bool {
        let (ux, uy) = direction.unit();
        let target = Point2::new(
            self.pose.position.x + ux * self.move_speed,
            self.pose.position.y + uy * self.move_speed,
        );
        let (column, row) = grid.cell_of(target);
        if grid.is_occupied(column, row) {
            debug!(?direction, column, row, "Emitter move blocked");
            return false;
        }
        self.pose.position = target;
        true
    }

    /// Up to `count` steps in `direction`, stopping at the first blocked
    /// one. Returns the number of steps taken.
    pub fn walk(&mut self, direction: Direction, count: u32, grid: &GridMap) -> u32 {
        let mut taken = 0;
        while taken < count && self.step(direction, grid) {
            taken += 1;
        }
        taken
    }

    /// Rotate by `steps` turn increments; positive turns toward +Y
    /// (clockwise on screen).
    pub fn turn(&mut self, steps: f64) {
        self.pose.heading_deg += steps * self.turn_step_deg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridMap {
        GridMap::from_occupied(20, 15, 40.0, [(5, 4)]).unwrap()
    }

    fn emitter_at(x: f64, y: f64) -> Emitter {
        Emitter::new(Pose::new(Point2::new(x, y), 0.0), 5.0, 2.0).unwrap()
    }

    #[test]
    fn bad_increments_rejected() {
        let pose = Pose::new(Point2::new(10.0, 10.0), 0.0);
        for (speed, turn) in [(f64::NAN, 2.0), (-5.0, 2.0), (0.0, 2.0), (5.0, f64::INFINITY), (5.0, -1.0)] {
            assert!(Emitter::new(pose, speed, turn).is_err(), "speed {speed}, turn {turn}");
        }
        let err = Emitter::new(pose, f64::NAN, 2.0).unwrap_err();
        assert!(err.to_string().contains("move_speed"));
    }

    #[test]
    fn non_finite_start_pose_rejected() {
        let pose = Pose::new(Point2::new(f64::NAN, 10.0), 0.0);
        assert!(Emitter::new(pose, 5.0, 2.0).is_err());
    }

    #[test]
    fn step_moves_by_speed() {
        let g = grid();
        let mut e = emitter_at(400.0, 300.0);
        assert!(e.step(Direction::Up, &g));
        assert_eq!(e.pose().position, Point2::new(400.0, 295.0));
        assert!(e.step(Direction::Right, &g));
        assert_eq!(e.pose().position, Point2::new(405.0, 295.0));
    }

    #[test]
    fn step_into_wall_is_refused() {
        let g = grid();
        // Just above cell (5, 4) whose top edge is y = 160.
        let mut e = emitter_at(220.0, 157.0);
        assert!(!e.step(Direction::Down, &g));
        assert_eq!(e.pose().position, Point2::new(220.0, 157.0));
    }

    #[test]
    fn walk_stops_at_first_blocked_step() {
        let g = grid();
        let mut e = emitter_at(220.0, 140.0);
        // 140 → 145 → 150 → 155, then 160 is inside the wall.
        assert_eq!(e.walk(Direction::Down, 10, &g), 3);
        assert_eq!(e.pose().position.y, 155.0);
    }

    #[test]
    fn leaving_the_map_is_allowed() {
        let g = grid();
        let mut e = emitter_at(2.0, 2.0);
        assert!(e.step(Direction::Left, &g));
        assert_eq!(e.pose().position.x, -3.0);
    }

    #[test]
    fn turn_uses_step_size() {
        let mut e = emitter_at(0.0, 0.0);
        e.turn(3.0);
        assert_eq!(e.pose().heading_deg, 6.0);
        e.turn(-5.0);
        assert_eq!(e.pose().heading_deg, -4.0);
    }
}
