use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Single state sample along a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub t: f64,  // seconds
    pub x: f64,  // meters downrange
    pub y: f64,  // meters above the gun
    pub vx: f64, // m/s
    pub vy: f64, // m/s
}

impl TrajectoryPoint {
    pub fn new(t: f64, x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self { t, x, y, vx, vy }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.vx, self.vy)
    }

    pub fn speed(&self) -> f64 {
        self.velocity().norm()
    }

    pub fn is_finite(&self) -> bool {
        [self.t, self.x, self.y, self.vx, self.vy]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// End-of-flight figures of a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub range: f64,           // meters
    pub time_of_flight: f64,  // seconds
    pub impact_velocity: f64, // m/s
    pub impact_angle: f64,    // radians below horizontal
    pub max_height: f64,      // meters
    pub landed: bool,         // false when a cutoff ended the flight
}

/// Time-ordered samples produced by a model's `simulate`.
///
/// Regenerated on every call; models never mutate one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn from_points(points: Vec<TrajectoryPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fewer than two samples: nothing usable for fitting or summaries.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    pub fn first(&self) -> Option<&TrajectoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn ranges(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.points.iter().map(TrajectoryPoint::speed).collect()
    }

    /// Split into `(times, [x, y, vx, vy])` columns for plotting collaborators.
    pub fn into_parts(self) -> (Vec<f64>, Vec<[f64; 4]>) {
        self.points
            .into_iter()
            .map(|p| (p.t, [p.x, p.y, p.vx, p.vy]))
            .unzip()
    }

    /// Highest sample (the apex, to within one step)
    pub fn apex(&self) -> Option<&TrajectoryPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.y.total_cmp(&b.y))
    }

    pub fn max_height(&self) -> f64 {
        self.apex().map_or(0.0, |p| p.y)
    }

    /// Speed at a horizontal distance, linearly interpolated and clamped to the ends.
    ///
    /// An empty trajectory reads 0.
    pub fn speed_at_range(&self, range: f64) -> f64 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if range <= first.x {
            return first.speed();
        }
        if range >= last.x {
            return last.speed();
        }

        // First sample past the query; clamped so a trailing range
        // regression still yields an in-bounds pair
        let upper = self
            .points
            .partition_point(|p| p.x <= range)
            .clamp(1, self.points.len() - 1);
        let (a, b) = (&self.points[upper - 1], &self.points[upper]);
        let span = b.x - a.x;
        if span.abs() < f64::EPSILON {
            return a.speed();
        }
        a.speed() + (b.speed() - a.speed()) * (range - a.x) / span
    }

    /// Speeds resampled onto a range grid.
    pub fn speeds_on_grid(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&x| self.speed_at_range(x)).collect()
    }

    /// Range where the flight meets the ground.
    ///
    /// Interpolated between the last airborne sample and the first one below
    /// ground; a flight ended by a cutoff reports its last x.
    pub fn impact_range(&self) -> Option<f64> {
        let last = self.points.last()?;
        if last.y >= 0.0 || self.points.len() < 2 {
            return Some(last.x);
        }
        let prev = &self.points[self.points.len() - 2];
        let dy = prev.y - last.y;
        if dy.abs() < f64::EPSILON {
            return Some(last.x);
        }
        let fraction = prev.y / dy;
        Some(prev.x + fraction * (last.x - prev.x))
    }

    pub fn summary(&self) -> Option<TrajectorySummary> {
        if self.is_degenerate() {
            return None;
        }
        let last = self.points.last()?;
        Some(TrajectorySummary {
            range: last.x,
            time_of_flight: last.t,
            impact_velocity: last.speed(),
            impact_angle: (-last.vy).atan2(last.vx),
            max_height: self.max_height(),
            landed: last.y <= 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trajectory() -> Trajectory {
        Trajectory::from_points(vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0, 100.0, 50.0),
            TrajectoryPoint::new(1.0, 100.0, 45.0, 99.0, 40.0),
            TrajectoryPoint::new(2.0, 198.0, 80.0, 98.0, 0.0),
            TrajectoryPoint::new(3.0, 295.0, -2.0, 97.0, -97.0),
        ])
    }

    #[test]
    fn test_speed_at_range_between_samples() {
        let traj = sample_trajectory();
        let first = traj.first().unwrap().speed();
        let last = traj.last().unwrap().speed();
        assert_eq!(traj.speed_at_range(-1.0), first);
        assert_eq!(traj.speed_at_range(1e6), last);

        // halfway between x=100 (speed √(99²+40²)) and x=198 (speed 98)
        let expected = 0.5 * ((99.0_f64 * 99.0 + 40.0 * 40.0).sqrt() + 98.0);
        assert!((traj.speed_at_range(149.0) - expected).abs() < 1e-9);
        assert_eq!(traj.speed_at_range(198.0), 98.0);
        assert_eq!(Trajectory::default().speed_at_range(10.0), 0.0);
    }

    #[test]
    fn test_speed_at_range_survives_range_regression() {
        let traj = Trajectory::from_points(vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0, 10.0, 0.0),
            TrajectoryPoint::new(1.0, 10.0, 5.0, 20.0, 0.0),
            TrajectoryPoint::new(2.0, 20.0, 6.0, 30.0, 0.0),
            TrajectoryPoint::new(3.0, 15.0, 4.0, 40.0, 0.0),
        ]);
        let speed = traj.speed_at_range(12.0);
        assert!(speed.is_finite());
        assert!((10.0..=40.0).contains(&speed));
    }

    #[test]
    fn test_summary_reports_last_sample() {
        let summary = sample_trajectory().summary().unwrap();
        assert_eq!(summary.range, 295.0);
        assert_eq!(summary.time_of_flight, 3.0);
        assert!((summary.impact_velocity - (97.0_f64 * 97.0 * 2.0).sqrt()).abs() < 1e-9);
        assert!((summary.impact_angle - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert_eq!(summary.max_height, 80.0);
        assert!(summary.landed);
    }

    #[test]
    fn test_degenerate_trajectory_has_no_summary() {
        let single = Trajectory::from_points(vec![TrajectoryPoint::new(0.0, 0.0, 0.0, 1.0, 1.0)]);
        assert!(single.is_degenerate());
        assert!(single.summary().is_none());
        assert_eq!(single.max_height(), 0.0);
    }

    #[test]
    fn test_impact_range_interpolates_ground_crossing() {
        // y goes 80 -> -2 between x=198 and x=295
        let expected = 198.0 + (80.0 / 82.0) * 97.0;
        assert!((sample_trajectory().impact_range().unwrap() - expected).abs() < 1e-9);

        let airborne = Trajectory::from_points(vec![
            TrajectoryPoint::new(0.0, 0.0, 0.0, 1.0, 1.0),
            TrajectoryPoint::new(1.0, 5.0, 3.0, 1.0, 1.0),
        ]);
        assert_eq!(airborne.impact_range(), Some(5.0));
        assert_eq!(Trajectory::default().impact_range(), None);
    }

    #[test]
    fn test_into_parts_keeps_column_order() {
        let (times, states) = sample_trajectory().into_parts();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(states[1], [100.0, 45.0, 99.0, 40.0]);
    }

    #[test]
    fn test_speed_at_range() {
        let traj = sample_trajectory();
        let start = traj.first().unwrap().speed();
        assert_eq!(traj.speed_at_range(-10.0), start);
        let mid = traj.speed_at_range(50.0);
        let s1 = traj.points()[1].speed();
        assert!((mid - 0.5 * (start + s1)).abs() < 1e-9);
        assert_eq!(traj.speeds_on_grid(&[0.0, 50.0]), vec![start, mid]);
    }
}
