use drag_calibration::{
    LinearDragModel, QuadraticDragModel, SimulationLimits, TimeWarp, TrajectoryModel,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reference_time_increases_and_flight_terminates(
        k in 1e-6_f64..1e-3,
        v0 in 50.0_f64..1200.0,
        angle_deg in 1.0_f64..89.0,
    ) {
        let model = QuadraticDragModel::new(k).unwrap();
        let limits = SimulationLimits::default();
        let traj = model.simulate(v0, angle_deg.to_radians(), &limits);
        let points = traj.points();

        prop_assert!(points.len() >= 2);
        prop_assert!(points.windows(2).all(|w| w[1].t > w[0].t));

        let last = points[points.len() - 1];
        let prev = points[points.len() - 2];
        let landed = last.y < 0.0;
        let timed_out = last.t >= limits.max_time - 1e-9;
        let regressed = last.t > 1.0 && last.x < prev.x;
        prop_assert!(landed || timed_out || regressed);
    }

    #[test]
    fn linear_model_time_increases(
        beta in 1e-3_f64..0.05,
        v0 in 50.0_f64..1200.0,
        angle_deg in 1.0_f64..89.0,
        min_rate in 0.5_f64..1.5,
    ) {
        let warp = TimeWarp::new(min_rate, 30.0);
        let model = LinearDragModel::with_params(beta, 9.81, warp).unwrap();
        let traj = model.simulate(v0, angle_deg.to_radians(), &SimulationLimits::default());
        prop_assert!(traj.points().windows(2).all(|w| w[1].t > w[0].t));
        prop_assert_eq!(traj.first().unwrap().t, 0.0);
    }

    #[test]
    fn warp_is_identity_when_min_rate_at_least_one(
        min_rate in 1.0_f64..5.0,
        apex in -10.0_f64..100.0,
        t in 0.0_f64..300.0,
    ) {
        let warp = TimeWarp::new(min_rate, apex);
        prop_assert_eq!(warp.warp(t), t);
        prop_assert_eq!(warp.rate(t), 1.0);
    }

    #[test]
    fn warp_derivative_matches_rate(
        min_rate in 0.1_f64..0.99,
        apex in 1.0_f64..60.0,
        t in 0.0_f64..200.0,
    ) {
        let warp = TimeWarp::new(min_rate, apex);
        let h = 1e-4;
        let numeric = (warp.warp(t + h) - warp.warp(t - h)) / (2.0 * h);
        let rate = warp.rate(t);
        prop_assert!((numeric - rate).abs() <= 1e-5 * rate.max(1.0), "{} vs {}", numeric, rate);
    }
}
