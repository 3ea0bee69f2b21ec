use approx::assert_relative_eq;
use drag_calibration::constants::K_SCAN_SAMPLES;
use drag_calibration::{
    fit_linear_beta, fit_quadratic_k, quadratic_fit_error, scan_quadratic_k,
    synthesize_data_points, BallisticDataPoint, ErrorWeights, FitMode, KBounds, LinearFitConfig,
    QuadraticDragModel, SeparableDragModel, ShellParameters, SimulationLimits, TrajectoryModel,
};

fn scenario_shell() -> ShellParameters {
    ShellParameters {
        name: "scenario".to_string(),
        muzzle_velocity: 820.0,
        max_range: 38000.0,
        data_points: vec![BallisticDataPoint::from_degrees(29.1, 35000.0, 69.9, 462.0)],
        ..ShellParameters::default()
    }
}

fn reference_range(shell: &ShellParameters, k: f64) -> f64 {
    let model = QuadraticDragModel::new(k).unwrap();
    let limits = SimulationLimits::default().with_max_range(shell.max_range);
    model
        .simulate(shell.muzzle_velocity, shell.target_elevation(), &limits)
        .last()
        .unwrap()
        .x
}

#[test]
fn test_scenario_fit_reproduces_range() {
    let shell = scenario_shell();
    let result = fit_quadratic_k(&shell, KBounds::default(), &ErrorWeights::default()).unwrap();
    assert!(result.converged);

    // Equal weights trade a little range for time and velocity
    let range = reference_range(&shell, result.coefficient);
    assert!((range - 35000.0).abs() / 35000.0 < 0.015, "range {range}");
}

#[test]
fn test_scenario_range_only_fit_within_one_percent() {
    let shell = scenario_shell();
    let weights = ErrorWeights {
        range: 1.0,
        time: 0.0,
        velocity: 0.0,
        height: 0.0,
    };
    let result = fit_quadratic_k(&shell, KBounds::default(), &weights).unwrap();

    let range = reference_range(&shell, result.coefficient);
    assert!((range - 35000.0).abs() / 35000.0 < 0.01, "range {range}");
}

#[test]
fn test_fit_recovers_known_coefficient() {
    let k_true = 3e-5;
    let reference = QuadraticDragModel::new(k_true).unwrap();
    let elevations: Vec<f64> = [10.0_f64, 20.0, 30.0, 45.0]
        .iter()
        .map(|d| d.to_radians())
        .collect();
    let limits = SimulationLimits::default();
    let data_points = synthesize_data_points(&reference, 800.0, &elevations, &limits).unwrap();

    let shell = ShellParameters {
        name: "synthetic".to_string(),
        muzzle_velocity: 800.0,
        max_range: 0.0,
        data_points,
        ..ShellParameters::default()
    };
    let result = fit_quadratic_k(&shell, KBounds::default(), &ErrorWeights::default()).unwrap();

    assert_relative_eq!(result.coefficient, k_true, max_relative = 1e-4);
    assert!(result.error < 1e-8);
}

#[test]
fn test_non_positive_k_is_infinite_error() {
    let shell = scenario_shell();
    for k in [0.0, -1e-5, -1.0] {
        for mode in [FitMode::Standard, FitMode::HeightPriority] {
            let error = quadratic_fit_error(&shell, k, &ErrorWeights::default(), mode);
            assert!(error.is_infinite() && error > 0.0);
        }
    }
}

#[test]
fn test_beta_sweep_is_ranked() {
    let shell = ShellParameters::preset("203mm").unwrap();
    let config = LinearFitConfig::from_shell(&shell);
    let result = fit_linear_beta(&shell, 3e-5, &config).unwrap();

    assert_eq!(result.optimal_beta, result.all_results[0].beta);
    assert!(result
        .all_results
        .windows(2)
        .all(|w| w[0].total_error <= w[1].total_error));
    let best = result.best().unwrap();
    assert!(best.total_error.is_finite());
    assert!(best.rms_velocity_error >= 0.0);
}

#[test]
fn test_negligible_drag_matches_vacuum_parabola() {
    let model = QuadraticDragModel::new(1e-12).unwrap();
    let (v0, angle) = (300.0_f64, 40.0_f64.to_radians());
    let g = model.gravity();

    let traj = model.simulate(v0, angle, &SimulationLimits::default().with_dt(0.01));
    let vacuum_range = v0 * v0 * (2.0 * angle).sin() / g;
    let vacuum_time = 2.0 * v0 * angle.sin() / g;

    let last = traj.last().unwrap();
    assert_relative_eq!(last.x, vacuum_range, max_relative = 2e-3);
    assert_relative_eq!(last.t, vacuum_time, max_relative = 2e-3);
    assert_relative_eq!(traj.impact_range().unwrap(), vacuum_range, max_relative = 1e-4);
}

#[test]
fn test_separable_model_with_fitted_k_is_close_to_reference() {
    let shell = scenario_shell();
    let k = fit_quadratic_k(&shell, KBounds::default(), &ErrorWeights::default())
        .unwrap()
        .coefficient;

    let limits = SimulationLimits::default();
    let elevation = shell.target_elevation();
    let reference = QuadraticDragModel::new(k).unwrap().simulate(820.0, elevation, &limits);
    let analytic = SeparableDragModel::new(k).unwrap().simulate(820.0, elevation, &limits);

    let r_ref = reference.summary().unwrap().range;
    let r_ana = analytic.summary().unwrap().range;
    assert!((r_ana - r_ref).abs() / r_ref < 0.1);
}

#[test]
fn test_scan_agrees_with_bounded_search() {
    let shell = scenario_shell();
    let weights = ErrorWeights::default();
    let bounds = KBounds::new(1e-5, 1e-4);

    let scan = scan_quadratic_k(&shell, bounds, K_SCAN_SAMPLES, &weights).unwrap();
    let fit = fit_quadratic_k(&shell, bounds, &weights).unwrap();

    // Grid spacing bounds how far the scan can sit from the optimum
    let spacing = (bounds.max - bounds.min) / (K_SCAN_SAMPLES - 1) as f64;
    assert!((scan.coefficient - fit.coefficient).abs() <= 2.0 * spacing);
    assert_eq!(scan.curve.unwrap().len(), K_SCAN_SAMPLES);
}
