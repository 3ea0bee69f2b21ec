use std::sync::Arc;
use std::thread;
use std::time::Duration;

use drag_calibration::{
    BatchConfig, BatchEvaluator, BatchTask, CalibrationError, LinearDragModel, Model,
    QuadraticDragModel, SeparableDragModel, SimulationLimits, TaskOutput, TimeWarp,
    TrajectoryModel,
};
use rand::Rng;

fn pool(workers: usize) -> BatchEvaluator {
    BatchEvaluator::with_config(BatchConfig::default().with_workers(workers)).unwrap()
}

#[test]
fn test_random_completion_order_keeps_submission_order() {
    let evaluator = pool(4);
    let mut rng = rand::thread_rng();
    let n = 32;

    let tasks = (0..n)
        .map(|i| {
            let sleep_ms = rng.gen_range(0..15);
            BatchTask::custom(move || {
                thread::sleep(Duration::from_millis(sleep_ms));
                Ok(TaskOutput::Value(i as f64))
            })
        })
        .collect();

    let indices: Vec<usize> = evaluator
        .submit_batch(tasks)
        .unwrap()
        .into_iter()
        .map(|r| r.unwrap().as_value().unwrap() as usize)
        .collect();
    assert_eq!(indices, (0..n).collect::<Vec<_>>());
}

#[test]
fn test_mixed_models_match_direct_simulation() {
    let evaluator = pool(3);
    let limits = SimulationLimits::default();
    let models: Vec<Model> = vec![
        QuadraticDragModel::new(3e-5).unwrap().into(),
        LinearDragModel::with_params(0.0138, 9.81, TimeWarp::new(0.88, 30.0)).unwrap().into(),
        SeparableDragModel::new(3e-5).unwrap().into(),
    ];
    let angles = [0.2, 0.45, 0.7];

    let tasks = models
        .iter()
        .flat_map(|&model| {
            angles.iter().map(move |&angle_rad| BatchTask::Simulate {
                model,
                v0: 762.0,
                angle_rad,
                limits,
            })
        })
        .collect();

    let results = evaluator.submit_batch(tasks).unwrap();
    assert_eq!(results.len(), 9);
    for (i, result) in results.into_iter().enumerate() {
        let model = models[i / angles.len()];
        let expected = model.simulate(762.0, angles[i % angles.len()], &limits);
        assert_eq!(result.unwrap().into_trajectory().unwrap(), expected);
    }
}

#[test]
fn test_failure_does_not_poison_the_batch() {
    let evaluator = pool(2);
    let tasks = (0..10)
        .map(|i| {
            BatchTask::custom(move || {
                if i == 3 {
                    panic!("task {i} exploded");
                }
                if i == 7 {
                    return Err("rejected".to_string());
                }
                Ok(TaskOutput::Value(i as f64))
            })
        })
        .collect();

    let results = evaluator.submit_batch(tasks).unwrap();
    for (i, result) in results.iter().enumerate() {
        match i {
            3 | 7 => assert_eq!(result.as_ref().unwrap_err().index, i),
            _ => assert_eq!(result.as_ref().unwrap().as_value(), Some(i as f64)),
        }
    }

    // Workers survive a panicking task
    let again = evaluator
        .submit_batch(vec![BatchTask::custom(|| Ok(TaskOutput::Value(1.5)))])
        .unwrap();
    assert_eq!(again[0].as_ref().unwrap().as_value(), Some(1.5));
}

#[test]
fn test_concurrent_submitters_get_their_own_results() {
    let evaluator = Arc::new(pool(4));

    thread::scope(|scope| {
        for caller in 0..4 {
            let evaluator = Arc::clone(&evaluator);
            scope.spawn(move || {
                for round in 0..3 {
                    let base = (caller * 100 + round * 10) as f64;
                    let tasks = (0..8)
                        .map(|i| BatchTask::custom(move || Ok(TaskOutput::Value(base + i as f64))))
                        .collect();
                    let values: Vec<f64> = evaluator
                        .submit_batch(tasks)
                        .unwrap()
                        .into_iter()
                        .map(|r| r.unwrap().as_value().unwrap())
                        .collect();
                    let expected: Vec<f64> = (0..8).map(|i| base + i as f64).collect();
                    assert_eq!(values, expected);
                }
            });
        }
    });
}

#[test]
fn test_shutdown_rejects_new_batches() {
    let evaluator = pool(2);
    evaluator.shutdown();
    let err = evaluator
        .submit_batch(vec![BatchTask::custom(|| Ok(TaskOutput::Value(0.0)))])
        .unwrap_err();
    assert_eq!(err, CalibrationError::PoolShutDown);

    // Dropping an already shut-down pool is fine
    drop(evaluator);
}
