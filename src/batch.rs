//! Persistent worker pool for batches of trajectory evaluations.
//!
//! Workers live as long as the evaluator and pull from one shared FIFO queue,
//! so interactive callers can resubmit a full batch on every parameter change
//! without paying thread start-up each time. Results come back in submission
//! order regardless of which worker finished first.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_DEFAULT_WORKERS, MIN_DEFAULT_WORKERS, WORKER_POLL_INTERVAL_MS};
use crate::error::{CalibrationError, Result};
use crate::model::{Model, SimulationLimits, TrajectoryModel};
use crate::sweep::{summarize_angles, AngleSummary};
use crate::trajectory::Trajectory;

/// Pool sizing and queue polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub workers: usize,
    pub poll_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_DEFAULT_WORKERS)
            .clamp(MIN_DEFAULT_WORKERS, MAX_DEFAULT_WORKERS);
        Self {
            workers,
            poll_interval: Duration::from_millis(WORKER_POLL_INTERVAL_MS),
        }
    }
}

impl BatchConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

type CustomTask = Box<dyn FnOnce() -> std::result::Result<TaskOutput, String> + Send>;

/// One unit of work in a batch
pub enum BatchTask {
    /// Full trajectory for one shot
    Simulate {
        model: Model,
        v0: f64,
        angle_rad: f64,
        limits: SimulationLimits,
    },
    /// End-of-flight summaries for a run of elevations
    Summarize {
        model: Model,
        v0: f64,
        angles: Vec<f64>,
        limits: SimulationLimits,
    },
    /// Arbitrary computation; an `Err` is reported as a task failure
    Custom(CustomTask),
}

impl BatchTask {
    pub fn custom<F>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<TaskOutput, String> + Send + 'static,
    {
        BatchTask::Custom(Box::new(f))
    }

    fn run(self) -> std::result::Result<TaskOutput, String> {
        match self {
            BatchTask::Simulate {
                model,
                v0,
                angle_rad,
                limits,
            } => Ok(TaskOutput::Trajectory(model.simulate(v0, angle_rad, &limits))),
            BatchTask::Summarize {
                model,
                v0,
                angles,
                limits,
            } => Ok(TaskOutput::Summaries(summarize_angles(&model, v0, &angles, &limits))),
            BatchTask::Custom(f) => f(),
        }
    }
}

impl std::fmt::Debug for BatchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchTask::Simulate {
                model, v0, angle_rad, ..
            } => f
                .debug_struct("Simulate")
                .field("model", &model.kind())
                .field("v0", v0)
                .field("angle_rad", angle_rad)
                .finish(),
            BatchTask::Summarize {
                model, v0, angles, ..
            } => f
                .debug_struct("Summarize")
                .field("model", &model.kind())
                .field("v0", v0)
                .field("angles", &angles.len())
                .finish(),
            BatchTask::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Value produced by a successful task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Trajectory(Trajectory),
    Summaries(Vec<AngleSummary>),
    Value(f64),
}

impl TaskOutput {
    pub fn into_trajectory(self) -> Option<Trajectory> {
        match self {
            TaskOutput::Trajectory(traj) => Some(traj),
            _ => None,
        }
    }

    pub fn into_summaries(self) -> Option<Vec<AngleSummary>> {
        match self {
            TaskOutput::Summaries(summaries) => Some(summaries),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<f64> {
        match self {
            TaskOutput::Value(value) => Some(*value),
            _ => None,
        }
    }
}

/// A task that returned an error or panicked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {index} failed: {message}")]
pub struct TaskFailure {
    pub index: usize,
    pub message: String,
}

pub type BatchResult = std::result::Result<TaskOutput, TaskFailure>;

type Job = (usize, BatchTask);

#[derive(Default)]
struct BatchState {
    results: Vec<Option<BatchResult>>,
    pending: usize,
}

struct Shared {
    queue: Mutex<Receiver<Option<Job>>>,
    state: Mutex<BatchState>,
    batch_done: Condvar,
    shutdown: AtomicBool,
}

impl Shared {
    fn complete(&self, index: usize, result: BatchResult) {
        let mut state = lock(&self.state);
        if let Some(slot) = state.results.get_mut(index) {
            *slot = Some(result);
        }
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.batch_done.notify_all();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed-size pool of long-lived workers sharing one task queue.
///
/// Construct once and reuse; `submit_batch` calls from several threads are
/// served one batch at a time.
pub struct BatchEvaluator {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<Option<Job>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    batch_gate: Mutex<()>,
    worker_count: usize,
}

impl BatchEvaluator {
    pub fn new() -> Result<Self> {
        Self::with_config(BatchConfig::default())
    }

    pub fn with_config(config: BatchConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(CalibrationError::InvalidParameter {
                name: "worker count",
                value: 0.0,
            });
        }

        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            queue: Mutex::new(receiver),
            state: Mutex::new(BatchState::default()),
            batch_done: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let worker_shared = Arc::clone(&shared);
            let poll = config.poll_interval;
            let spawned = thread::Builder::new()
                .name(format!("batch-worker-{id}"))
                .spawn(move || worker_loop(id, worker_shared, poll));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Release the workers that did start before bailing out
                    shared.shutdown.store(true, Ordering::Release);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(CalibrationError::WorkerSpawn(e.to_string()));
                }
            }
        }

        Ok(Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            batch_gate: Mutex::new(()),
            worker_count: config.workers,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Run every task and return their results in submission order.
    ///
    /// Blocks until the whole batch has finished. Task errors and panics are
    /// returned in place as `TaskFailure`s; only a shut-down pool is an error.
    pub fn submit_batch(&self, tasks: Vec<BatchTask>) -> Result<Vec<BatchResult>> {
        let _gate = lock(&self.batch_gate);
        if self.is_shut_down() {
            return Err(CalibrationError::PoolShutDown);
        }
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let count = tasks.len();
        {
            let mut state = lock(&self.shared.state);
            state.results = (0..count).map(|_| None).collect();
            state.pending = count;
        }

        {
            let guard = lock(&self.sender);
            let Some(sender) = guard.as_ref() else {
                return Err(CalibrationError::PoolShutDown);
            };
            for (index, task) in tasks.into_iter().enumerate() {
                trace!("queueing batch task {index}: {task:?}");
                if sender.send(Some((index, task))).is_err() {
                    self.shared.complete(
                        index,
                        Err(TaskFailure {
                            index,
                            message: "task queue closed".to_string(),
                        }),
                    );
                }
            }
        }

        let mut state = lock(&self.shared.state);
        while state.pending > 0 {
            state = self
                .shared
                .batch_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let results = std::mem::take(&mut state.results);
        drop(state);

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(TaskFailure {
                        index,
                        message: "task produced no result".to_string(),
                    })
                })
            })
            .collect())
    }

    /// Stop every worker and wait for them to exit. Idempotent.
    ///
    /// A batch already in flight finishes first.
    pub fn shutdown(&self) {
        let _gate = lock(&self.batch_gate);
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(sender) = lock(&self.sender).take() {
            for _ in 0..self.worker_count {
                let _ = sender.send(None);
            }
        }

        let workers = std::mem::take(&mut *lock(&self.workers));
        for handle in workers {
            if handle.join().is_err() {
                warn!("batch worker exited with a panic");
            }
        }
    }
}

impl Drop for BatchEvaluator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BatchEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEvaluator")
            .field("worker_count", &self.worker_count)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>, poll: Duration) {
    trace!("batch worker {id} started");

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        // Bounded wait so a set shutdown flag is noticed without a sentinel
        let message = lock(&shared.queue).recv_timeout(poll);

        match message {
            Ok(Some((index, task))) => {
                trace!("batch worker {id} running task {index}");
                let result = run_task(index, task);
                shared.complete(index, result);
            }
            Ok(None) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }

    trace!("batch worker {id} exiting");
}

fn run_task(index: usize, task: BatchTask) -> BatchResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || task.run()));

    let message = match outcome {
        Ok(Ok(output)) => return Ok(output),
        Ok(Err(message)) => message,
        Err(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                format!("panicked: {s}")
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("panicked: {s}")
            } else {
                "panicked".to_string()
            }
        }
    };

    warn!("batch task {index} failed: {message}");
    Err(TaskFailure { index, message })
}
