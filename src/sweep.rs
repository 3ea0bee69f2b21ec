//! Per-angle summaries for comparing models across a range of elevations.
//!
//! The expensive reference model is split into several contiguous chunks so
//! the batch evaluator can spread it over workers; the closed-form models are
//! cheap enough to run as one task each.

use std::ops::Range;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchEvaluator, BatchResult, BatchTask, TaskFailure, TaskOutput};
use crate::constants::DEFAULT_REFERENCE_CHUNKS;
use crate::error::Result;
use crate::model::{Model, ModelKind, SimulationLimits, TrajectoryModel};
use crate::optimize::linspace;
use crate::trajectory::TrajectorySummary;

/// Summary of one elevation; `None` when the model gave a degenerate trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSummary {
    pub angle_rad: f64,
    pub summary: Option<TrajectorySummary>,
}

pub fn summarize_angles<M: TrajectoryModel + ?Sized>(
    model: &M,
    v0: f64,
    angles: &[f64],
    limits: &SimulationLimits,
) -> Vec<AngleSummary> {
    angles
        .iter()
        .map(|&angle_rad| AngleSummary {
            angle_rad,
            summary: model.simulate(v0, angle_rad, limits).summary(),
        })
        .collect()
}

/// How elevations are spread over a sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AngleSchedule {
    /// Evenly spaced, inclusive
    Linear { start_deg: f64, end_deg: f64, count: usize },
    /// max·(eᵘ − 1)/(e − 1) for evenly spaced u in [0, 1]; dense near 0°
    Exponential { max_deg: f64, count: usize },
}

impl AngleSchedule {
    pub fn angles_rad(&self) -> Vec<f64> {
        match *self {
            AngleSchedule::Linear {
                start_deg,
                end_deg,
                count,
            } => linspace(start_deg, end_deg, count)
                .into_iter()
                .map(f64::to_radians)
                .collect(),
            AngleSchedule::Exponential { max_deg, count } => {
                let scale = max_deg / (std::f64::consts::E - 1.0);
                linspace(0.0, 1.0, count)
                    .into_iter()
                    .map(|u| (scale * u.exp_m1()).to_radians())
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PlanEntry {
    model_index: usize,
    model: Model,
    angles: Range<usize>,
}

/// Batch layout for sweeping several models over the same elevations
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    v0: f64,
    angles: Vec<f64>,
    limits: SimulationLimits,
    kinds: Vec<ModelKind>,
    entries: Vec<PlanEntry>,
}

/// Usable part of one model's sweep, in elevation order
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSweep {
    pub kind: ModelKind,
    pub points: Vec<AngleSummary>,
    /// Set when a chunk failed; points stop at the gap
    pub failure: Option<TaskFailure>,
}

impl ModelSweep {
    pub fn ranges(&self) -> Vec<f64> {
        self.points
            .iter()
            .filter_map(|p| p.summary.map(|s| s.range))
            .collect()
    }
}

/// Split a sweep into batch tasks: the reference model in `reference_chunks`
/// contiguous chunks, every other model as a single task.
pub fn plan_sweep(
    models: &[Model],
    v0: f64,
    angles: Vec<f64>,
    limits: SimulationLimits,
    reference_chunks: usize,
) -> SweepPlan {
    let mut entries = Vec::new();

    for (model_index, &model) in models.iter().enumerate() {
        let chunks = match model.kind() {
            ModelKind::Reference => reference_chunks.clamp(1, angles.len().max(1)),
            _ => 1,
        };
        let chunk_len = angles.len().div_ceil(chunks).max(1);

        let mut start = 0;
        loop {
            let end = (start + chunk_len).min(angles.len());
            entries.push(PlanEntry {
                model_index,
                model,
                angles: start..end,
            });
            start = end;
            if start >= angles.len() {
                break;
            }
        }
    }

    SweepPlan {
        v0,
        angles,
        limits,
        kinds: models.iter().map(|m| m.kind()).collect(),
        entries,
    }
}

impl SweepPlan {
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub fn task_count(&self) -> usize {
        self.entries.len()
    }

    /// Fresh tasks for one submission; the plan can be submitted repeatedly.
    pub fn tasks(&self) -> Vec<BatchTask> {
        self.entries
            .iter()
            .map(|entry| BatchTask::Summarize {
                model: entry.model,
                v0: self.v0,
                angles: self.angles[entry.angles.clone()].to_vec(),
                limits: self.limits,
            })
            .collect()
    }

    /// Stitch batch results back into one curve per model.
    ///
    /// Only summaries that landed or reached the range cutoff are kept, and a
    /// model's curve ends at the first elevation whose range falls short of the
    /// previous one.
    pub fn collect(&self, results: Vec<BatchResult>) -> Vec<ModelSweep> {
        let mut stitched: Vec<(Vec<AngleSummary>, Option<TaskFailure>)> =
            self.kinds.iter().map(|_| (Vec::new(), None)).collect();

        for (index, (entry, result)) in self.entries.iter().zip(results).enumerate() {
            let (summaries, failure) = &mut stitched[entry.model_index];
            if failure.is_some() {
                continue;
            }
            match result.map(TaskOutput::into_summaries) {
                Ok(Some(chunk)) => summaries.extend(chunk),
                Ok(None) => {
                    *failure = Some(TaskFailure {
                        index,
                        message: "task returned no summaries".to_string(),
                    })
                }
                Err(e) => *failure = Some(e),
            }
        }

        self.kinds
            .iter()
            .zip(stitched)
            .map(|(&kind, (summaries, failure))| {
                if let Some(failure) = &failure {
                    warn!("{kind} sweep cut short: {failure}");
                }
                ModelSweep {
                    kind,
                    points: self.usable_prefix(summaries),
                    failure,
                }
            })
            .collect()
    }

    fn usable_prefix(&self, summaries: Vec<AngleSummary>) -> Vec<AngleSummary> {
        let reached_cutoff =
            |s: &TrajectorySummary| self.limits.max_range.is_some_and(|max| s.range >= max);

        let mut kept: Vec<AngleSummary> = Vec::with_capacity(summaries.len());
        let mut last_range = f64::NEG_INFINITY;

        for point in summaries {
            let Some(summary) = point.summary else {
                continue;
            };
            if !(summary.landed || reached_cutoff(&summary)) {
                continue;
            }
            if summary.range < last_range {
                break;
            }
            last_range = summary.range;
            kept.push(point);
        }
        kept
    }
}

/// Plan, submit and collect a sweep of every model over `schedule`.
pub fn sweep_models(
    evaluator: &BatchEvaluator,
    models: &[Model],
    v0: f64,
    schedule: &AngleSchedule,
    limits: SimulationLimits,
) -> Result<Vec<ModelSweep>> {
    let plan = plan_sweep(models, v0, schedule.angles_rad(), limits, DEFAULT_REFERENCE_CHUNKS);
    debug!(
        "sweeping {} models over {} elevations in {} tasks",
        models.len(),
        plan.angles().len(),
        plan.task_count()
    );
    let results = evaluator.submit_batch(plan.tasks())?;
    Ok(plan.collect(results))
}
