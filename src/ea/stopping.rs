//! Composable stopping rules, checked after every generation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AlgorithmError;

/// One termination criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StoppingRule {
    /// Stop once this many evaluations have been spent.
    MaxEvaluations { max_evaluations: usize },
    /// Stop when mean population fitness improved by less than
    /// `min_improvement_percent` over the last `generations` generations.
    FitnessImprovement {
        generations: usize,
        min_improvement_percent: f64,
    },
    /// Stop once the run has taken longer than `max_runtime_ms`.
    WallClock { max_runtime_ms: u64 },
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxEvaluations,
    FitnessConverged,
    WallClock,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MaxEvaluations => "max evaluations reached",
            StopReason::FitnessConverged => "fitness converged",
            StopReason::WallClock => "runtime limit reached",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Run state visible to stopping rules.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub generation: usize,
    pub evaluations: usize,
    pub elapsed: Duration,
    /// Mean finite fitness per generation, oldest first.
    pub mean_fitness: &'a [f64],
}

impl StoppingRule {
    fn validate(&self) -> Result<(), AlgorithmError> {
        match *self {
            StoppingRule::MaxEvaluations { max_evaluations: 0 } => Err(AlgorithmError::InvalidStoppingRule(
                "max_evaluations must be at least 1".into(),
            )),
            StoppingRule::FitnessImprovement { generations: 0, .. } => Err(AlgorithmError::InvalidStoppingRule(
                "fitness improvement window must span at least 1 generation".into(),
            )),
            StoppingRule::FitnessImprovement {
                min_improvement_percent,
                ..
            } if !min_improvement_percent.is_finite() || min_improvement_percent < 0.0 => Err(
                AlgorithmError::InvalidStoppingRule(format!(
                    "min_improvement_percent must be a non-negative number, got {min_improvement_percent}"
                )),
            ),
            StoppingRule::WallClock { max_runtime_ms: 0 } => Err(AlgorithmError::InvalidStoppingRule(
                "max_runtime_ms must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }

    fn check(&self, progress: &Progress<'_>) -> Option<StopReason> {
        match *self {
            StoppingRule::MaxEvaluations { max_evaluations } => {
                (progress.evaluations >= max_evaluations).then_some(StopReason::MaxEvaluations)
            }
            StoppingRule::FitnessImprovement {
                generations,
                min_improvement_percent,
            } => {
                let history = progress.mean_fitness;
                if history.len() <= generations {
                    return None;
                }
                let old = history[history.len() - 1 - generations];
                let new = history[history.len() - 1];
                let improvement = improvement_percent(old, new)?;
                (improvement < min_improvement_percent).then_some(StopReason::FitnessConverged)
            }
            StoppingRule::WallClock { max_runtime_ms } => {
                (progress.elapsed >= Duration::from_millis(max_runtime_ms)).then_some(StopReason::WallClock)
            }
        }
    }
}

/// Relative decrease from `old` to `new` in percent; `None` while either
/// is not finite.
fn improvement_percent(old: f64, new: f64) -> Option<f64> {
    if !old.is_finite() || !new.is_finite() {
        return None;
    }
    if old == 0.0 {
        return Some(if new < 0.0 { f64::INFINITY } else { 0.0 });
    }
    Some((old - new) / old.abs() * 100.0)
}

/// A validated, non-empty set of rules. The first rule to fire wins.
#[derive(Debug, Clone, PartialEq)]
pub struct StoppingRules {
    rules: Vec<StoppingRule>,
}

impl StoppingRules {
    pub fn new(rules: Vec<StoppingRule>) -> Result<Self, AlgorithmError> {
        if rules.is_empty() {
            return Err(AlgorithmError::NoStoppingRule);
        }
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    pub fn check(&self, progress: &Progress<'_>) -> Option<StopReason> {
        self.rules.iter().find_map(|r| r.check(progress))
    }

    /// Tightest evaluation budget, if any rule sets one.
    pub fn evaluation_budget(&self) -> Option<usize> {
        self.rules
            .iter()
            .filter_map(|r| match r {
                StoppingRule::MaxEvaluations { max_evaluations } => Some(*max_evaluations),
                _ => None,
            })
            .min()
    }

    pub fn rules(&self) -> &[StoppingRule] {
        &self.rules
    }
}
