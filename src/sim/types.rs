//! Core co-simulation types: timing, fitness weights, evaluation output.

use serde::{Deserialize, Serialize};

use crate::devices::DeviceId;
use crate::error::ProblemError;
use crate::sim::schedule::Schedule;

/// Time grid of one interdependent calculation.
///
/// # Examples
///
/// ```
/// use hems_sched::sim::types::SimulationTiming;
///
/// let t = SimulationTiming::new(0, 900, 86_400).unwrap();
/// assert_eq!(t.total_steps(), 96);
/// assert_eq!(t.dt_hours(), 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationTiming {
    /// First simulated tick (s since epoch).
    pub start_time: i64,
    /// Tick length (s).
    pub step_size: i64,
    /// End of the horizon (exclusive).
    pub horizon_end: i64,
}

impl SimulationTiming {
    /// Rejects non-positive step sizes and empty horizons.
    pub fn new(start_time: i64, step_size: i64, horizon_end: i64) -> Result<Self, ProblemError> {
        if step_size <= 0 {
            return Err(ProblemError::Timing(format!("step_size must be > 0, got {step_size}")));
        }
        if horizon_end <= start_time {
            return Err(ProblemError::Timing(format!(
                "horizon_end ({horizon_end}) must be after start_time ({start_time})"
            )));
        }
        Ok(Self {
            start_time,
            step_size,
            horizon_end,
        })
    }

    /// Ticks needed to cover the horizon; a partial last step counts.
    pub fn total_steps(&self) -> usize {
        ((self.horizon_end - self.start_time + self.step_size - 1) / self.step_size) as usize
    }

    pub fn dt_hours(&self) -> f64 {
        self.step_size as f64 / 3600.0
    }

    /// Absolute time of tick `index`.
    pub fn tick(&self, index: usize) -> i64 {
        self.start_time + index as i64 * self.step_size
    }
}

/// Weights folding the objective vector into a scalar fitness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitnessWeights {
    /// Per cent of energy cost.
    pub energy_cost: f64,
    /// Per Wh outside the power limits.
    pub limit_violation: f64,
    /// Per unit of device cervisia.
    pub cervisia: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            energy_cost: 1.0,
            limit_violation: 10.0,
            cervisia: 1.0,
        }
    }
}

/// Minimized objectives of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Objectives {
    /// Grid energy cost in cents.
    pub energy_cost: f64,
    /// Power-limit violation in Wh.
    pub limit_violation_wh: f64,
    /// Summed device cervisia.
    pub cervisia: f64,
}

impl Objectives {
    pub const NAMES: [&'static str; 3] = ["energy_cost", "limit_violation_wh", "cervisia"];

    /// Worst possible outcome, assigned to evaluations that could not run.
    pub fn worst() -> Self {
        Self {
            energy_cost: f64::INFINITY,
            limit_violation_wh: f64::INFINITY,
            cervisia: f64::INFINITY,
        }
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![self.energy_cost, self.limit_violation_wh, self.cervisia]
    }

    pub fn fitness(&self, weights: &FitnessWeights) -> f64 {
        let f = weights.energy_cost * self.energy_cost
            + weights.limit_violation * self.limit_violation_wh
            + weights.cervisia * self.cervisia;
        if f.is_nan() { f64::INFINITY } else { f }
    }
}

/// Everything one evaluation produces besides its fitness.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutcome {
    pub objectives: Objectives,
    /// Final schedules in part order; empty unless profiles were recorded.
    pub schedules: Vec<Schedule>,
    /// Parts that failed during the evaluation.
    pub failed_devices: Vec<DeviceId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_last_step_counts() {
        let t = SimulationTiming::new(0, 900, 1000).unwrap();
        assert_eq!(t.total_steps(), 2);
        assert_eq!(t.tick(1), 900);
    }

    #[test]
    fn rejects_bad_timing() {
        assert!(SimulationTiming::new(0, 0, 100).is_err());
        assert!(SimulationTiming::new(100, 60, 100).is_err());
    }

    #[test]
    fn worst_objectives_have_infinite_fitness() {
        assert!(Objectives::worst().fitness(&FitnessWeights::default()).is_infinite());
    }

    #[test]
    fn fitness_is_weighted_sum() {
        let o = Objectives {
            energy_cost: 10.0,
            limit_violation_wh: 2.0,
            cervisia: 3.0,
        };
        assert_eq!(o.fitness(&FitnessWeights::default()), 10.0 + 20.0 + 3.0);
    }
}
