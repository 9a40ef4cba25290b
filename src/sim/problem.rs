//! The household scheduling problem handed to the evolutionary driver.

use std::sync::Arc;

use crate::devices::ProblemPart;
use crate::ea::{Chromosome, Evaluation, Problem, VariableEncoding, VariableLayout};
use crate::error::{EvaluationError, ProblemError};
use crate::random::RandomStream;
use crate::signals::SignalSnapshot;
use crate::sim::evaluator::{InputRouting, InterdependentSimulation, SimulationSetup};
use crate::sim::types::{EvaluationOutcome, FitnessWeights, Objectives, SimulationTiming};

/// Template parts plus everything needed to evaluate a chromosome against
/// them.
///
/// Parts are never stepped in place; every evaluation forks them, so one
/// problem can be evaluated from many threads at once.
#[derive(Debug, Clone)]
pub struct HouseholdProblem {
    parts: Vec<ProblemPart>,
    routing: InputRouting,
    layout: VariableLayout,
    signals: Arc<SignalSnapshot>,
    timing: SimulationTiming,
    weights: FitnessWeights,
    stream: RandomStream,
    keep_prediction: bool,
}

impl HouseholdProblem {
    /// Builds the variable layout from the parts in the given order.
    ///
    /// # Errors
    ///
    /// [`ProblemError::NoParts`] for an empty household, or a layout error
    /// when a part declares variables that do not fit `encoding`.
    pub fn new(
        parts: Vec<ProblemPart>,
        encoding: VariableEncoding,
        signals: Arc<SignalSnapshot>,
        timing: SimulationTiming,
        weights: FitnessWeights,
        stream: RandomStream,
    ) -> Result<Self, ProblemError> {
        if parts.is_empty() {
            return Err(ProblemError::NoParts);
        }
        let infos: Vec<_> = parts.iter().map(|p| p.variable_information(encoding)).collect();
        let layout = VariableLayout::new(encoding, parts.iter().map(ProblemPart::device_id).zip(&infos))?;
        let routing = InputRouting::new(&parts);
        Ok(Self {
            parts,
            routing,
            layout,
            signals,
            timing,
            weights,
            stream,
            keep_prediction: true,
        })
    }

    /// Disables prediction-driven behavior; such parts hold their
    /// observed value instead.
    pub fn with_keep_prediction(mut self, keep_prediction: bool) -> Self {
        self.keep_prediction = keep_prediction;
        self
    }

    pub fn parts(&self) -> &[ProblemPart] {
        &self.parts
    }

    pub fn timing(&self) -> SimulationTiming {
        self.timing
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Runs one full interdependent calculation for `chromosome`.
    pub fn simulate(&self, chromosome: &Chromosome, create_load_profile: bool) -> Result<EvaluationOutcome, EvaluationError> {
        let decoded = self.layout.decode(chromosome)?;
        let setup = SimulationSetup {
            timing: self.timing,
            signals: &self.signals,
            routing: &self.routing,
            stream: self.stream,
            create_load_profile,
            keep_prediction: self.keep_prediction,
        };
        let mut sim = InterdependentSimulation::initialize(setup, &self.parts, decoded);
        sim.run_to_end();
        sim.finalize()
    }

    /// Re-evaluates `chromosome` with load profiles recorded.
    pub fn schedules_for(&self, chromosome: &Chromosome) -> Result<EvaluationOutcome, EvaluationError> {
        self.simulate(chromosome, true)
    }
}

impl Problem for HouseholdProblem {
    type Auxiliary = EvaluationOutcome;

    fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    fn objective_names(&self) -> &[&'static str] {
        &Objectives::NAMES
    }

    fn evaluate(&self, chromosome: &Chromosome) -> Evaluation<EvaluationOutcome> {
        let outcome = self.simulate(chromosome, false).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "evaluation failed");
            EvaluationOutcome {
                objectives: Objectives::worst(),
                ..EvaluationOutcome::default()
            }
        });
        Evaluation {
            objectives: outcome.objectives.to_vec(),
            fitness: outcome.objectives.fitness(&self.weights),
            auxiliary: outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceId;
    use crate::devices::battery::{Battery, BatteryParams};
    use crate::devices::pv::{Pv, PvParams};
    use crate::profile::Commodity;
    use crate::signals::{StepSeries, Tariff};

    fn problem(encoding: VariableEncoding) -> HouseholdProblem {
        let mut battery = ProblemPart::new(DeviceId::new("bat"), 0, Battery::new(BatteryParams::default(), 0.5));
        battery.recalculate_encoding(0, 3600);
        let pv = ProblemPart::new(DeviceId::new("pv"), 0, Pv::new(PvParams::default(), 0));
        let signals = SignalSnapshot::new().with_price(
            Commodity::ActivePower,
            StepSeries::constant(Tariff {
                import_per_kwh: 30.0,
                export_per_kwh: 8.0,
            }),
        );
        HouseholdProblem::new(
            vec![pv, battery],
            encoding,
            Arc::new(signals),
            SimulationTiming::new(0, 900, 3600).unwrap(),
            FitnessWeights::default(),
            RandomStream::new(3),
        )
        .unwrap()
    }

    #[test]
    fn empty_household_is_rejected() {
        let err = HouseholdProblem::new(
            Vec::new(),
            VariableEncoding::Binary,
            Arc::new(SignalSnapshot::new()),
            SimulationTiming::new(0, 900, 3600).unwrap(),
            FitnessWeights::default(),
            RandomStream::new(0),
        )
        .unwrap_err();
        assert!(matches!(err, ProblemError::NoParts));
    }

    #[test]
    fn layout_covers_only_controllable_parts() {
        let p = problem(VariableEncoding::Binary);
        assert_eq!(p.layout().len(), 8);
        assert_eq!(p.layout().slot(0), None);
        assert_eq!(p.layout().slot(1), Some(0..8));
    }

    #[test]
    fn wrong_length_gets_worst_fitness() {
        let p = problem(VariableEncoding::Binary);
        let e = p.evaluate(&Chromosome::Binary(vec![true; 3]));
        assert!(e.fitness.is_infinite());
        assert_eq!(e.objectives.len(), 3);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let p = problem(VariableEncoding::Binary);
        let c = Chromosome::Binary(vec![false, true, false, true, false, false, true, false]);
        let a = p.evaluate(&c);
        let b = p.evaluate(&c);
        assert_eq!(a.fitness, b.fitness);
        assert!(a.auxiliary.schedules.is_empty());
    }

    #[test]
    fn charging_costs_more_than_idling() {
        let p = problem(VariableEncoding::Binary);
        let idle = p.evaluate(&Chromosome::Binary(vec![false; 8]));
        let charge = p.evaluate(&Chromosome::Binary(vec![false, true, false, true, false, true, false, true]));
        assert!(charge.objectives[0] > idle.objectives[0]);
    }

    #[test]
    fn winner_reevaluation_carries_schedules() {
        let p = problem(VariableEncoding::Binary);
        let outcome = p.schedules_for(&Chromosome::Binary(vec![false; 8])).unwrap();
        assert_eq!(outcome.schedules.len(), 2);
        assert_eq!(outcome.schedules[1].device_id, DeviceId::new("bat"));
    }
}
