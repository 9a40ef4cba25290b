//! Tick-stepped co-simulation of all problem parts for one chromosome.
//!
//! Coupling is strictly one tick delayed: every part sees, at tick `t`, the
//! outputs the other parts produced at tick `t - 1` (the initial outputs for
//! the first tick). Part step order therefore never matters.

use crate::devices::{CalculationSettings, ProblemPart};
use crate::ea::DecodedSolutionWrapper;
use crate::error::EvaluationError;
use crate::profile::Commodity;
use crate::random::RandomStream;
use crate::signals::SignalSnapshot;
use crate::sim::clock::Clock;
use crate::sim::power_balance::AncillaryMeterState;
use crate::sim::state::LimitedCommodityStateMap;
use crate::sim::types::{EvaluationOutcome, Objectives, SimulationTiming};

/// Which producer outputs feed which consumer, fixed per problem.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRouting {
    /// Per part: `(producer index, commodity)` pairs it reads.
    sources: Vec<Vec<(usize, Commodity)>>,
    affects_grid: Vec<bool>,
}

impl InputRouting {
    pub fn new(parts: &[ProblemPart]) -> Self {
        let sources = parts
            .iter()
            .enumerate()
            .map(|(i, consumer)| {
                if !consumer.reacts_to_input_states() {
                    return Vec::new();
                }
                let mut routes = Vec::new();
                for (j, producer) in parts.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    for c in consumer.consumes() {
                        if producer.produces().contains(c) {
                            routes.push((j, *c));
                        }
                    }
                }
                routes
            })
            .collect();
        Self {
            sources,
            affects_grid: parts.iter().map(ProblemPart::affects_grid).collect(),
        }
    }

    /// Producers feeding part `index`.
    pub fn sources(&self, index: usize) -> &[(usize, Commodity)] {
        self.sources.get(index).map_or(&[], Vec::as_slice)
    }

    fn build_inputs(&self, index: usize, previous: &[LimitedCommodityStateMap], out: &mut LimitedCommodityStateMap) {
        out.clear();
        for &(j, c) in self.sources(index) {
            if let Some(state) = previous[j].get(c) {
                out.accumulate(c, state);
            }
        }
    }

    fn meter(&self, outputs: &[LimitedCommodityStateMap]) -> AncillaryMeterState {
        AncillaryMeterState::from_outputs(
            outputs
                .iter()
                .zip(&self.affects_grid)
                .filter(|(_, grid)| **grid)
                .map(|(o, _)| o),
        )
    }
}

/// One running interdependent calculation.
///
/// Created in its initialized state by [`InterdependentSimulation::initialize`],
/// stepped with [`step`](Self::step) until the horizon is covered, and
/// consumed by [`finalize`](Self::finalize).
pub struct InterdependentSimulation<'a> {
    timing: SimulationTiming,
    signals: &'a SignalSnapshot,
    routing: &'a InputRouting,
    create_load_profile: bool,
    clock: Clock,
    parts: Vec<ProblemPart>,
    previous: Vec<LimitedCommodityStateMap>,
    current: Vec<LimitedCommodityStateMap>,
    inputs: Vec<LimitedCommodityStateMap>,
    ancillary: AncillaryMeterState,
    failed: Vec<bool>,
    energy_cost: f64,
    limit_violation_wh: f64,
}

/// Run-wide inputs of [`InterdependentSimulation::initialize`].
#[derive(Debug, Clone, Copy)]
pub struct SimulationSetup<'a> {
    pub timing: SimulationTiming,
    pub signals: &'a SignalSnapshot,
    pub routing: &'a InputRouting,
    pub stream: RandomStream,
    pub create_load_profile: bool,
    pub keep_prediction: bool,
}

impl<'a> InterdependentSimulation<'a> {
    /// Forks every template, hands each its decoded fragment and collects
    /// the initial outputs.
    pub fn initialize(
        setup: SimulationSetup<'a>,
        templates: &[ProblemPart],
        decoded: Vec<Option<DecodedSolutionWrapper>>,
    ) -> Self {
        let settings = CalculationSettings {
            start_time: setup.timing.start_time,
            step_size: setup.timing.step_size,
            horizon_end: setup.timing.horizon_end,
            create_load_profile: setup.create_load_profile,
            keep_prediction: setup.keep_prediction,
        };
        let n = templates.len();
        let mut decoded = decoded.into_iter();
        let mut parts = Vec::with_capacity(n);
        let mut failed = vec![false; n];
        for (i, template) in templates.iter().enumerate() {
            let mut part = template.fork(&setup.stream.fork(i as u64));
            let fragment = decoded.next().flatten();
            if let Err(e) = part.initialize_interdependent_calculation(settings, fragment.as_ref()) {
                tracing::debug!(device = %part.device_id(), error = %e, "part failed to initialize");
                failed[i] = true;
            }
            parts.push(part);
        }
        let previous = parts.iter().map(|p| p.outputs().cloned().unwrap_or_default()).collect();
        Self {
            timing: setup.timing,
            signals: setup.signals,
            routing: setup.routing,
            create_load_profile: setup.create_load_profile,
            clock: Clock::new(setup.timing),
            parts,
            previous,
            current: vec![LimitedCommodityStateMap::new(); n],
            inputs: vec![LimitedCommodityStateMap::new(); n],
            ancillary: AncillaryMeterState::default(),
            failed,
            energy_cost: 0.0,
            limit_violation_wh: 0.0,
        }
    }

    /// Simulates the next tick. Returns `false` once the horizon is covered.
    pub fn step(&mut self) -> bool {
        let Some(time) = self.clock.tick() else {
            return false;
        };

        self.ancillary = self.routing.meter(&self.previous);
        for i in 0..self.parts.len() {
            self.routing.build_inputs(i, &self.previous, &mut self.inputs[i]);
        }

        for (i, part) in self.parts.iter_mut().enumerate() {
            if let Err(e) = part.calculate_next_step(Some(&self.inputs[i]), Some(&self.ancillary)) {
                tracing::debug!(device = %part.device_id(), time, error = %e, "part failed during step");
                self.failed[i] = true;
            }
            match part.outputs() {
                Some(out) => self.current[i].clone_from(out),
                None => self.current[i].clear(),
            }
        }

        let meter = self.routing.meter(&self.current);
        // The last tick may end at the horizon before a full step.
        let duration = self.timing.step_size.min(self.timing.horizon_end - time);
        let cost = self.signals.tick_cost(meter.totals(), time, duration);
        self.energy_cost += cost.cost;
        self.limit_violation_wh += cost.violation_wh;

        std::mem::swap(&mut self.previous, &mut self.current);
        true
    }

    /// Steps until the horizon is covered.
    pub fn run_to_end(&mut self) {
        while self.step() {}
    }

    /// Inputs part `index` saw on the most recent tick.
    pub fn inputs_for(&self, index: usize) -> Option<&LimitedCommodityStateMap> {
        self.inputs.get(index)
    }

    /// Outputs part `index` produced on the most recent tick.
    pub fn outputs_of(&self, index: usize) -> Option<&LimitedCommodityStateMap> {
        self.previous.get(index)
    }

    /// Meter totals handed to the parts on the most recent tick.
    pub fn ancillary(&self) -> &AncillaryMeterState {
        &self.ancillary
    }

    pub fn parts(&self) -> &[ProblemPart] {
        &self.parts
    }

    pub fn steps_taken(&self) -> usize {
        self.clock.elapsed_steps()
    }

    /// Collects schedules and objectives.
    ///
    /// Fails when called before the horizon has been covered.
    pub fn finalize(mut self) -> Result<EvaluationOutcome, EvaluationError> {
        if !self.clock.is_done() {
            return Err(EvaluationError::Phase {
                action: "finalize",
                phase: "mid-horizon",
            });
        }
        let mut schedules = Vec::with_capacity(self.parts.len());
        let mut cervisia = 0.0;
        for (i, part) in self.parts.iter_mut().enumerate() {
            cervisia += part.cervisia();
            match part.get_final_interdependent_schedule() {
                Ok(s) => schedules.push(s),
                Err(e) => {
                    tracing::debug!(device = %part.device_id(), error = %e, "part failed to finalize");
                    self.failed[i] = true;
                }
            }
        }
        if !self.create_load_profile {
            schedules.clear();
        }
        let failed_devices = self
            .parts
            .iter()
            .zip(&self.failed)
            .filter(|(_, f)| **f)
            .map(|(p, _)| p.device_id().clone())
            .collect();
        Ok(EvaluationOutcome {
            objectives: Objectives {
                energy_cost: self.energy_cost,
                limit_violation_wh: self.limit_violation_wh,
                cervisia,
            },
            schedules,
            failed_devices,
        })
    }
}
