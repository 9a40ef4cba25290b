//! Problem parts: one device's contribution to an optimization run.

use std::sync::Arc;

use crate::devices::model::DeviceModel;
use crate::devices::types::{Capabilities, DeviceId, InterdependentModel, RunContext, TickContext};
use crate::ea::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding};
use crate::error::DeviceError;
use crate::profile::{Commodity, CommodityMap, LoadProfile, LoadProfileCompression};
use crate::random::RandomStream;
use crate::sim::power_balance::AncillaryMeterState;
use crate::sim::schedule::Schedule;
use crate::sim::state::LimitedCommodityStateMap;

/// Settings shared by every part of one interdependent calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationSettings {
    pub start_time: i64,
    pub step_size: i64,
    /// End of the simulated span; final profiles are closed here.
    pub horizon_end: i64,
    /// Record working load profiles. Off during search.
    pub create_load_profile: bool,
    /// Off makes prediction-driven models hold their observed value.
    pub keep_prediction: bool,
}

#[derive(Debug, Clone)]
struct PartHeader {
    device_id: DeviceId,
    compression: CommodityMap<LoadProfileCompression>,
    forces_reschedule: bool,
}

#[derive(Debug, Clone)]
struct RunState {
    settings: CalculationSettings,
    profile: LoadProfile,
    outputs: LimitedCommodityStateMap,
    cervisia: f64,
    failure: Option<DeviceError>,
    next_tick: i64,
    finalized: bool,
}

/// A device model bound to an identity, a reference time and run state.
///
/// Observers build and publish parts. The evaluator never steps a
/// published part directly: every evaluation works on a [`fork`], which
/// shares the immutable parameters and copies the mutable model state.
///
/// Lifecycle of a fork: `initialize_interdependent_calculation` once,
/// `calculate_next_step` once per tick, `get_final_interdependent_schedule`
/// once. Calls out of order fail with [`DeviceError::Lifecycle`].
///
/// [`fork`]: ProblemPart::fork
#[derive(Debug, Clone)]
pub struct ProblemPart {
    header: Arc<PartHeader>,
    reference_time: i64,
    encoding_horizon: i64,
    model: DeviceModel,
    run: Option<RunState>,
}

impl ProblemPart {
    pub fn new(device_id: DeviceId, reference_time: i64, model: impl Into<DeviceModel>) -> Self {
        Self {
            header: Arc::new(PartHeader {
                device_id,
                compression: CommodityMap::default(),
                forces_reschedule: false,
            }),
            reference_time,
            encoding_horizon: reference_time,
            model: model.into(),
            run: None,
        }
    }

    /// Compression applied to every commodity of the final schedule.
    pub fn with_compression(mut self, compression: LoadProfileCompression) -> Self {
        Arc::make_mut(&mut self.header).compression = CommodityMap::splat(compression);
        self
    }

    /// Overrides the compression of one commodity.
    pub fn with_commodity_compression(mut self, commodity: Commodity, compression: LoadProfileCompression) -> Self {
        Arc::make_mut(&mut self.header).compression[commodity] = compression;
        self
    }

    /// Marks the part as deviating enough from its last prediction to
    /// warrant an immediate reschedule.
    pub fn with_forced_reschedule(mut self, force: bool) -> Self {
        Arc::make_mut(&mut self.header).forces_reschedule = force;
        self
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.header.device_id
    }

    pub fn reference_time(&self) -> i64 {
        self.reference_time
    }

    pub fn encoding_horizon(&self) -> i64 {
        self.encoding_horizon
    }

    pub fn compression(&self, commodity: Commodity) -> &LoadProfileCompression {
        &self.header.compression[commodity]
    }

    pub fn forces_reschedule(&self) -> bool {
        self.header.forces_reschedule
    }

    pub fn model(&self) -> &DeviceModel {
        &self.model
    }

    pub fn device_type(&self) -> &'static str {
        self.model.device_type()
    }

    pub fn causes_scheduling(&self) -> bool {
        self.model.causes_scheduling()
    }

    pub fn needs_ancillary_state(&self) -> bool {
        self.model.needs_ancillary_state()
    }

    pub fn reacts_to_input_states(&self) -> bool {
        self.model.reacts_to_input_states()
    }

    pub fn produces(&self) -> &[Commodity] {
        self.model.produces()
    }

    pub fn consumes(&self) -> &[Commodity] {
        self.model.consumes()
    }

    /// Whether any produced commodity is metered at the grid connection.
    pub fn affects_grid(&self) -> bool {
        self.produces().iter().any(|c| c.is_grid_commodity())
    }

    /// Re-anchors the part's variables at `current_time`, covering up to
    /// `max_horizon`. The physical state is left untouched.
    pub fn recalculate_encoding(&mut self, current_time: i64, max_horizon: i64) {
        self.reference_time = current_time;
        self.encoding_horizon = max_horizon.max(current_time);
    }

    /// Decision variables this part contributes under `encoding`.
    pub fn variable_information(&self, encoding: VariableEncoding) -> EncodedVariableInformation {
        if !self.causes_scheduling() {
            return EncodedVariableInformation::none();
        }
        self.model
            .variable_information(encoding, self.reference_time, self.encoding_horizon)
    }

    /// Independent copy for one evaluation, reseeded from `stream`.
    pub fn fork(&self, stream: &RandomStream) -> ProblemPart {
        let mut model = self.model.clone();
        model.reseed(stream);
        ProblemPart {
            header: Arc::clone(&self.header),
            reference_time: self.reference_time,
            encoding_horizon: self.encoding_horizon,
            model,
            run: None,
        }
    }

    /// Resets run state and computes the initial outputs, which serve as
    /// the inputs of the first tick.
    ///
    /// A model error marks the part failed for the rest of the run; the
    /// error is returned for reporting.
    pub fn initialize_interdependent_calculation(
        &mut self,
        settings: CalculationSettings,
        decoded: Option<&DecodedSolutionWrapper>,
    ) -> Result<(), DeviceError> {
        if self.run.is_some() {
            return Err(DeviceError::Lifecycle("initialized twice"));
        }
        let context = RunContext {
            reference_time: self.reference_time,
            encoding_horizon: self.encoding_horizon,
            start_time: settings.start_time,
            step_size: settings.step_size,
            keep_prediction: settings.keep_prediction,
        };
        let mut run = RunState {
            settings,
            profile: LoadProfile::new(),
            outputs: LimitedCommodityStateMap::new(),
            cervisia: 0.0,
            failure: None,
            next_tick: settings.start_time,
            finalized: false,
        };
        let result = self.model.initialize(&context, decoded, &mut run.outputs);
        if let Err(e) = &result {
            run.outputs.clear();
            run.failure = Some(e.clone());
        }
        self.run = Some(run);
        result
    }

    /// Advances one tick.
    ///
    /// `inputs` and `ancillary` are ignored unless the model declared it
    /// reads them. An error is returned only on the tick the model fails;
    /// afterwards the part contributes zero.
    pub fn calculate_next_step(
        &mut self,
        inputs: Option<&LimitedCommodityStateMap>,
        ancillary: Option<&AncillaryMeterState>,
    ) -> Result<(), DeviceError> {
        let reacts = self.model.reacts_to_input_states();
        let needs_ancillary = self.model.needs_ancillary_state();
        let run = self.run.as_mut().ok_or(DeviceError::Lifecycle("step before initialization"))?;
        if run.finalized {
            return Err(DeviceError::Lifecycle("step after finalization"));
        }
        let time = run.next_tick;
        let mut result = Ok(());
        if run.failure.is_none() {
            let tick = TickContext {
                time,
                step_size: run.settings.step_size,
                inputs: inputs.filter(|_| reacts),
                ancillary: ancillary.filter(|_| needs_ancillary),
            };
            run.outputs.clear();
            let outcome = self
                .model
                .step(&tick, &mut run.outputs)
                .and_then(|c| if c.is_finite() { Ok(c) } else { Err(DeviceError::NonFinite("cervisia")) });
            match outcome {
                Ok(c) => run.cervisia += c,
                Err(e) => {
                    run.outputs.clear();
                    run.failure = Some(e.clone());
                    result = Err(e);
                }
            }
        }
        if run.settings.create_load_profile {
            for &commodity in self.model.produces() {
                let value = run.outputs.power(commodity).round() as i32;
                if run.profile.entries(commodity).last().map(|e| e.1) != Some(value) {
                    run.profile.set_load(commodity, time, value);
                }
            }
        }
        run.next_tick += run.settings.step_size;
        result
    }

    /// Outputs of the most recent tick (the initial outputs before the first).
    pub fn outputs(&self) -> Option<&LimitedCommodityStateMap> {
        self.run.as_ref().map(|r| &r.outputs)
    }

    /// Cervisia accrued so far in the current run.
    pub fn cervisia(&self) -> f64 {
        self.run.as_ref().map_or(0.0, |r| r.cervisia)
    }

    pub fn failure(&self) -> Option<&DeviceError> {
        self.run.as_ref().and_then(|r| r.failure.as_ref())
    }

    /// Closes the working profile at the horizon end, compresses it and
    /// wraps it into a [`Schedule`]. A failed part yields an empty one.
    pub fn get_final_interdependent_schedule(&mut self) -> Result<Schedule, DeviceError> {
        let run = self.run.as_mut().ok_or(DeviceError::Lifecycle("finalized before initialization"))?;
        if run.finalized {
            return Err(DeviceError::Lifecycle("finalized twice"));
        }
        run.finalized = true;
        let device_id = self.header.device_id.clone();
        let device_type = self.model.device_type();
        if run.failure.is_some() {
            return Ok(Schedule::empty(device_id, device_type));
        }
        let mut profile = std::mem::take(&mut run.profile);
        profile.close(run.settings.horizon_end);
        Ok(Schedule {
            device_id,
            device_type,
            profile: profile.compressed_per_commodity(&self.header.compression),
            cervisia: run.cervisia,
            failed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::battery::{Battery, BatteryParams};
    use crate::devices::hot_water_tank::{HotWaterTank, HotWaterTankParams};
    use crate::devices::pv::{Pv, PvParams};

    fn settings(create_load_profile: bool) -> CalculationSettings {
        CalculationSettings {
            start_time: 0,
            step_size: 900,
            horizon_end: 3600,
            create_load_profile,
            keep_prediction: true,
        }
    }

    fn battery_part() -> ProblemPart {
        let mut p = ProblemPart::new(DeviceId::new("bat"), 0, Battery::new(BatteryParams::default(), 0.5));
        p.recalculate_encoding(0, 3600);
        p
    }

    #[test]
    fn lifecycle_is_enforced() {
        let mut part = battery_part().fork(&RandomStream::new(1));
        assert!(matches!(part.calculate_next_step(None, None), Err(DeviceError::Lifecycle(_))));
        assert!(matches!(part.get_final_interdependent_schedule(), Err(DeviceError::Lifecycle(_))));
        let decoded = DecodedSolutionWrapper::Booleans(vec![false; 8]);
        part.initialize_interdependent_calculation(settings(true), Some(&decoded)).unwrap();
        assert!(matches!(
            part.initialize_interdependent_calculation(settings(true), Some(&decoded)),
            Err(DeviceError::Lifecycle(_))
        ));
        for _ in 0..4 {
            part.calculate_next_step(None, None).unwrap();
        }
        part.get_final_interdependent_schedule().unwrap();
        assert!(matches!(part.calculate_next_step(None, None), Err(DeviceError::Lifecycle(_))));
        assert!(matches!(part.get_final_interdependent_schedule(), Err(DeviceError::Lifecycle(_))));
    }

    #[test]
    fn encoding_follows_reference_time() {
        let mut part = battery_part();
        assert_eq!(part.variable_information(VariableEncoding::Binary).len(), 8);
        part.recalculate_encoding(1800, 3600);
        assert_eq!(part.variable_information(VariableEncoding::Binary).len(), 4);
        assert_eq!(part.reference_time(), 1800);
    }

    #[test]
    fn schedule_records_changes_and_closes_at_horizon() {
        let mut part = battery_part().fork(&RandomStream::new(1));
        // charge, charge, idle, discharge
        let bits = vec![false, true, false, true, false, false, true, false];
        part.initialize_interdependent_calculation(settings(true), Some(&DecodedSolutionWrapper::Booleans(bits)))
            .unwrap();
        for _ in 0..4 {
            part.calculate_next_step(None, None).unwrap();
        }
        let s = part.get_final_interdependent_schedule().unwrap();
        assert_eq!(
            s.profile.entries(Commodity::ActivePower),
            &[(0, 5000), (1800, 0), (2700, -5000)]
        );
        assert_eq!(s.profile.end_time(), Some(3600));
        assert_eq!(s.device_type, "Battery");
        assert!(!s.failed);
        assert!(s.cervisia > 0.0);
    }

    #[test]
    fn no_profile_during_search() {
        let mut part = battery_part().fork(&RandomStream::new(1));
        part.initialize_interdependent_calculation(
            settings(false),
            Some(&DecodedSolutionWrapper::Booleans(vec![false, true, false, false, false, false, false, false])),
        )
        .unwrap();
        part.calculate_next_step(None, None).unwrap();
        let s = part.get_final_interdependent_schedule().unwrap();
        assert!(s.profile.is_empty());
    }

    #[test]
    fn commodity_compression_overrides_default() {
        let part = battery_part()
            .with_compression(LoadProfileCompression::timeslot(3600))
            .with_commodity_compression(Commodity::ActivePower, LoadProfileCompression::raw());
        let mut part = part.fork(&RandomStream::new(1));
        assert_eq!(part.compression(Commodity::ActivePower), &LoadProfileCompression::raw());
        assert_eq!(part.compression(Commodity::ReactivePower), &LoadProfileCompression::timeslot(3600));
        let bits = vec![false, true, false, true, false, false, true, false];
        part.initialize_interdependent_calculation(settings(true), Some(&DecodedSolutionWrapper::Booleans(bits)))
            .unwrap();
        for _ in 0..4 {
            part.calculate_next_step(None, None).unwrap();
        }
        let s = part.get_final_interdependent_schedule().unwrap();
        assert_eq!(s.profile.entries(Commodity::ActivePower).len(), 3);
    }

    #[test]
    fn init_failure_yields_empty_schedule() {
        let mut part = battery_part().fork(&RandomStream::new(1));
        let err = part.initialize_interdependent_calculation(settings(true), None).unwrap_err();
        assert_eq!(err, DeviceError::MissingDecodedSolution);
        assert!(part.outputs().is_some_and(|o| o.is_empty()));
        part.calculate_next_step(None, None).unwrap();
        let s = part.get_final_interdependent_schedule().unwrap();
        assert!(s.failed);
        assert!(s.profile.is_empty());
    }

    #[test]
    fn step_failure_zeroes_outputs_for_the_rest_of_the_run() {
        let tank = HotWaterTank::new(HotWaterTankParams::default(), 60.0);
        let mut part = ProblemPart::new(DeviceId::new("tank"), 0, tank).fork(&RandomStream::new(1));
        part.initialize_interdependent_calculation(settings(true), None).unwrap();
        let mut poisoned = LimitedCommodityStateMap::new();
        poisoned.set_power(Commodity::HeatingHotWaterPower, f64::NAN);
        assert!(part.calculate_next_step(Some(&poisoned), None).is_err());
        assert!(part.outputs().is_some_and(|o| o.is_empty()));
        assert!(part.calculate_next_step(None, None).is_ok());
        assert!(part.failure().is_some());
    }

    #[test]
    fn forks_share_parameters_but_not_state() {
        let template = battery_part();
        let mut a = template.fork(&RandomStream::new(1));
        let b = template.fork(&RandomStream::new(2));
        a.initialize_interdependent_calculation(
            settings(false),
            Some(&DecodedSolutionWrapper::Booleans(vec![false, true, false, true, false, true, false, true])),
        )
        .unwrap();
        for _ in 0..4 {
            a.calculate_next_step(None, None).unwrap();
        }
        let soc = |p: &ProblemPart| match p.model() {
            DeviceModel::Battery(b) => b.soc(),
            _ => unreachable!(),
        };
        assert!(soc(&a) > 0.5);
        assert_eq!(soc(&b), 0.5);
        assert_eq!(soc(&template), 0.5);
        assert!(b.outputs().is_none());
    }

    #[test]
    fn grid_effect_follows_produced_commodities() {
        let pv = ProblemPart::new(DeviceId::new("pv"), 0, Pv::new(PvParams::default(), 0));
        let tank = ProblemPart::new(DeviceId::new("tank"), 0, HotWaterTank::new(HotWaterTankParams::default(), 60.0));
        assert!(pv.affects_grid());
        assert!(!tank.affects_grid());
        assert!(tank.reacts_to_input_states());
        assert!(!pv.reacts_to_input_states());
    }
}
