use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext, slot_count};
use crate::ea::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding};
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::sim::state::{CommodityState, LimitedCommodityStateMap};

/// Fixed parameters of a micro combined heat and power unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChpParams {
    /// Electrical output while running (W, positive).
    pub active_power_w: i32,
    /// Heat output while running (W, positive).
    pub thermal_power_w: i32,
    /// Gas input while running (W, positive).
    pub gas_power_w: i32,
    /// Forced on below this circuit temperature (°C).
    pub min_temperature: f64,
    /// Forced off above this circuit temperature (°C).
    pub max_temperature: f64,
    /// Length of one run-request slot (s).
    pub slot_secs: i64,
    pub commodity: Commodity,
    /// Cervisia per start, for wear.
    pub cervisia_per_start: f64,
}

impl Default for ChpParams {
    fn default() -> Self {
        Self {
            active_power_w: 5500,
            thermal_power_w: 12_500,
            gas_power_w: 20_500,
            min_temperature: 55.0,
            max_temperature: 80.0,
            slot_secs: 900,
            commodity: Commodity::HeatingHotWaterPower,
            cervisia_per_start: 5.0,
        }
    }
}

/// CHP with one run request bit per slot and a temperature override.
///
/// The circuit temperature overrides the request: below `min_temperature`
/// the unit runs, above `max_temperature` it stops. Real encoding decodes
/// genes ≥ 0.5 as a run request.
///
/// # Power Flow Convention
/// Electricity and heat are **negative** (production), gas is positive.
#[derive(Debug, Clone)]
pub struct Chp {
    master: Arc<ChpParams>,
    produces: [Commodity; 3],
    observed_running: bool,
    running: bool,
    reference_time: i64,
    requests: Vec<bool>,
}

impl Chp {
    /// # Panics
    ///
    /// Panics if the temperature band is empty or the slot length not positive.
    pub fn new(params: ChpParams, observed_running: bool) -> Self {
        assert!(params.min_temperature < params.max_temperature);
        assert!(params.slot_secs > 0);
        Self {
            produces: [Commodity::ActivePower, params.commodity, Commodity::NaturalGasPower],
            master: Arc::new(params),
            observed_running,
            running: observed_running,
            reference_time: 0,
            requests: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn slots(&self, reference_time: i64, encoding_horizon: i64) -> usize {
        slot_count(reference_time, encoding_horizon, self.master.slot_secs)
    }

    fn write(&self, outputs: &mut LimitedCommodityStateMap) {
        let m = &self.master;
        let (el, heat, gas) = if self.running {
            (-m.active_power_w, -m.thermal_power_w, m.gas_power_w)
        } else {
            (0, 0, 0)
        };
        outputs.set_power(Commodity::ActivePower, f64::from(el));
        outputs.set(m.commodity, CommodityState::power(f64::from(heat)));
        outputs.set_power(Commodity::NaturalGasPower, f64::from(gas));
    }
}

impl Capabilities for Chp {
    fn produces(&self) -> &[Commodity] {
        &self.produces
    }

    fn consumes(&self) -> &[Commodity] {
        std::slice::from_ref(&self.master.commodity)
    }

    fn causes_scheduling(&self) -> bool {
        true
    }

    fn device_type(&self) -> &'static str {
        "CHP"
    }
}

impl InterdependentModel for Chp {
    fn variable_information(
        &self,
        encoding: VariableEncoding,
        reference_time: i64,
        encoding_horizon: i64,
    ) -> EncodedVariableInformation {
        let slots = self.slots(reference_time, encoding_horizon);
        match encoding {
            VariableEncoding::Binary => EncodedVariableInformation::binary(slots),
            VariableEncoding::Real => EncodedVariableInformation::real(vec![(0.0, 1.0); slots], false),
        }
    }

    fn initialize(
        &mut self,
        run: &RunContext,
        decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.running = self.observed_running;
        self.reference_time = run.reference_time;
        let slots = self.slots(run.reference_time, run.encoding_horizon);
        self.requests = match decoded {
            Some(DecodedSolutionWrapper::Booleans(b)) => b.clone(),
            Some(DecodedSolutionWrapper::Reals(v)) => v.iter().map(|x| *x >= 0.5).collect(),
            Some(DecodedSolutionWrapper::Integers(v)) => v.iter().map(|x| *x != 0).collect(),
            None if slots == 0 => Vec::new(),
            None => return Err(DeviceError::MissingDecodedSolution),
        };
        if self.requests.len() != slots {
            return Err(DeviceError::DecodedLength {
                expected: slots,
                found: self.requests.len(),
            });
        }
        self.write(outputs);
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let offset = tick.time - self.reference_time;
        let requested = offset >= 0
            && self
                .requests
                .get((offset / self.master.slot_secs) as usize)
                .copied()
                .unwrap_or(false);
        let was_running = self.running;
        self.running = match tick.input_temperature(self.master.commodity) {
            Some(t) if t < self.master.min_temperature => true,
            Some(t) if t > self.master.max_temperature => false,
            _ => requested,
        };
        self.write(outputs);
        Ok(if self.running && !was_running { self.master.cervisia_per_start } else { 0.0 })
    }
}
