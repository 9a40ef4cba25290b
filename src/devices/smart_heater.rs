use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext};
use crate::ea::DecodedSolutionWrapper;
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::sim::state::{CommodityState, LimitedCommodityStateMap};

/// Fixed parameters of a PV-surplus immersion heater.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartHeaterParams {
    pub commodity: Commodity,
    /// Power of one heating stage (W).
    pub stage_w: i32,
    /// Number of stages; full power is `stage_w * stages`.
    pub stages: u32,
    /// Stops heating at or above this tank temperature (°C).
    pub max_temperature: f64,
}

impl Default for SmartHeaterParams {
    fn default() -> Self {
        Self {
            commodity: Commodity::HeatingHotWaterPower,
            stage_w: 500,
            stages: 7,
            max_temperature: 80.0,
        }
    }
}

/// Electric heater that soaks up PV surplus.
///
/// Each tick it reads the household meter of the previous tick, adds its
/// own draw back to get the surplus it could use, and picks the largest
/// stage that fits. It stops once the tank reaches `max_temperature` and
/// holds its stage when no meter state is available.
#[derive(Debug, Clone)]
pub struct SmartHeater {
    master: Arc<SmartHeaterParams>,
    produces: [Commodity; 2],
    observed_w: i32,
    power_w: i32,
}

impl SmartHeater {
    /// # Panics
    ///
    /// Panics if the stage power is not positive.
    pub fn new(params: SmartHeaterParams, observed_w: i32) -> Self {
        assert!(params.stage_w > 0);
        Self {
            produces: [Commodity::ActivePower, params.commodity],
            master: Arc::new(params),
            observed_w,
            power_w: observed_w,
        }
    }

    pub fn power_w(&self) -> i32 {
        self.power_w
    }

    fn max_power_w(&self) -> i64 {
        i64::from(self.master.stage_w) * i64::from(self.master.stages)
    }

    fn write(&self, outputs: &mut LimitedCommodityStateMap) {
        let p = f64::from(self.power_w);
        outputs.set_power(Commodity::ActivePower, p);
        outputs.set(self.master.commodity, CommodityState::power(-p));
    }
}

impl Capabilities for SmartHeater {
    fn produces(&self) -> &[Commodity] {
        &self.produces
    }

    fn consumes(&self) -> &[Commodity] {
        std::slice::from_ref(&self.master.commodity)
    }

    fn needs_ancillary_state(&self) -> bool {
        true
    }

    fn device_type(&self) -> &'static str {
        "SmartHeater"
    }
}

impl InterdependentModel for SmartHeater {
    fn initialize(
        &mut self,
        _run: &RunContext,
        _decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.power_w = self.observed_w.clamp(0, i32::try_from(self.max_power_w()).unwrap_or(i32::MAX));
        self.write(outputs);
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let too_hot = tick
            .input_temperature(self.master.commodity)
            .is_some_and(|t| t >= self.master.max_temperature);
        if too_hot {
            self.power_w = 0;
        } else if let Some(meter) = tick.ancillary {
            let surplus = i64::from(self.power_w) - meter.total(Commodity::ActivePower);
            let stage = i64::from(self.master.stage_w);
            let power = (surplus.max(0) / stage * stage).min(self.max_power_w());
            self.power_w = i32::try_from(power).unwrap_or(i32::MAX);
        }
        self.write(outputs);
        Ok(0.0)
    }
}
