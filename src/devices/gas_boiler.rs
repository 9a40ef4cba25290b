use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext};
use crate::ea::DecodedSolutionWrapper;
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::sim::state::{CommodityState, LimitedCommodityStateMap};

/// Fixed parameters of a gas boiler.
#[derive(Debug, Clone, PartialEq)]
pub struct GasBoilerParams {
    /// Switch on below this tank temperature (°C).
    pub min_temperature: f64,
    /// Switch off above this tank temperature (°C).
    pub max_temperature: f64,
    /// Heat delivered while running (W, positive).
    pub max_hot_water_power_w: i32,
    /// Gas drawn while running (W, positive).
    pub max_gas_power_w: i32,
    /// Circuit the boiler heats.
    pub commodity: Commodity,
    /// Cost charged per switch-on.
    pub cervisia_per_start: f64,
}

impl Default for GasBoilerParams {
    fn default() -> Self {
        Self {
            min_temperature: 60.0,
            max_temperature: 80.0,
            max_hot_water_power_w: 15_000,
            max_gas_power_w: 16_700,
            commodity: Commodity::HeatingHotWaterPower,
            cervisia_per_start: 0.0,
        }
    }
}

/// On/off gas boiler with a temperature hysteresis band.
///
/// Reads the temperature of the circuit it heats and switches on below
/// `min_temperature`, off above `max_temperature`, and otherwise keeps its
/// state. Without temperature input it keeps its state too.
///
/// # Power Flow Convention
/// - Heat output is **negative** (production on the heating circuit)
/// - Gas draw is **positive** (consumption at the gas meter)
#[derive(Debug, Clone)]
pub struct GasBoiler {
    master: Arc<GasBoilerParams>,
    produces: [Commodity; 2],
    observed_on: bool,
    on: bool,
}

impl GasBoiler {
    /// # Panics
    ///
    /// Panics if the hysteresis band is empty or a power is negative.
    pub fn new(params: GasBoilerParams, observed_on: bool) -> Self {
        assert!(params.min_temperature < params.max_temperature);
        assert!(params.max_hot_water_power_w >= 0 && params.max_gas_power_w >= 0);
        Self {
            produces: [params.commodity, Commodity::NaturalGasPower],
            master: Arc::new(params),
            observed_on,
            on: observed_on,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    fn write(&self, outputs: &mut LimitedCommodityStateMap) {
        let (heat, gas) = if self.on {
            (-f64::from(self.master.max_hot_water_power_w), f64::from(self.master.max_gas_power_w))
        } else {
            (0.0, 0.0)
        };
        outputs.set(self.master.commodity, CommodityState::power(heat));
        outputs.set_power(Commodity::NaturalGasPower, gas);
    }
}

impl Capabilities for GasBoiler {
    fn produces(&self) -> &[Commodity] {
        &self.produces
    }

    fn consumes(&self) -> &[Commodity] {
        std::slice::from_ref(&self.master.commodity)
    }

    fn device_type(&self) -> &'static str {
        "GasBoiler"
    }
}

impl InterdependentModel for GasBoiler {
    fn initialize(
        &mut self,
        _run: &RunContext,
        _decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.on = self.observed_on;
        self.write(outputs);
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let was_on = self.on;
        if let Some(t) = tick.input_temperature(self.master.commodity) {
            if t < self.master.min_temperature {
                self.on = true;
            } else if t > self.master.max_temperature {
                self.on = false;
            }
        }
        self.write(outputs);
        Ok(if self.on && !was_on { self.master.cervisia_per_start } else { 0.0 })
    }
}
