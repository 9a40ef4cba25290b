use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext};
use crate::ea::DecodedSolutionWrapper;
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::sim::state::{CommodityState, LimitedCommodityStateMap};

/// Specific heat of water, J/(kg·K). One litre is taken as one kilogram.
const WATER_HEAT_CAPACITY: f64 = 4186.0;

/// Fixed parameters of a stratification-free hot-water tank.
#[derive(Debug, Clone, PartialEq)]
pub struct HotWaterTankParams {
    pub commodity: Commodity,
    pub volume_l: f64,
    /// Temperature of the room the tank stands in (°C).
    pub ambient_temperature: f64,
    /// Standing loss per kelvin above ambient (W/K).
    pub loss_w_per_k: f64,
    /// Comfort floor; cervisia accrues below it (°C).
    pub min_comfort_temperature: f64,
    /// Cervisia per kelvin-hour spent below the comfort floor.
    pub cervisia_per_kelvin_hour: f64,
}

impl Default for HotWaterTankParams {
    fn default() -> Self {
        Self {
            commodity: Commodity::HeatingHotWaterPower,
            volume_l: 750.0,
            ambient_temperature: 20.0,
            loss_w_per_k: 3.0,
            min_comfort_temperature: 50.0,
            cervisia_per_kelvin_hour: 1.0,
        }
    }
}

/// Thermal storage integrating the net power on its circuit.
///
/// The inputs are the summed outputs of every other device on the
/// circuit: producers (boiler, CHP) are negative and draws are positive,
/// so the tank temperature falls by `net · dt / C`. The tank reports its
/// temperature with zero power.
#[derive(Debug, Clone)]
pub struct HotWaterTank {
    master: Arc<HotWaterTankParams>,
    observed_temperature: f64,
    temperature: f64,
}

impl HotWaterTank {
    /// # Panics
    ///
    /// Panics if the volume is not positive or the loss factor negative.
    pub fn new(params: HotWaterTankParams, observed_temperature: f64) -> Self {
        assert!(params.volume_l > 0.0);
        assert!(params.loss_w_per_k >= 0.0);
        Self {
            master: Arc::new(params),
            observed_temperature,
            temperature: observed_temperature,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    fn heat_capacity_j_per_k(&self) -> f64 {
        self.master.volume_l * WATER_HEAT_CAPACITY
    }

    fn write(&self, outputs: &mut LimitedCommodityStateMap) {
        outputs.set(self.master.commodity, CommodityState::thermal(0.0, self.temperature));
    }
}

impl Capabilities for HotWaterTank {
    fn produces(&self) -> &[Commodity] {
        std::slice::from_ref(&self.master.commodity)
    }

    fn consumes(&self) -> &[Commodity] {
        std::slice::from_ref(&self.master.commodity)
    }

    fn device_type(&self) -> &'static str {
        "HotWaterTank"
    }
}

impl InterdependentModel for HotWaterTank {
    fn initialize(
        &mut self,
        _run: &RunContext,
        _decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.temperature = self.observed_temperature;
        self.write(outputs);
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let net_w = tick.inputs.map_or(0.0, |i| i.power(self.master.commodity));
        let loss_w = self.master.loss_w_per_k * (self.temperature - self.master.ambient_temperature);
        self.temperature -= (net_w + loss_w) * tick.dt_secs() / self.heat_capacity_j_per_k();
        if !self.temperature.is_finite() {
            return Err(DeviceError::NonFinite("tank temperature"));
        }
        self.write(outputs);

        let deficit = (self.master.min_comfort_temperature - self.temperature).max(0.0);
        Ok(deficit * tick.dt_hours() * self.master.cervisia_per_kelvin_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(inputs: Option<&LimitedCommodityStateMap>) -> TickContext<'_> {
        TickContext {
            time: 0,
            step_size: 3600,
            inputs,
            ancillary: None,
        }
    }

    fn lossless(volume_l: f64) -> HotWaterTankParams {
        HotWaterTankParams {
            volume_l,
            loss_w_per_k: 0.0,
            ..HotWaterTankParams::default()
        }
    }

    #[test]
    fn heating_raises_temperature() {
        // 4186 J/K for one litre; 4186 W for one second is one kelvin.
        let mut tank = HotWaterTank::new(lossless(1000.0), 50.0);
        let mut heat = LimitedCommodityStateMap::new();
        heat.set_power(Commodity::HeatingHotWaterPower, -4186.0);
        let mut out = LimitedCommodityStateMap::new();
        tank.step(&tick(Some(&heat)), &mut out).unwrap();
        assert!((tank.temperature() - 53.6).abs() < 1e-9);
        assert_eq!(out.temperature(Commodity::HeatingHotWaterPower), Some(tank.temperature()));
        assert_eq!(out.power(Commodity::HeatingHotWaterPower), 0.0);
    }

    #[test]
    fn no_input_is_no_exchange() {
        let mut tank = HotWaterTank::new(lossless(300.0), 60.0);
        let mut out = LimitedCommodityStateMap::new();
        tank.step(&tick(None), &mut out).unwrap();
        assert_eq!(tank.temperature(), 60.0);
    }

    #[test]
    fn standing_loss_cools_towards_ambient() {
        let mut tank = HotWaterTank::new(HotWaterTankParams::default(), 60.0);
        let mut out = LimitedCommodityStateMap::new();
        for _ in 0..24 {
            tank.step(&tick(None), &mut out).unwrap();
        }
        assert!(tank.temperature() < 60.0);
        assert!(tank.temperature() > 20.0);
    }

    #[test]
    fn cervisia_accrues_below_comfort() {
        let mut tank = HotWaterTank::new(lossless(1000.0), 40.0);
        let mut out = LimitedCommodityStateMap::new();
        let c = tank.step(&tick(None), &mut out).unwrap();
        assert!((c - 10.0).abs() < 1e-9);
    }

    #[test]
    fn initialize_resets_to_observed_state() {
        let mut tank = HotWaterTank::new(lossless(10.0), 55.0);
        let mut heat = LimitedCommodityStateMap::new();
        heat.set_power(Commodity::HeatingHotWaterPower, -1000.0);
        let mut out = LimitedCommodityStateMap::new();
        tank.step(&tick(Some(&heat)), &mut out).unwrap();
        let run = RunContext {
            reference_time: 0,
            encoding_horizon: 0,
            start_time: 0,
            step_size: 3600,
            keep_prediction: true,
        };
        tank.initialize(&run, None, &mut out).unwrap();
        assert_eq!(tank.temperature(), 55.0);
    }
}
