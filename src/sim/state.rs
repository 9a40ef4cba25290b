//! Per-tick commodity states exchanged between device models.

use crate::profile::{Commodity, CommodityMap};

/// State of one commodity at one device port.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommodityState {
    /// Power in W, positive = consumption, negative = production.
    pub power_w: f64,
    /// Medium temperature in °C, for thermal commodities.
    pub temperature: Option<f64>,
}

impl CommodityState {
    pub fn power(power_w: f64) -> Self {
        Self {
            power_w,
            temperature: None,
        }
    }

    pub fn thermal(power_w: f64, temperature: f64) -> Self {
        Self {
            power_w,
            temperature: Some(temperature),
        }
    }
}

/// Commodity states restricted to the commodities a device deals with.
///
/// Used both for a device's outputs and for the inputs it sees, which are
/// the summed outputs of the other producers of its consumed commodities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LimitedCommodityStateMap {
    states: CommodityMap<Option<CommodityState>>,
}

impl LimitedCommodityStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        for (_, slot) in self.states.iter_mut() {
            *slot = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.states.iter().all(|(_, s)| s.is_none())
    }

    pub fn get(&self, commodity: Commodity) -> Option<&CommodityState> {
        self.states[commodity].as_ref()
    }

    pub fn set(&mut self, commodity: Commodity, state: CommodityState) {
        self.states[commodity] = Some(state);
    }

    pub fn set_power(&mut self, commodity: Commodity, power_w: f64) {
        self.set(commodity, CommodityState::power(power_w));
    }

    /// Power of `commodity`, 0 when absent.
    pub fn power(&self, commodity: Commodity) -> f64 {
        self.get(commodity).map_or(0.0, |s| s.power_w)
    }

    pub fn temperature(&self, commodity: Commodity) -> Option<f64> {
        self.get(commodity).and_then(|s| s.temperature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Commodity, &CommodityState)> {
        self.states.iter().filter_map(|(c, s)| s.as_ref().map(|s| (c, s)))
    }

    /// Adds `state` into the slot for `commodity`.
    ///
    /// Powers sum. The first temperature seen is kept, so a single source
    /// of a thermal medium (a tank) defines the temperature.
    pub fn accumulate(&mut self, commodity: Commodity, state: &CommodityState) {
        let slot = self.states[commodity].get_or_insert_with(CommodityState::default);
        slot.power_w += state.power_w;
        if slot.temperature.is_none() {
            slot.temperature = state.temperature;
        }
    }
}
