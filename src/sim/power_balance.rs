//! Household grid-connection power balance.

use crate::profile::{Commodity, CommodityMap};
use crate::sim::state::LimitedCommodityStateMap;

/// Net power per grid commodity at the household meter.
///
/// All device outputs already follow the meter sign convention:
/// - Positive = import / load
/// - Negative = export / generation
///
/// Summation is pure, with **no sign flipping**. Non-grid commodities stay 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AncillaryMeterState {
    totals: CommodityMap<i64>,
}

impl AncillaryMeterState {
    /// Sums the grid commodities of every output map.
    pub fn from_outputs<'a>(outputs: impl IntoIterator<Item = &'a LimitedCommodityStateMap>) -> Self {
        let mut totals = CommodityMap::splat(0_i64);
        for map in outputs {
            for (commodity, state) in map.iter() {
                if commodity.is_grid_commodity() {
                    totals[commodity] += state.power_w.round() as i64;
                }
            }
        }
        Self { totals }
    }

    pub fn total(&self, commodity: Commodity) -> i64 {
        self.totals[commodity]
    }

    pub fn totals(&self) -> &CommodityMap<i64> {
        &self.totals
    }

    /// Electrical power currently fed into the grid (W, ≥ 0).
    pub fn feed_in_w(&self) -> i64 {
        (-self.totals[Commodity::ActivePower]).max(0)
    }
}
