use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext};
use crate::ea::DecodedSolutionWrapper;
use crate::error::DeviceError;
use crate::profile::{Commodity, LoadProfile};
use crate::sim::state::LimitedCommodityStateMap;

/// Predicted heat draw on one thermal circuit (space heating or hot water).
///
/// Follows its prediction profile, or holds the observed draw when the run
/// does not keep predictions.
#[derive(Debug, Clone)]
pub struct ThermalDemand {
    commodity: Commodity,
    prediction: Arc<LoadProfile>,
    observed_w: i32,
    keep_prediction: bool,
}

impl ThermalDemand {
    /// `prediction` is in absolute time and positive for draws.
    pub fn new(commodity: Commodity, prediction: LoadProfile, observed_w: i32) -> Self {
        Self {
            commodity,
            prediction: Arc::new(prediction),
            observed_w,
            keep_prediction: true,
        }
    }

    pub fn prediction(&self) -> &LoadProfile {
        &self.prediction
    }

    fn demand_at(&self, time: i64) -> i32 {
        if self.keep_prediction {
            self.prediction.value_at(self.commodity, time).max(0)
        } else {
            self.observed_w
        }
    }
}

impl Capabilities for ThermalDemand {
    fn produces(&self) -> &[Commodity] {
        std::slice::from_ref(&self.commodity)
    }

    fn device_type(&self) -> &'static str {
        match self.commodity {
            Commodity::DomesticHotWaterPower => "DomesticHotWaterDemand",
            _ => "SpaceHeatingDemand",
        }
    }
}

impl InterdependentModel for ThermalDemand {
    fn initialize(
        &mut self,
        run: &RunContext,
        _decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.keep_prediction = run.keep_prediction;
        outputs.set_power(self.commodity, f64::from(self.observed_w));
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        outputs.set_power(self.commodity, f64::from(self.demand_at(tick.time)));
        Ok(0.0)
    }
}
