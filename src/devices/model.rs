//! Closed set of device models known to the scheduler.

use crate::devices::appliance::Appliance;
use crate::devices::baseload::BaseLoad;
use crate::devices::battery::Battery;
use crate::devices::chp::Chp;
use crate::devices::gas_boiler::GasBoiler;
use crate::devices::hot_water_tank::HotWaterTank;
use crate::devices::pv::Pv;
use crate::devices::smart_heater::SmartHeater;
use crate::devices::thermal_demand::ThermalDemand;
use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext};
use crate::ea::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding};
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::random::RandomStream;
use crate::sim::state::LimitedCommodityStateMap;

/// Any device model, dispatched statically.
#[derive(Debug, Clone)]
pub enum DeviceModel {
    GasBoiler(GasBoiler),
    HotWaterTank(HotWaterTank),
    ThermalDemand(ThermalDemand),
    Pv(Pv),
    BaseLoad(BaseLoad),
    SmartHeater(SmartHeater),
    Appliance(Appliance),
    Battery(Battery),
    Chp(Chp),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            DeviceModel::GasBoiler($m) => $body,
            DeviceModel::HotWaterTank($m) => $body,
            DeviceModel::ThermalDemand($m) => $body,
            DeviceModel::Pv($m) => $body,
            DeviceModel::BaseLoad($m) => $body,
            DeviceModel::SmartHeater($m) => $body,
            DeviceModel::Appliance($m) => $body,
            DeviceModel::Battery($m) => $body,
            DeviceModel::Chp($m) => $body,
        }
    };
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(impl From<$variant> for DeviceModel {
            fn from(m: $variant) -> Self {
                DeviceModel::$variant(m)
            }
        })*
    };
}

impl_from!(GasBoiler, HotWaterTank, ThermalDemand, Pv, BaseLoad, SmartHeater, Appliance, Battery, Chp);

impl Capabilities for DeviceModel {
    fn produces(&self) -> &[Commodity] {
        dispatch!(self, m => m.produces())
    }

    fn consumes(&self) -> &[Commodity] {
        dispatch!(self, m => m.consumes())
    }

    fn needs_ancillary_state(&self) -> bool {
        dispatch!(self, m => m.needs_ancillary_state())
    }

    fn reacts_to_input_states(&self) -> bool {
        dispatch!(self, m => m.reacts_to_input_states())
    }

    fn causes_scheduling(&self) -> bool {
        dispatch!(self, m => m.causes_scheduling())
    }

    fn device_type(&self) -> &'static str {
        dispatch!(self, m => m.device_type())
    }
}

impl InterdependentModel for DeviceModel {
    fn variable_information(
        &self,
        encoding: VariableEncoding,
        reference_time: i64,
        encoding_horizon: i64,
    ) -> EncodedVariableInformation {
        dispatch!(self, m => m.variable_information(encoding, reference_time, encoding_horizon))
    }

    fn reseed(&mut self, stream: &RandomStream) {
        dispatch!(self, m => m.reseed(stream))
    }

    fn initialize(
        &mut self,
        run: &RunContext,
        decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        dispatch!(self, m => m.initialize(run, decoded, outputs))
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        dispatch!(self, m => m.step(tick, outputs))
    }
}
