//! Common types and traits for device models.

use std::fmt;

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::ea::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding};
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::random::RandomStream;
use crate::sim::power_balance::AncillaryMeterState;
use crate::sim::state::LimitedCommodityStateMap;

/// Stable identity of a physical device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run-wide settings a model sees at initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunContext {
    /// Time the part's variables are anchored to.
    pub reference_time: i64,
    /// End of the span the part's variables cover.
    pub encoding_horizon: i64,
    /// First simulated tick.
    pub start_time: i64,
    pub step_size: i64,
    /// When false, prediction-driven models hold their observed value.
    pub keep_prediction: bool,
}

impl RunContext {
    /// Tick length in hours.
    pub fn dt_hours(&self) -> f64 {
        self.step_size as f64 / 3600.0
    }
}

/// Per-tick view handed to [`InterdependentModel::step`].
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub time: i64,
    pub step_size: i64,
    /// Previous-tick outputs of the producers of the consumed commodities.
    pub inputs: Option<&'a LimitedCommodityStateMap>,
    /// Previous-tick household meter totals.
    pub ancillary: Option<&'a AncillaryMeterState>,
}

impl TickContext<'_> {
    pub fn dt_secs(&self) -> f64 {
        self.step_size as f64
    }

    pub fn dt_hours(&self) -> f64 {
        self.step_size as f64 / 3600.0
    }

    /// Temperature of `commodity` among the inputs, if anyone reports one.
    pub fn input_temperature(&self, commodity: Commodity) -> Option<f64> {
        self.inputs.and_then(|i| i.temperature(commodity))
    }
}

/// Static description of what a model exchanges with the household.
pub trait Capabilities {
    fn produces(&self) -> &[Commodity];

    fn consumes(&self) -> &[Commodity] {
        &[]
    }

    /// Whether the model reads the household meter totals.
    fn needs_ancillary_state(&self) -> bool {
        false
    }

    /// Whether the model reads the outputs of other devices.
    fn reacts_to_input_states(&self) -> bool {
        !self.consumes().is_empty()
    }

    /// Whether the model carries decision variables when schedulable.
    fn causes_scheduling(&self) -> bool {
        false
    }

    /// Human-readable type label, used in schedules and reports.
    fn device_type(&self) -> &'static str;
}

/// A device model stepped tick by tick by the co-simulation.
///
/// Implementations hold only the mutable "actual model"; parameters live
/// behind an `Arc` so forking a model is a cheap state copy.
pub trait InterdependentModel: Capabilities {
    /// Decision variables for a run anchored at `reference_time`.
    fn variable_information(
        &self,
        _encoding: VariableEncoding,
        _reference_time: i64,
        _encoding_horizon: i64,
    ) -> EncodedVariableInformation {
        EncodedVariableInformation::none()
    }

    /// Rewires stochastic state to `stream`.
    fn reseed(&mut self, _stream: &RandomStream) {}

    /// Resets run state and writes the initial outputs.
    fn initialize(
        &mut self,
        run: &RunContext,
        decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError>;

    /// Advances one tick, writing this tick's outputs into the cleared
    /// `outputs`. Returns the cervisia accrued in the tick.
    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError>;
}

/// Gaussian noise via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Seconds since local midnight.
pub fn second_of_day(time: i64, utc_offset_secs: i64) -> i64 {
    (time + utc_offset_secs).rem_euclid(86_400)
}

/// Number of `len`-second slots needed to cover `[from, to)`.
pub(crate) fn slot_count(from: i64, to: i64, len: i64) -> usize {
    if to <= from || len <= 0 {
        return 0;
    }
    ((to - from + len - 1) / len) as usize
}
