use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext, slot_count};
use crate::ea::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding};
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::sim::state::LimitedCommodityStateMap;

/// Fixed parameters of a home battery.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryParams {
    /// Usable capacity (Wh, > 0).
    pub capacity_wh: f64,
    /// Maximum charge power (W, positive).
    pub max_charge_w: f64,
    /// Maximum discharge power (W, positive).
    pub max_discharge_w: f64,
    /// Charging efficiency (0..1.0).
    pub eta_c: f64,
    /// Discharging efficiency (0..1.0).
    pub eta_d: f64,
    /// Length of one command slot (s).
    pub slot_secs: i64,
    /// Cervisia per kWh moved through the battery, for wear.
    pub cervisia_per_kwh: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            capacity_wh: 10_000.0,
            max_charge_w: 5000.0,
            max_discharge_w: 5000.0,
            eta_c: 0.95,
            eta_d: 0.95,
            slot_secs: 900,
            cervisia_per_kwh: 0.5,
        }
    }
}

/// Battery storage driven by one power command per slot.
///
/// Binary encoding spends two bits per slot: `01` charges at full power,
/// `10` discharges at full power, `00` and `11` idle. Real encoding spends
/// one setpoint per slot within `[-max_discharge_w, max_charge_w]`.
///
/// The state-of-charge update enforces power limits, SOC bounds and
/// efficiency losses.
///
/// # Power Flow Convention
/// - Positive power: charging (load)
/// - Negative power: discharging (generation)
#[derive(Debug, Clone)]
pub struct Battery {
    master: Arc<BatteryParams>,
    observed_soc: f64,
    soc: f64,
    reference_time: i64,
    setpoints: Vec<f64>,
}

impl Battery {
    /// # Panics
    ///
    /// Panics if capacity is zero/negative, SOC out of range, or efficiencies invalid.
    pub fn new(params: BatteryParams, soc: f64) -> Self {
        assert!(params.capacity_wh > 0.0);
        assert!((0.0..=1.0).contains(&soc));
        assert!(params.max_charge_w >= 0.0 && params.max_discharge_w >= 0.0);
        assert!(params.eta_c > 0.0 && params.eta_c <= 1.0);
        assert!(params.eta_d > 0.0 && params.eta_d <= 1.0);
        assert!(params.slot_secs > 0);
        Self {
            master: Arc::new(params),
            observed_soc: soc,
            soc,
            reference_time: 0,
            setpoints: Vec::new(),
        }
    }

    pub fn soc(&self) -> f64 {
        self.soc
    }

    fn slots(&self, reference_time: i64, encoding_horizon: i64) -> usize {
        slot_count(reference_time, encoding_horizon, self.master.slot_secs)
    }

    fn decode_setpoints(&self, decoded: &DecodedSolutionWrapper, slots: usize) -> Result<Vec<f64>, DeviceError> {
        let m = &self.master;
        let setpoints: Vec<f64> = match decoded {
            DecodedSolutionWrapper::Booleans(bits) => bits
                .chunks(2)
                .map(|pair| match pair {
                    [false, true] => m.max_charge_w,
                    [true, false] => -m.max_discharge_w,
                    _ => 0.0,
                })
                .collect(),
            DecodedSolutionWrapper::Reals(v) => v.iter().map(|p| p.clamp(-m.max_discharge_w, m.max_charge_w)).collect(),
            DecodedSolutionWrapper::Integers(v) => v
                .iter()
                .map(|p| (*p as f64).clamp(-m.max_discharge_w, m.max_charge_w))
                .collect(),
        };
        if setpoints.len() != slots {
            return Err(DeviceError::DecodedLength {
                expected: slots,
                found: setpoints.len(),
            });
        }
        Ok(setpoints)
    }

    /// Applies `setpoint_w` for `dt_hours`, returning the actual power.
    fn apply(&mut self, setpoint_w: f64, dt_hours: f64) -> f64 {
        let m = &self.master;
        // Enforce power limits
        let cmd_w = if setpoint_w >= 0.0 {
            setpoint_w.min(m.max_charge_w)
        } else {
            setpoint_w.max(-m.max_discharge_w)
        };

        if cmd_w > 0.0 {
            // Charging, limited by free capacity
            let max_wh_this_step = (1.0 - self.soc) * m.capacity_wh / m.eta_c;
            let actual_w = cmd_w.min((max_wh_this_step / dt_hours).max(0.0));
            self.soc = (self.soc + actual_w * dt_hours * m.eta_c / m.capacity_wh).clamp(0.0, 1.0);
            actual_w
        } else if cmd_w < 0.0 {
            // Discharging, limited by stored energy
            let max_wh_this_step = self.soc * m.capacity_wh * m.eta_d;
            let actual_abs_w = (-cmd_w).min((max_wh_this_step / dt_hours).max(0.0));
            self.soc = (self.soc - actual_abs_w * dt_hours / (m.capacity_wh * m.eta_d)).clamp(0.0, 1.0);
            -actual_abs_w
        } else {
            0.0
        }
    }
}

impl Capabilities for Battery {
    fn produces(&self) -> &[Commodity] {
        &[Commodity::ActivePower]
    }

    fn causes_scheduling(&self) -> bool {
        true
    }

    fn device_type(&self) -> &'static str {
        "Battery"
    }
}

impl InterdependentModel for Battery {
    fn variable_information(
        &self,
        encoding: VariableEncoding,
        reference_time: i64,
        encoding_horizon: i64,
    ) -> EncodedVariableInformation {
        let slots = self.slots(reference_time, encoding_horizon);
        match encoding {
            VariableEncoding::Binary => EncodedVariableInformation::binary(2 * slots),
            VariableEncoding::Real => EncodedVariableInformation::real(
                vec![(-self.master.max_discharge_w, self.master.max_charge_w); slots],
                false,
            ),
        }
    }

    fn initialize(
        &mut self,
        run: &RunContext,
        decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.soc = self.observed_soc;
        self.reference_time = run.reference_time;
        let slots = self.slots(run.reference_time, run.encoding_horizon);
        self.setpoints = match decoded {
            Some(d) => self.decode_setpoints(d, slots)?,
            None if slots == 0 => Vec::new(),
            None => return Err(DeviceError::MissingDecodedSolution),
        };
        outputs.set_power(Commodity::ActivePower, 0.0);
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let offset = tick.time - self.reference_time;
        let setpoint = if offset < 0 {
            0.0
        } else {
            let slot = (offset / self.master.slot_secs) as usize;
            self.setpoints.get(slot).copied().unwrap_or(0.0)
        };
        let dt_hours = tick.dt_hours();
        let actual = self.apply(setpoint, dt_hours);
        if !self.soc.is_finite() {
            return Err(DeviceError::NonFinite("battery state of charge"));
        }
        outputs.set_power(Commodity::ActivePower, actual.round());
        Ok(actual.abs() * dt_hours / 1000.0 * self.master.cervisia_per_kwh)
    }
}
