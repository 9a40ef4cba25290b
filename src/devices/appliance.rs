//! Shiftable appliance (washing machine, dishwasher, dryer).

use std::sync::Arc;

use crate::devices::types::{Capabilities, InterdependentModel, RunContext, TickContext};
use crate::ea::encoding::{bits_for, bits_to_u64};
use crate::ea::{DecodedSolutionWrapper, EncodedVariableInformation, VariableEncoding};
use crate::error::DeviceError;
use crate::profile::{Commodity, LoadProfile};
use crate::sim::state::LimitedCommodityStateMap;

/// Fixed parameters of a shiftable appliance program.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceParams {
    /// Program load relative to its start, closed at its duration.
    pub program: LoadProfile,
    /// Earliest admissible start (absolute).
    pub earliest_start: i64,
    /// Latest admissible start (absolute).
    pub latest_start: i64,
    /// Granularity of start offsets (s).
    pub resolution_secs: i64,
    /// Cervisia per hour the start is delayed past `earliest_start`.
    pub cervisia_per_hour_delay: f64,
}

/// Appliance whose program start is the decision variable.
///
/// The start offset from the earliest start is encoded in
/// `bits_for(slots)` bits, or as one integral real under real encoding.
/// Decoded offsets wrap modulo the number of admissible starts.
#[derive(Debug, Clone)]
pub struct Appliance {
    master: Arc<ApplianceParams>,
    /// Observed start of a program already running.
    running_since: Option<i64>,
    start: Option<i64>,
    pending_cervisia: f64,
}

impl Appliance {
    /// # Panics
    ///
    /// Panics if the resolution is not positive or the start window inverted.
    pub fn new(params: ApplianceParams, running_since: Option<i64>) -> Self {
        assert!(params.resolution_secs > 0);
        assert!(params.earliest_start <= params.latest_start);
        Self {
            master: Arc::new(params),
            running_since,
            start: None,
            pending_cervisia: 0.0,
        }
    }

    /// Program start chosen for the current run.
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    fn program_duration(&self) -> i64 {
        self.master.program.end_time().unwrap_or(0)
    }

    /// First admissible start and the number of further start slots.
    fn window(&self, reference_time: i64, encoding_horizon: i64) -> (i64, u64) {
        let m = &self.master;
        let earliest = m.earliest_start.max(reference_time);
        let latest = m.latest_start.min(encoding_horizon);
        if latest <= earliest {
            return (earliest, 0);
        }
        (earliest, ((latest - earliest) / m.resolution_secs) as u64)
    }

    fn decode_offset(&self, decoded: Option<&DecodedSolutionWrapper>, slots: u64) -> Result<u64, DeviceError> {
        let d = decoded.ok_or(DeviceError::MissingDecodedSolution)?;
        if d.is_empty() {
            return Err(DeviceError::DecodedLength { expected: 1, found: 0 });
        }
        let raw = match d {
            DecodedSolutionWrapper::Booleans(bits) => bits_to_u64(bits),
            DecodedSolutionWrapper::Integers(v) => v.first().copied().map_or(0, |x| x.max(0) as u64),
            DecodedSolutionWrapper::Reals(v) => v.first().copied().map_or(0, |x| x.round().max(0.0) as u64),
        };
        Ok(raw % (slots + 1))
    }
}

impl Capabilities for Appliance {
    fn produces(&self) -> &[Commodity] {
        &[Commodity::ActivePower]
    }

    fn causes_scheduling(&self) -> bool {
        self.running_since.is_none()
    }

    fn device_type(&self) -> &'static str {
        "Appliance"
    }
}

impl InterdependentModel for Appliance {
    fn variable_information(
        &self,
        encoding: VariableEncoding,
        reference_time: i64,
        encoding_horizon: i64,
    ) -> EncodedVariableInformation {
        if self.running_since.is_some() {
            return EncodedVariableInformation::none();
        }
        let (_, slots) = self.window(reference_time, encoding_horizon);
        if slots == 0 {
            return EncodedVariableInformation::none();
        }
        match encoding {
            VariableEncoding::Binary => EncodedVariableInformation::binary(bits_for(slots)),
            VariableEncoding::Real => EncodedVariableInformation::real(vec![(0.0, slots as f64)], true),
        }
    }

    fn initialize(
        &mut self,
        run: &RunContext,
        decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.pending_cervisia = 0.0;
        self.start = match self.running_since {
            Some(since) => Some(since),
            None => {
                let (earliest, slots) = self.window(run.reference_time, run.encoding_horizon);
                let offset = if slots == 0 { 0 } else { self.decode_offset(decoded, slots)? };
                let start = earliest + offset as i64 * self.master.resolution_secs;
                let delay_h = (start - self.master.earliest_start).max(0) as f64 / 3600.0;
                self.pending_cervisia = delay_h * self.master.cervisia_per_hour_delay;
                Some(start)
            }
        };
        let p = self.start.map_or(0, |s| self.master.program.value_at(Commodity::ActivePower, run.start_time - s));
        outputs.set_power(Commodity::ActivePower, f64::from(p));
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let p = match self.start {
            Some(s) if tick.time >= s && tick.time < s + self.program_duration() => {
                self.master.program.value_at(Commodity::ActivePower, tick.time - s)
            }
            _ => 0,
        };
        outputs.set_power(Commodity::ActivePower, f64::from(p));
        Ok(std::mem::take(&mut self.pending_cervisia))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> LoadProfile {
        let mut p = LoadProfile::new();
        p.set_load(Commodity::ActivePower, 0, 2000);
        p.set_load(Commodity::ActivePower, 1800, 500);
        p.close(3600);
        p
    }

    fn washer() -> Appliance {
        Appliance::new(
            ApplianceParams {
                program: program(),
                earliest_start: 0,
                latest_start: 4 * 3600,
                resolution_secs: 3600,
                cervisia_per_hour_delay: 1.0,
            },
            None,
        )
    }

    fn run() -> RunContext {
        RunContext {
            reference_time: 0,
            encoding_horizon: 24 * 3600,
            start_time: 0,
            step_size: 900,
            keep_prediction: true,
        }
    }

    fn trace(a: &mut Appliance, decoded: &DecodedSolutionWrapper) -> (Vec<f64>, f64) {
        let mut out = LimitedCommodityStateMap::new();
        a.initialize(&run(), Some(decoded), &mut out).unwrap();
        let mut cervisia = 0.0;
        let powers = (0..32)
            .map(|i| {
                let tick = TickContext {
                    time: i * 900,
                    step_size: 900,
                    inputs: None,
                    ancillary: None,
                };
                cervisia += a.step(&tick, &mut out).unwrap();
                out.power(Commodity::ActivePower)
            })
            .collect();
        (powers, cervisia)
    }

    #[test]
    fn declares_bits_for_start_window() {
        let a = washer();
        // Starts at 0..=4 h: five values need three bits.
        let info = a.variable_information(VariableEncoding::Binary, 0, 24 * 3600);
        assert_eq!(info.len(), 3);
        let info = a.variable_information(VariableEncoding::Real, 0, 24 * 3600);
        assert_eq!(info.bounds(), &[(0.0, 4.0)]);
        assert!(info.is_integral());
    }

    #[test]
    fn running_program_needs_no_variables() {
        let a = Appliance::new(washer().master.as_ref().clone(), Some(0));
        assert!(a.variable_information(VariableEncoding::Binary, 0, 86_400).needs_no_variables());
        assert!(!a.causes_scheduling());
    }

    #[test]
    fn decoded_offset_shifts_program() {
        let mut a = washer();
        let (p, cervisia) = trace(&mut a, &DecodedSolutionWrapper::Booleans(vec![false, true, false]));
        assert_eq!(a.start(), Some(2 * 3600));
        assert_eq!(p[7], 0.0);
        assert_eq!(p[8], 2000.0);
        assert_eq!(p[10], 500.0);
        assert_eq!(p[12], 0.0);
        assert!((cervisia - 2.0).abs() < 1e-9);
    }

    #[test]
    fn offsets_wrap_into_window() {
        let mut a = washer();
        // 7 mod 5 = 2
        trace(&mut a, &DecodedSolutionWrapper::Booleans(vec![true, true, true]));
        assert_eq!(a.start(), Some(2 * 3600));
    }

    #[test]
    fn missing_decoded_solution_fails() {
        let mut a = washer();
        let mut out = LimitedCommodityStateMap::new();
        assert_eq!(
            a.initialize(&run(), None, &mut out),
            Err(DeviceError::MissingDecodedSolution)
        );
    }

    #[test]
    fn window_closed_by_reference_time() {
        let a = washer();
        assert!(a.variable_information(VariableEncoding::Binary, 5 * 3600, 86_400).needs_no_variables());
    }
}
