use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{
    Capabilities, InterdependentModel, RunContext, TickContext, gaussian_noise, second_of_day,
};
use crate::ea::DecodedSolutionWrapper;
use crate::error::DeviceError;
use crate::profile::Commodity;
use crate::random::RandomStream;
use crate::sim::state::LimitedCommodityStateMap;

/// Fixed parameters of the uncontrolled household consumption.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseLoadParams {
    /// Baseline power consumption (W).
    pub base_w: f64,
    /// Amplitude of the sinusoidal daily variation (W).
    pub amp_w: f64,
    /// Phase offset of the daily sinusoid (rad).
    pub phase_rad: f64,
    /// Standard deviation of the Gaussian noise (W).
    pub noise_std_w: f64,
    /// Displacement power factor used to derive reactive power.
    pub power_factor: f64,
    pub utc_offset_secs: i64,
}

impl Default for BaseLoadParams {
    fn default() -> Self {
        Self {
            base_w: 400.0,
            amp_w: 200.0,
            phase_rad: -std::f64::consts::FRAC_PI_2,
            noise_std_w: 30.0,
            power_factor: 0.95,
            utc_offset_secs: 0,
        }
    }
}

/// Daily consumption pattern of everything not modelled separately.
///
/// Demand is a baseline plus a daily sinusoid plus Gaussian noise, never
/// negative. Reactive power follows from the power factor.
///
/// # Examples
///
/// ```
/// use hems_sched::devices::baseload::{BaseLoad, BaseLoadParams};
///
/// let load = BaseLoad::new(BaseLoadParams { noise_std_w: 0.0, ..BaseLoadParams::default() }, 350);
/// assert!(load.expected_w(12 * 3600) > load.expected_w(0));
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    master: Arc<BaseLoadParams>,
    observed_w: i32,
    keep_prediction: bool,
    stream: RandomStream,
    rng: StdRng,
}

impl BaseLoad {
    /// # Panics
    ///
    /// Panics if the power factor is outside (0, 1].
    pub fn new(params: BaseLoadParams, observed_w: i32) -> Self {
        assert!(params.power_factor > 0.0 && params.power_factor <= 1.0);
        let stream = RandomStream::new(0);
        Self {
            master: Arc::new(params),
            observed_w,
            keep_prediction: true,
            rng: stream.rng(),
            stream,
        }
    }

    /// Noise-free demand at `time` (W).
    pub fn expected_w(&self, time: i64) -> f64 {
        let day_pos = second_of_day(time, self.master.utc_offset_secs) as f64 / 86_400.0;
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.master.phase_rad;
        (self.master.base_w + self.master.amp_w * angle.sin()).max(0.0)
    }

    fn write(&self, active_w: f64, outputs: &mut LimitedCommodityStateMap) {
        let pf = self.master.power_factor;
        let reactive = active_w * (1.0 - pf * pf).sqrt() / pf;
        outputs.set_power(Commodity::ActivePower, active_w.round());
        outputs.set_power(Commodity::ReactivePower, reactive.round());
    }
}

impl Capabilities for BaseLoad {
    fn produces(&self) -> &[Commodity] {
        &[Commodity::ActivePower, Commodity::ReactivePower]
    }

    fn device_type(&self) -> &'static str {
        "BaseLoad"
    }
}

impl InterdependentModel for BaseLoad {
    fn reseed(&mut self, stream: &RandomStream) {
        self.stream = *stream;
    }

    fn initialize(
        &mut self,
        run: &RunContext,
        _decoded: Option<&DecodedSolutionWrapper>,
        outputs: &mut LimitedCommodityStateMap,
    ) -> Result<(), DeviceError> {
        self.keep_prediction = run.keep_prediction;
        self.rng = StdRng::seed_from_u64(self.stream.seed());
        self.write(f64::from(self.observed_w.max(0)), outputs);
        Ok(())
    }

    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let w = if self.keep_prediction {
            let noise = gaussian_noise(&mut self.rng, self.master.noise_std_w);
            (self.expected_w(tick.time) + noise).max(0.0)
        } else {
            f64::from(self.observed_w.max(0))
        };
        self.write(w, outputs);
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(keep_prediction: bool) -> RunContext {
        RunContext {
            reference_time: 0,
            encoding_horizon: 0,
            start_time: 0,
            step_size: 3600,
            keep_prediction,
        }
    }

    fn day(load: &mut BaseLoad, keep_prediction: bool) -> Vec<(f64, f64)> {
        let mut out = LimitedCommodityStateMap::new();
        load.initialize(&run(keep_prediction), None, &mut out).unwrap();
        (0..24)
            .map(|h| {
                let tick = TickContext {
                    time: h * 3600,
                    step_size: 3600,
                    inputs: None,
                    ancillary: None,
                };
                load.step(&tick, &mut out).unwrap();
                (out.power(Commodity::ActivePower), out.power(Commodity::ReactivePower))
            })
            .collect()
    }

    #[test]
    fn demand_is_never_negative() {
        let params = BaseLoadParams {
            base_w: 50.0,
            amp_w: 200.0,
            noise_std_w: 100.0,
            ..BaseLoadParams::default()
        };
        let mut load = BaseLoad::new(params, 0);
        load.reseed(&RandomStream::new(3));
        assert!(day(&mut load, true).iter().all(|(p, q)| *p >= 0.0 && *q >= 0.0));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut a = BaseLoad::new(BaseLoadParams::default(), 0);
        let mut b = BaseLoad::new(BaseLoadParams::default(), 0);
        a.reseed(&RandomStream::new(8));
        b.reseed(&RandomStream::new(8));
        assert_eq!(day(&mut a, true), day(&mut b, true));
    }

    #[test]
    fn unity_power_factor_has_no_reactive_power() {
        let params = BaseLoadParams {
            power_factor: 1.0,
            ..BaseLoadParams::default()
        };
        let mut load = BaseLoad::new(params, 0);
        assert!(day(&mut load, true).iter().all(|(_, q)| *q == 0.0));
    }

    #[test]
    fn persistence_holds_observed_value() {
        let mut load = BaseLoad::new(BaseLoadParams::default(), 321);
        assert!(day(&mut load, false).iter().all(|(p, _)| *p == 321.0));
    }
}
