//! Rooftop PV with temporally correlated cloud variability (AR(1) process).

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

/// Minimum cloud multiplier (heavy overcast).
const MULTIPLIER_MIN: f64 = 0.2;
/// Maximum cloud multiplier (enhanced irradiance from cloud edges).
const MULTIPLIER_MAX: f64 = 1.2;

/// Fixed parameters of a PV array.
#[derive(Debug, Clone, PartialEq)]
pub struct PvParams {
    /// Output under ideal conditions (W).
    pub peak_w: f64,
    /// Sunrise, seconds after local midnight (inclusive).
    pub sunrise_secs: i64,
    /// Sunset, seconds after local midnight (exclusive).
    pub sunset_secs: i64,
    /// AR(1) correlation coefficient (0.0 = uncorrelated, 1.0 = fully persistent).
    pub alpha: f64,
    /// Standard deviation of the AR(1) innovation noise.
    pub cloud_noise_std: f64,
    /// Offset of local time from the epoch clock.
    pub utc_offset_secs: i64,
}

impl Default for PvParams {
    fn default() -> Self {
        Self {
            peak_w: 5000.0,
            sunrise_secs: 6 * 3600,
            sunset_secs: 20 * 3600,
            alpha: 0.9,
            cloud_noise_std: 0.2,
            utc_offset_secs: 0,
        }
    }
}

/// PV generator following a half-sine daylight curve.
///
/// A cloud multiplier evolves as
/// ```text
/// m(t) = alpha * m(t-1) + (1 - alpha) * (1 + epsilon(t))
/// ```
/// where `epsilon` is Gaussian noise, clamped to \[0.2, 1.2\]. The noise
/// comes from the run's random stream, so every evaluation of a run sees
/// the same weather.
///
/// # Power Flow Convention
/// Returns **negative** active power during daylight.
#[derive(Debug, Clone)]
pub struct Pv {
    master: Arc<PvParams>,
    observed_w: i32,
    keep_prediction: bool,
    multiplier: f64,
    stream: RandomStream,
    rng: StdRng,
}

impl Pv {
    /// # Panics
    ///
    /// Panics if sunrise is not before sunset or either lies outside the day.
    pub fn new(params: PvParams, observed_w: i32) -> Self {
        assert!(
            0 <= params.sunrise_secs && params.sunrise_secs < params.sunset_secs && params.sunset_secs <= 86_400,
            "sunrise_secs must be < sunset_secs and both within one day"
        );
        let params = PvParams {
            peak_w: params.peak_w.max(0.0),
            alpha: params.alpha.clamp(0.0, 1.0),
            cloud_noise_std: params.cloud_noise_std.max(0.0),
            ..params
        };
        let stream = RandomStream::new(0);
        Self {
            master: Arc::new(params),
            observed_w,
            keep_prediction: true,
            multiplier: 1.0,
            rng: stream.rng(),
            stream,
        }
    }

    /// Share of peak irradiance at `time`, 0 at night.
    pub fn daylight_frac(&self, time: i64) -> f64 {
        let sod = second_of_day(time, self.master.utc_offset_secs);
        let (rise, set) = (self.master.sunrise_secs, self.master.sunset_secs);
        if sod < rise || sod >= set {
            return 0.0;
        }
        let x = (sod - rise) as f64 / (set - rise) as f64;
        (std::f64::consts::PI * x).sin().max(0.0)
    }

    fn advance_multiplier(&mut self) -> f64 {
        let epsilon = gaussian_noise(&mut self.rng, self.master.cloud_noise_std);
        let alpha = self.master.alpha;
        self.multiplier = (alpha * self.multiplier + (1.0 - alpha) * (1.0 + epsilon)).clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
        self.multiplier
    }
}

impl Capabilities for Pv {
    fn produces(&self) -> &[Commodity] {
        &[Commodity::ActivePower]
    }

    fn device_type(&self) -> &'static str {
        "PV"
    }
}

impl InterdependentModel for Pv {
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
        self.multiplier = 1.0;
        self.rng = StdRng::seed_from_u64(self.stream.seed());
        outputs.set_power(Commodity::ActivePower, f64::from(self.observed_w.min(0)));
        Ok(())
    }

    /// The multiplier evolves every tick regardless of daylight, keeping
    /// the temporal correlation across nights.
    fn step(&mut self, tick: &TickContext<'_>, outputs: &mut LimitedCommodityStateMap) -> Result<f64, DeviceError> {
        let w = if self.keep_prediction {
            let m = self.advance_multiplier();
            -(self.master.peak_w * self.daylight_frac(tick.time) * m).max(0.0)
        } else {
            f64::from(self.observed_w.min(0))
        };
        outputs.set_power(Commodity::ActivePower, w.round());
        Ok(0.0)
    }
}
