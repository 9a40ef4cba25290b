//! Forecasting utilities for prediction-driven devices.

use crate::profile::{Commodity, LoadProfile};

const DAY_SECS: i64 = 86_400;

/// Naive "tomorrow is today" forecaster.
///
/// Repeats a one-day profile (relative to local midnight) over any
/// absolute time span.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveForecast {
    /// Offset of local time from the epoch clock (s).
    pub utc_offset_secs: i64,
}

impl NaiveForecast {
    pub fn new(utc_offset_secs: i64) -> Self {
        Self { utc_offset_secs }
    }

    /// Produce a forecast covering `[from, to)` in absolute time.
    ///
    /// # Arguments
    ///
    /// * `day` - One-day template starting at local midnight; closed at one
    ///   day if it is not closed already
    /// * `from` - Start of the forecast (s since epoch)
    /// * `to` - End of the forecast (s since epoch, exclusive)
    ///
    /// # Returns
    ///
    /// A profile closed at `to`, empty when the span or the template is.
    pub fn forecast(&self, day: &LoadProfile, from: i64, to: i64) -> LoadProfile {
        if to <= from || day.is_empty() {
            return LoadProfile::new();
        }
        let mut template = day.clone();
        if template.end_time().is_none() {
            template.close(DAY_SECS);
        }

        let local_from = from + self.utc_offset_secs;
        let local_to = to + self.utc_offset_secs;
        let first_day = local_from.div_euclid(DAY_SECS);
        let last_day = (local_to - 1).div_euclid(DAY_SECS);

        let mut out = LoadProfile::new();
        for d in first_day..=last_day {
            out = out.merge(&template, d * DAY_SECS - self.utc_offset_secs);
        }
        out.close(to);
        out
    }
}

/// Builds a one-day profile from equally long slots starting at midnight.
///
/// `values_w` must divide the day evenly; 24 values give hourly steps.
pub fn daily_profile(commodity: Commodity, values_w: &[i32]) -> LoadProfile {
    let mut profile = LoadProfile::new();
    if values_w.is_empty() {
        return profile;
    }
    let slot = DAY_SECS / values_w.len() as i64;
    for (i, value) in values_w.iter().enumerate() {
        profile.set_load(commodity, i as i64 * slot, *value);
    }
    profile.close(DAY_SECS);
    profile
}
