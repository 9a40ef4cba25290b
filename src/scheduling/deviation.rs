//! Detects when a device drifts away from its published schedule.

use crate::profile::{Commodity, LoadProfile};

/// Tracks how long measured power has stayed away from the plan.
///
/// Observers feed every measurement through [`observe`](Self::observe) and
/// publish their next part with `with_forced_reschedule(true)` once it
/// returns `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationMonitor {
    commodity: Commodity,
    threshold_w: i32,
    min_duration_secs: i64,
    deviating_since: Option<i64>,
}

impl DeviationMonitor {
    pub fn new(commodity: Commodity, threshold_w: i32, min_duration_secs: i64) -> Self {
        Self {
            commodity,
            threshold_w: threshold_w.max(0),
            min_duration_secs: min_duration_secs.max(0),
            deviating_since: None,
        }
    }

    /// Compares `measured_w` at `time` with `planned`.
    ///
    /// Returns `true` while the deviation has exceeded the threshold for at
    /// least the minimum duration.
    pub fn observe(&mut self, planned: &LoadProfile, time: i64, measured_w: i32) -> bool {
        let expected = planned.value_at(self.commodity, time);
        let deviation = (i64::from(measured_w) - i64::from(expected)).abs();
        if deviation <= i64::from(self.threshold_w) {
            self.deviating_since = None;
            return false;
        }
        let since = *self.deviating_since.get_or_insert(time);
        time - since >= self.min_duration_secs
    }

    /// Forgets an ongoing deviation, e.g. after a new schedule arrived.
    pub fn reset(&mut self) {
        self.deviating_since = None;
    }
}
