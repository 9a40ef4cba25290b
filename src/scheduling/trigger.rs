//! When to start the next optimization run.

use std::fmt;

use serde::Serialize;

/// Why a run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// No run has happened yet.
    Initial,
    /// The reschedule interval elapsed.
    Interval,
    /// A published part asked for it.
    Forced,
    /// Explicit request by the caller.
    Manual,
    /// Arrived while another run was in flight.
    Queued,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerReason::Initial => "initial",
            TriggerReason::Interval => "interval",
            TriggerReason::Forced => "forced",
            TriggerReason::Manual => "manual",
            TriggerReason::Queued => "queued",
        };
        f.write_str(s)
    }
}

/// Interval trigger remembering the last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescheduleTrigger {
    interval_secs: i64,
    last_run: Option<i64>,
}

impl RescheduleTrigger {
    pub fn new(interval_secs: i64) -> Self {
        Self {
            interval_secs: interval_secs.max(1),
            last_run: None,
        }
    }

    pub fn last_run(&self) -> Option<i64> {
        self.last_run
    }

    /// Reason to run at `now`, if any. A forced request wins over the
    /// interval; the very first check always fires.
    pub fn due(&self, now: i64, forced: bool) -> Option<TriggerReason> {
        match self.last_run {
            None => Some(TriggerReason::Initial),
            Some(_) if forced => Some(TriggerReason::Forced),
            Some(last) if now - last >= self.interval_secs => Some(TriggerReason::Interval),
            Some(_) => None,
        }
    }

    pub fn mark_run(&mut self, now: i64) {
        self.last_run = Some(now);
    }
}
