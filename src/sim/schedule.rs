//! Per-device schedules produced by an optimization run.

use serde::Serialize;

use crate::devices::DeviceId;
use crate::profile::LoadProfile;

/// Finalized plan for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub device_id: DeviceId,
    pub device_type: &'static str,
    /// Compressed load profile in absolute time.
    pub profile: LoadProfile,
    /// Device-internal cost accrued over the horizon.
    pub cervisia: f64,
    /// Set when the device failed and this is a placeholder.
    pub failed: bool,
}

impl Schedule {
    /// Zero schedule standing in for a device that failed.
    pub fn empty(device_id: DeviceId, device_type: &'static str) -> Self {
        Self {
            device_id,
            device_type,
            profile: LoadProfile::new(),
            cervisia: 0.0,
            failed: true,
        }
    }
}

/// Sum of all schedules, the household's planned meter profile.
pub fn aggregate(schedules: &[Schedule]) -> LoadProfile {
    schedules
        .iter()
        .fold(LoadProfile::new(), |acc, s| acc.merge(&s.profile, 0))
}
