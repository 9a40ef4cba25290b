//! Post-hoc KPI computation from a run's schedules.

use std::fmt;

use serde::Serialize;

use crate::profile::Commodity;
use crate::sim::schedule::{Schedule, aggregate};

/// Household-level indicators of one published schedule set.
///
/// Computed from the aggregated schedules over `[from, to)` so the report
/// always agrees with what was published.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HouseholdKpi {
    /// Peak grid import (W, positive).
    pub peak_import_w: i32,
    /// Peak grid export (W, positive magnitude).
    pub peak_export_w: i32,
    /// Electrical energy drawn from the grid (kWh).
    pub imported_kwh: f64,
    /// Electrical energy fed into the grid (kWh).
    pub exported_kwh: f64,
    /// Gas energy drawn (kWh).
    pub gas_kwh: f64,
    /// Summed device cervisia.
    pub total_cervisia: f64,
    /// Devices that published an empty schedule.
    pub failed_devices: usize,
}

impl HouseholdKpi {
    /// Computes all KPIs over `[from, to)`.
    ///
    /// # Arguments
    ///
    /// * `schedules` - Published schedules of one run
    /// * `from` - Start of the reporting window (s)
    /// * `to` - End of the reporting window (s, exclusive)
    pub fn from_schedules(schedules: &[Schedule], from: i64, to: i64) -> Self {
        if schedules.is_empty() || to <= from {
            return Self::default();
        }
        let total = aggregate(schedules);
        let (hi, lo) = total.extremes(Commodity::ActivePower, from, to);
        let (imported_wh, exported_wh) = total.energy_wh(Commodity::ActivePower, from, to);
        let (gas_wh, _) = total.energy_wh(Commodity::NaturalGasPower, from, to);

        Self {
            peak_import_w: hi.max(0),
            peak_export_w: lo.min(0).saturating_neg(),
            imported_kwh: imported_wh / 1000.0,
            exported_kwh: exported_wh / 1000.0,
            gas_kwh: gas_wh / 1000.0,
            total_cervisia: schedules.iter().map(|s| s.cervisia).sum(),
            failed_devices: schedules.iter().filter(|s| s.failed).count(),
        }
    }
}

impl fmt::Display for HouseholdKpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Peak import:           {:.2} kW", f64::from(self.peak_import_w) / 1000.0)?;
        writeln!(f, "Peak export:           {:.2} kW", f64::from(self.peak_export_w) / 1000.0)?;
        writeln!(f, "Grid import:           {:.2} kWh", self.imported_kwh)?;
        writeln!(f, "Grid export:           {:.2} kWh", self.exported_kwh)?;
        writeln!(f, "Gas:                   {:.2} kWh", self.gas_kwh)?;
        writeln!(f, "Cervisia:              {:.2}", self.total_cervisia)?;
        write!(f, "Failed devices:        {}", self.failed_devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceId;
    use crate::profile::LoadProfile;

    fn schedule(id: &str, entries: &[(Commodity, i64, i32)], cervisia: f64) -> Schedule {
        let mut profile = LoadProfile::new();
        for &(c, t, v) in entries {
            profile.set_load(c, t, v);
        }
        profile.close(3600);
        Schedule {
            device_id: DeviceId::new(id),
            device_type: "Test",
            profile,
            cervisia,
            failed: false,
        }
    }

    #[test]
    fn peak_import_and_export() {
        let load = schedule("load", &[(Commodity::ActivePower, 0, 3000)], 0.0);
        let pv = schedule("pv", &[(Commodity::ActivePower, 1800, -5000)], 0.0);
        let kpi = HouseholdKpi::from_schedules(&[load, pv], 0, 3600);
        assert_eq!(kpi.peak_import_w, 3000);
        assert_eq!(kpi.peak_export_w, 2000);
        // 3 kW for half an hour in, 2 kW for half an hour out.
        assert!((kpi.imported_kwh - 1.5).abs() < 1e-9);
        assert!((kpi.exported_kwh - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gas_and_cervisia() {
        let boiler = schedule(
            "boiler",
            &[(Commodity::NaturalGasPower, 0, 16_000), (Commodity::HeatingHotWaterPower, 0, -15_000)],
            2.5,
        );
        let mut failed = Schedule::empty(DeviceId::new("bat"), "Battery");
        failed.cervisia = 0.5;
        let kpi = HouseholdKpi::from_schedules(&[boiler, failed], 0, 3600);
        assert!((kpi.gas_kwh - 16.0).abs() < 1e-9);
        assert_eq!(kpi.peak_import_w, 0);
        assert_eq!(kpi.total_cervisia, 3.0);
        assert_eq!(kpi.failed_devices, 1);
    }

    #[test]
    fn empty_results() {
        let kpi = HouseholdKpi::from_schedules(&[], 0, 3600);
        assert_eq!(kpi, HouseholdKpi::default());
    }
}
