//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ea::{AlgorithmParameters, StoppingRule, StoppingRules, VariableEncoding};
use crate::profile::{Commodity, CompressionType, LoadProfileCompression};
use crate::sim::FitnessWeights;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Evolutionary algorithm operators and population.
    pub optimization: AlgorithmParameters,
    /// Termination criteria of every run.
    pub stopping: StoppingConfig,
    /// Time grid, triggers and seeding.
    pub scheduling: SchedulingConfig,
    /// Compression of published schedules.
    pub compression: CompressionConfig,
    /// Objective weights.
    pub fitness: FitnessWeights,
    /// Energy tariffs.
    pub prices: PriceConfig,
    /// Grid connection limits.
    pub limits: LimitConfig,
    /// Demo device set.
    pub household: HouseholdConfig,
}

/// Termination criteria, combined with "first one firing wins".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoppingConfig {
    pub rules: Vec<StoppingRule>,
}

impl Default for StoppingConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                StoppingRule::MaxEvaluations { max_evaluations: 2000 },
                StoppingRule::FitnessImprovement {
                    generations: 10,
                    min_improvement_percent: 0.1,
                },
            ],
        }
    }
}

/// Time grid, triggers and seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulingConfig {
    /// Chromosome representation.
    pub encoding: VariableEncoding,
    /// Master random seed.
    pub seed: u64,
    /// Co-simulation tick (s, > 0).
    pub step_size_secs: i64,
    /// Optimization horizon from the trigger time (s, > 0).
    pub horizon_secs: i64,
    /// Reschedule at least this often (s, > 0).
    pub reschedule_interval_secs: i64,
    /// Off makes prediction-driven devices hold their observed value.
    pub keep_prediction: bool,
    /// Offset of local time from the epoch clock (s).
    pub utc_offset_secs: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            encoding: VariableEncoding::Binary,
            seed: 42,
            step_size_secs: 60,
            horizon_secs: 86_400,
            reschedule_interval_secs: 3_600,
            keep_prediction: true,
            utc_offset_secs: 0,
        }
    }
}

/// Compression of published schedules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Policy for every commodity without an override.
    pub default: LoadProfileCompression,
    /// Overrides keyed by upper-case commodity name, e.g. `ACTIVEPOWER`.
    pub commodities: BTreeMap<String, LoadProfileCompression>,
}

impl CompressionConfig {
    /// Overrides with known commodity names; unknown names are skipped
    /// (and reported by [`ScenarioConfig::validate`]).
    pub fn overrides(&self) -> impl Iterator<Item = (Commodity, LoadProfileCompression)> + '_ {
        self.commodities
            .iter()
            .filter_map(|(name, c)| Commodity::from_name(name).map(|commodity| (commodity, *c)))
    }
}

/// Energy tariffs in cents per kWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceConfig {
    pub electricity_import_per_kwh: f64,
    pub electricity_export_per_kwh: f64,
    pub gas_per_kwh: f64,
    /// Import price inside the daily peak window; none disables it.
    pub peak_import_per_kwh: Option<f64>,
    /// Local hour the peak window opens (0-23).
    pub peak_start_hour: u32,
    /// Local hour the peak window closes (1-24, exclusive).
    pub peak_end_hour: u32,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            electricity_import_per_kwh: 30.0,
            electricity_export_per_kwh: 8.0,
            gas_per_kwh: 10.0,
            peak_import_per_kwh: Some(40.0),
            peak_start_hour: 17,
            peak_end_hour: 21,
        }
    }
}

/// Active power limits at the grid connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitConfig {
    /// Maximum import (W, ≥ 0).
    pub max_import_w: f64,
    /// Maximum export (W, positive magnitude).
    pub max_export_w: f64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_import_w: 14_000.0,
            max_export_w: 7_000.0,
        }
    }
}

/// Demo device set of one household.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HouseholdConfig {
    pub baseload: BaseloadConfig,
    pub pv: PvConfig,
    pub battery: BatteryConfig,
    pub appliance: ApplianceConfig,
    pub hot_water: HotWaterConfig,
    pub gas_boiler: GasBoilerConfig,
    pub chp: ChpConfig,
    pub smart_heater: SmartHeaterConfig,
}

impl HouseholdConfig {
    fn any_enabled(&self) -> bool {
        self.baseload.enabled
            || self.pv.enabled
            || self.battery.enabled
            || self.appliance.enabled
            || self.hot_water.enabled
            || self.gas_boiler.enabled
            || self.chp.enabled
            || self.smart_heater.enabled
    }
}

/// Baseload device parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseloadConfig {
    pub enabled: bool,
    /// Baseline consumption (kW).
    pub base_kw: f64,
    /// Sinusoidal amplitude (kW).
    pub amp_kw: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation (kW).
    pub noise_std_kw: f64,
    /// Displacement power factor (0..=1).
    pub power_factor: f64,
    /// Last metered consumption (kW).
    pub observed_kw: f64,
}

impl Default for BaseloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_kw: 0.4,
            amp_kw: 0.2,
            phase_rad: -std::f64::consts::FRAC_PI_2,
            noise_std_kw: 0.03,
            power_factor: 0.95,
            observed_kw: 0.4,
        }
    }
}

/// Solar PV device parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    pub enabled: bool,
    /// Peak generation (kW).
    pub kw_peak: f64,
    /// Local sunrise hour (inclusive).
    pub sunrise_hour: f64,
    /// Local sunset hour (exclusive).
    pub sunset_hour: f64,
    /// AR(1) correlation coefficient (0.0-1.0).
    pub alpha: f64,
    /// AR(1) innovation noise standard deviation.
    pub cloud_noise_std: f64,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kw_peak: 5.0,
            sunrise_hour: 6.0,
            sunset_hour: 20.0,
            alpha: 0.9,
            cloud_noise_std: 0.2,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub enabled: bool,
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Charge efficiency (0.0–1.0).
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0).
    pub eta_discharge: f64,
    /// Length of one command slot (minutes).
    pub slot_minutes: i64,
    /// Wear cost per kWh of throughput.
    pub cervisia_per_kwh: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity_kwh: 10.0,
            initial_soc: 0.5,
            max_charge_kw: 5.0,
            max_discharge_kw: 5.0,
            eta_charge: 0.95,
            eta_discharge: 0.95,
            slot_minutes: 15,
            cervisia_per_kwh: 0.5,
        }
    }
}

/// One shiftable appliance program per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplianceConfig {
    pub enabled: bool,
    /// Program power (kW).
    pub power_kw: f64,
    /// Program duration (minutes, > 0).
    pub duration_minutes: i64,
    /// Earliest local start hour.
    pub earliest_start_hour: f64,
    /// Latest local start hour.
    pub latest_start_hour: f64,
    /// Granularity of start offsets (minutes, > 0).
    pub resolution_minutes: i64,
    /// Discomfort per hour of delay past the earliest start.
    pub cervisia_per_hour_delay: f64,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            power_kw: 2.0,
            duration_minutes: 120,
            earliest_start_hour: 8.0,
            latest_start_hour: 18.0,
            resolution_minutes: 15,
            cervisia_per_hour_delay: 0.5,
        }
    }
}

/// Hot water tank and the heat demand it serves.
///
/// Loss and comfort constants are rough household values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HotWaterConfig {
    pub enabled: bool,
    pub volume_l: f64,
    /// Tank temperature at the trigger time (°C).
    pub initial_temperature: f64,
    pub ambient_temperature: f64,
    /// Standing loss (W/K above ambient).
    pub loss_w_per_k: f64,
    /// Comfort floor (°C).
    pub min_comfort_temperature: f64,
    pub cervisia_per_kelvin_hour: f64,
    /// Predicted heat draw per local hour (kW); repeats every day.
    pub demand_hourly_kw: Vec<f64>,
}

impl Default for HotWaterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume_l: 750.0,
            initial_temperature: 65.0,
            ambient_temperature: 20.0,
            loss_w_per_k: 3.0,
            min_comfort_temperature: 50.0,
            cervisia_per_kelvin_hour: 1.0,
            demand_hourly_kw: vec![
                0.5, 0.5, 0.5, 0.5, 0.8, 1.5, 3.0, 4.0, 3.0, 2.0, 1.5, 1.5, //
                1.5, 1.5, 1.5, 1.5, 2.0, 3.0, 4.0, 3.5, 2.5, 1.5, 1.0, 0.5,
            ],
        }
    }
}

/// Gas boiler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GasBoilerConfig {
    pub enabled: bool,
    /// Switch on below (°C).
    pub min_temperature: f64,
    /// Switch off above (°C).
    pub max_temperature: f64,
    /// Heat output (kW).
    pub heat_kw: f64,
    /// Gas input (kW).
    pub gas_kw: f64,
    pub cervisia_per_start: f64,
}

impl Default for GasBoilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_temperature: 60.0,
            max_temperature: 80.0,
            heat_kw: 15.0,
            gas_kw: 16.7,
            cervisia_per_start: 0.0,
        }
    }
}

/// Micro CHP parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChpConfig {
    pub enabled: bool,
    /// Electrical output (kW).
    pub active_kw: f64,
    /// Heat output (kW).
    pub thermal_kw: f64,
    /// Gas input (kW).
    pub gas_kw: f64,
    /// Forced on below (°C).
    pub min_temperature: f64,
    /// Forced off above (°C).
    pub max_temperature: f64,
    /// Length of one run-request slot (minutes).
    pub slot_minutes: i64,
    pub cervisia_per_start: f64,
}

impl Default for ChpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            active_kw: 5.5,
            thermal_kw: 12.5,
            gas_kw: 20.5,
            min_temperature: 55.0,
            max_temperature: 80.0,
            slot_minutes: 15,
            cervisia_per_start: 5.0,
        }
    }
}

/// Staged electric heater fed by PV surplus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmartHeaterConfig {
    pub enabled: bool,
    /// Power of one stage (kW).
    pub stage_kw: f64,
    pub stages: u32,
    /// Stops heating at or above (°C).
    pub max_temperature: f64,
}

impl Default for SmartHeaterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stage_kw: 0.5,
            stages: 7,
            max_temperature: 80.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"scheduling.step_size_secs"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: PV, battery, appliance and a gas
    /// boiler heating the hot water tank.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the CHP preset: a micro CHP covers heat, the boiler only
    /// backs it up.
    pub fn chp() -> Self {
        Self {
            household: HouseholdConfig {
                gas_boiler: GasBoilerConfig {
                    min_temperature: 50.0,
                    max_temperature: 65.0,
                    ..GasBoilerConfig::default()
                },
                chp: ChpConfig {
                    enabled: true,
                    ..ChpConfig::default()
                },
                ..HouseholdConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the all-electric preset: no gas, a larger PV array and a
    /// smart heater turning surplus into heat.
    pub fn all_electric() -> Self {
        Self {
            prices: PriceConfig {
                gas_per_kwh: 0.0,
                ..PriceConfig::default()
            },
            household: HouseholdConfig {
                pv: PvConfig {
                    kw_peak: 9.0,
                    ..PvConfig::default()
                },
                gas_boiler: GasBoilerConfig {
                    enabled: false,
                    ..GasBoilerConfig::default()
                },
                smart_heater: SmartHeaterConfig {
                    enabled: true,
                    ..SmartHeaterConfig::default()
                },
                ..HouseholdConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "chp", "all_electric"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "chp" => Ok(Self::chp()),
            "all_electric" => Ok(Self::all_electric()),
            _ => Err(ConfigError::new(
                "preset",
                format!("unknown preset \"{name}\", available: {}", Self::PRESETS.join(", ")),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.optimization.validate() {
            errors.push(ConfigError::new("optimization", e.to_string()));
        }
        if let Err(e) = StoppingRules::new(self.stopping.rules.clone()) {
            errors.push(ConfigError::new("stopping.rules", e.to_string()));
        }

        let s = &self.scheduling;
        for (field, value) in [
            ("scheduling.step_size_secs", s.step_size_secs),
            ("scheduling.horizon_secs", s.horizon_secs),
            ("scheduling.reschedule_interval_secs", s.reschedule_interval_secs),
        ] {
            if value <= 0 {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        }

        check_compression(&mut errors, "compression.default", &self.compression.default);
        for (name, c) in &self.compression.commodities {
            let field = format!("compression.commodities.{name}");
            if Commodity::from_name(name).is_none() {
                errors.push(ConfigError::new(field, "unknown commodity"));
            } else {
                check_compression(&mut errors, &field, c);
            }
        }

        let w = &self.fitness;
        for (field, value) in [
            ("fitness.energy_cost", w.energy_cost),
            ("fitness.limit_violation", w.limit_violation),
            ("fitness.cervisia", w.cervisia),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(field, "must be a non-negative number"));
            }
        }

        let p = &self.prices;
        if p.peak_import_per_kwh.is_some() && !(p.peak_start_hour < p.peak_end_hour && p.peak_end_hour <= 24) {
            errors.push(ConfigError::new(
                "prices.peak_start_hour",
                "must be < prices.peak_end_hour, which must be <= 24",
            ));
        }

        let l = &self.limits;
        if l.max_import_w < 0.0 {
            errors.push(ConfigError::new("limits.max_import_w", "must be >= 0"));
        }
        if l.max_export_w < 0.0 {
            errors.push(ConfigError::new("limits.max_export_w", "must be >= 0"));
        }

        self.validate_household(&mut errors);
        errors
    }

    fn validate_household(&self, errors: &mut Vec<ConfigError>) {
        let h = &self.household;
        if !h.any_enabled() {
            errors.push(ConfigError::new("household", "at least one device must be enabled"));
        }

        if h.baseload.enabled && !(h.baseload.power_factor > 0.0 && h.baseload.power_factor <= 1.0) {
            errors.push(ConfigError::new("household.baseload.power_factor", "must be in (0.0, 1.0]"));
        }

        let pv = &h.pv;
        if pv.enabled && !(0.0 <= pv.sunrise_hour && pv.sunrise_hour < pv.sunset_hour && pv.sunset_hour <= 24.0) {
            errors.push(ConfigError::new(
                "household.pv.sunrise_hour",
                "must be < household.pv.sunset_hour, both within [0, 24]",
            ));
        }

        let bat = &h.battery;
        if bat.enabled {
            if !(bat.capacity_kwh > 0.0) {
                errors.push(ConfigError::new("household.battery.capacity_kwh", "must be > 0"));
            }
            if !(0.0..=1.0).contains(&bat.initial_soc) {
                errors.push(ConfigError::new("household.battery.initial_soc", "must be in [0.0, 1.0]"));
            }
            check_non_negative(errors, "household.battery.max_charge_kw", bat.max_charge_kw);
            check_non_negative(errors, "household.battery.max_discharge_kw", bat.max_discharge_kw);
            for (field, eta) in [
                ("household.battery.eta_charge", bat.eta_charge),
                ("household.battery.eta_discharge", bat.eta_discharge),
            ] {
                if !(eta > 0.0 && eta <= 1.0) {
                    errors.push(ConfigError::new(field, "must be in (0.0, 1.0]"));
                }
            }
            if bat.slot_minutes <= 0 {
                errors.push(ConfigError::new("household.battery.slot_minutes", "must be > 0"));
            }
        }

        let app = &h.appliance;
        if app.enabled {
            if app.duration_minutes <= 0 {
                errors.push(ConfigError::new("household.appliance.duration_minutes", "must be > 0"));
            }
            if app.resolution_minutes <= 0 {
                errors.push(ConfigError::new("household.appliance.resolution_minutes", "must be > 0"));
            }
            if !(app.earliest_start_hour <= app.latest_start_hour) {
                errors.push(ConfigError::new(
                    "household.appliance.earliest_start_hour",
                    "must be <= household.appliance.latest_start_hour",
                ));
            }
        }

        let hw = &h.hot_water;
        if hw.enabled {
            if !(hw.volume_l > 0.0) {
                errors.push(ConfigError::new("household.hot_water.volume_l", "must be > 0"));
            }
            check_non_negative(errors, "household.hot_water.loss_w_per_k", hw.loss_w_per_k);
            for (field, temperature) in [
                ("household.hot_water.initial_temperature", hw.initial_temperature),
                ("household.hot_water.ambient_temperature", hw.ambient_temperature),
                ("household.hot_water.min_comfort_temperature", hw.min_comfort_temperature),
            ] {
                check_finite(errors, field, temperature);
            }
            if hw.demand_hourly_kw.is_empty() || 86_400 % hw.demand_hourly_kw.len() != 0 {
                errors.push(ConfigError::new(
                    "household.hot_water.demand_hourly_kw",
                    "must hold a number of values dividing the day evenly (e.g. 24)",
                ));
            }
        }
        let heaters = h.gas_boiler.enabled || h.chp.enabled || h.smart_heater.enabled;
        if heaters && !hw.enabled {
            errors.push(ConfigError::new(
                "household.hot_water.enabled",
                "heat generators need the hot water tank",
            ));
        }

        let boiler = &h.gas_boiler;
        if boiler.enabled {
            if !(boiler.min_temperature < boiler.max_temperature) {
                errors.push(ConfigError::new(
                    "household.gas_boiler.min_temperature",
                    "must be < household.gas_boiler.max_temperature",
                ));
            }
            check_non_negative(errors, "household.gas_boiler.heat_kw", boiler.heat_kw);
            check_non_negative(errors, "household.gas_boiler.gas_kw", boiler.gas_kw);
        }
        let chp = &h.chp;
        if chp.enabled {
            if !(chp.min_temperature < chp.max_temperature) {
                errors.push(ConfigError::new(
                    "household.chp.min_temperature",
                    "must be < household.chp.max_temperature",
                ));
            }
            check_non_negative(errors, "household.chp.active_kw", chp.active_kw);
            check_non_negative(errors, "household.chp.thermal_kw", chp.thermal_kw);
            check_non_negative(errors, "household.chp.gas_kw", chp.gas_kw);
            if chp.slot_minutes <= 0 {
                errors.push(ConfigError::new("household.chp.slot_minutes", "must be > 0"));
            }
        }
        let heater = &h.smart_heater;
        if heater.enabled {
            if heater.stages == 0 {
                errors.push(ConfigError::new("household.smart_heater.stages", "must be > 0"));
            }
            // Devices work in whole watts.
            if !(heater.stage_kw * 1000.0 >= 0.5) {
                errors.push(ConfigError::new("household.smart_heater.stage_kw", "must be at least 0.001"));
            }
            check_finite(errors, "household.smart_heater.max_temperature", heater.max_temperature);
        }
    }
}

fn check_non_negative(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value >= 0.0 && value.is_finite()) {
        errors.push(ConfigError::new(field, "must be a non-negative number"));
    }
}

fn check_finite(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !value.is_finite() {
        errors.push(ConfigError::new(field, "must be a finite number"));
    }
}

fn check_compression(errors: &mut Vec<ConfigError>, field: &str, c: &LoadProfileCompression) {
    let ok = match c.kind {
        CompressionType::Raw => true,
        CompressionType::Discontinuities => c.value >= 0,
        CompressionType::Timeslot => c.value > 0,
    };
    if !ok {
        errors.push(ConfigError::new(
            format!("{field}.value"),
            format!("out of range for {:?} compression", c.kind),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let e = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(e.field, "preset");
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[optimization]
population_size = 30
crossover = "uniform"
replacement = "mu_plus_lambda"

[[stopping.rules]]
type = "max_evaluations"
max_evaluations = 500

[[stopping.rules]]
type = "wall_clock"
max_runtime_ms = 2000

[scheduling]
encoding = "real"
seed = 7
step_size_secs = 300

[compression.default]
type = "discontinuities"
value = 50

[compression.commodities.ACTIVEPOWER]
type = "timeslot"
value = 900

[fitness]
limit_violation = 100.0

[prices]
peak_import_per_kwh = 45.0

[household.battery]
capacity_kwh = 13.5

[household.chp]
enabled = true
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.optimization.population_size, 30);
        assert_eq!(cfg.stopping.rules.len(), 2);
        assert_eq!(cfg.scheduling.encoding, VariableEncoding::Real);
        assert_eq!(cfg.scheduling.step_size_secs, 300);
        // untouched fields keep their defaults
        assert_eq!(cfg.scheduling.horizon_secs, 86_400);
        assert_eq!(cfg.household.battery.capacity_kwh, 13.5);
        assert_eq!(cfg.household.battery.initial_soc, 0.5);
        assert!(cfg.household.chp.enabled);
        assert_eq!(
            cfg.compression.overrides().collect::<Vec<_>>(),
            vec![(Commodity::ActivePower, LoadProfileCompression::timeslot(900))]
        );
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[scheduling]
step_size_secs = 60
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_reports_dotted_paths() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.scheduling.step_size_secs = 0;
        cfg.household.battery.initial_soc = 1.5;
        cfg.stopping.rules.clear();
        cfg.compression.commodities.insert("STEAM".into(), LoadProfileCompression::raw());
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"scheduling.step_size_secs".to_string()));
        assert!(fields.contains(&"household.battery.initial_soc".to_string()));
        assert!(fields.contains(&"stopping.rules".to_string()));
        assert!(fields.contains(&"compression.commodities.STEAM".to_string()));
    }

    #[test]
    fn validation_catches_bad_operators() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.optimization.population_size = 1;
        assert!(cfg.validate().iter().any(|e| e.field == "optimization"));
    }

    #[test]
    fn validation_catches_heater_without_tank() {
        let mut cfg = ScenarioConfig::chp();
        cfg.household.hot_water.enabled = false;
        assert!(cfg.validate().iter().any(|e| e.field == "household.hot_water.enabled"));
    }

    fn rejected(cfg: &ScenarioConfig) -> Vec<String> {
        cfg.validate().into_iter().map(|e| e.field).collect()
    }

    #[test]
    fn zero_power_factor_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.baseload.power_factor = 0.0;
        assert!(rejected(&cfg).contains(&"household.baseload.power_factor".to_string()));
        cfg.household.baseload.power_factor = 1.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn negative_battery_power_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.battery.max_charge_kw = -1.0;
        cfg.household.battery.max_discharge_kw = f64::NAN;
        let fields = rejected(&cfg);
        assert!(fields.contains(&"household.battery.max_charge_kw".to_string()));
        assert!(fields.contains(&"household.battery.max_discharge_kw".to_string()));
    }

    #[test]
    fn nan_battery_capacity_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.battery.capacity_kwh = f64::NAN;
        assert!(rejected(&cfg).contains(&"household.battery.capacity_kwh".to_string()));
    }

    #[test]
    fn negative_boiler_power_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.gas_boiler.heat_kw = -15.0;
        cfg.household.gas_boiler.gas_kw = -16.7;
        let fields = rejected(&cfg);
        assert!(fields.contains(&"household.gas_boiler.heat_kw".to_string()));
        assert!(fields.contains(&"household.gas_boiler.gas_kw".to_string()));
    }

    #[test]
    fn nan_temperatures_are_rejected() {
        let mut cfg = ScenarioConfig::chp();
        cfg.household.gas_boiler.min_temperature = f64::NAN;
        cfg.household.chp.max_temperature = f64::NAN;
        cfg.household.hot_water.initial_temperature = f64::NAN;
        cfg.household.hot_water.ambient_temperature = f64::INFINITY;
        let fields = rejected(&cfg);
        assert!(fields.contains(&"household.gas_boiler.min_temperature".to_string()));
        assert!(fields.contains(&"household.chp.min_temperature".to_string()));
        assert!(fields.contains(&"household.hot_water.initial_temperature".to_string()));
        assert!(fields.contains(&"household.hot_water.ambient_temperature".to_string()));
    }

    #[test]
    fn nan_tank_volume_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.hot_water.volume_l = f64::NAN;
        cfg.household.hot_water.loss_w_per_k = -1.0;
        let fields = rejected(&cfg);
        assert!(fields.contains(&"household.hot_water.volume_l".to_string()));
        assert!(fields.contains(&"household.hot_water.loss_w_per_k".to_string()));
    }

    #[test]
    fn nan_appliance_window_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.appliance.latest_start_hour = f64::NAN;
        assert!(rejected(&cfg).contains(&"household.appliance.earliest_start_hour".to_string()));
    }

    #[test]
    fn sub_watt_heater_stage_is_rejected() {
        let mut cfg = ScenarioConfig::all_electric();
        for stage_kw in [0.0, -2.0, 0.0001, f64::NAN] {
            cfg.household.smart_heater.stage_kw = stage_kw;
            assert!(
                rejected(&cfg).contains(&"household.smart_heater.stage_kw".to_string()),
                "stage_kw {stage_kw} accepted"
            );
        }
        cfg.household.smart_heater.stage_kw = 0.001;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn empty_household_is_invalid() {
        let toml = r#"
[household.baseload]
enabled = false
[household.pv]
enabled = false
[household.battery]
enabled = false
[household.appliance]
enabled = false
[household.hot_water]
enabled = false
[household.gas_boiler]
enabled = false
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert!(cfg.validate().iter().any(|e| e.field == "household"));
    }

    #[test]
    fn all_electric_has_no_gas() {
        let cfg = ScenarioConfig::all_electric();
        assert!(!cfg.household.gas_boiler.enabled);
        assert!(cfg.household.smart_heater.enabled);
        assert!(cfg.household.pv.kw_peak > ScenarioConfig::baseline().household.pv.kw_peak);
    }
}
