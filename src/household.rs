//! Builds the demo household (problem parts and grid signals) from a
//! scenario configuration.

use crate::config::{ConfigError, ScenarioConfig};
use crate::devices::appliance::{Appliance, ApplianceParams};
use crate::devices::baseload::{BaseLoad, BaseLoadParams};
use crate::devices::battery::{Battery, BatteryParams};
use crate::devices::chp::{Chp, ChpParams};
use crate::devices::gas_boiler::{GasBoiler, GasBoilerParams};
use crate::devices::hot_water_tank::{HotWaterTank, HotWaterTankParams};
use crate::devices::pv::{Pv, PvParams};
use crate::devices::smart_heater::{SmartHeater, SmartHeaterParams};
use crate::devices::thermal_demand::ThermalDemand;
use crate::devices::types::second_of_day;
use crate::devices::{DeviceId, DeviceModel, ProblemPart};
use crate::forecast::{NaiveForecast, daily_profile};
use crate::profile::{Commodity, LoadProfile};
use crate::signals::{PowerLimit, SignalSnapshot, StepSeries, Tariff};

const DAY_SECS: i64 = 86_400;
const HEAT: Commodity = Commodity::HeatingHotWaterPower;

fn kw(v: f64) -> f64 {
    v * 1000.0
}

fn kw_i32(v: f64) -> i32 {
    (v * 1000.0).round() as i32
}

fn hours(h: f64) -> i64 {
    (h * 3600.0).round() as i64
}

/// Problem parts of the configured household, anchored at `now`.
///
/// # Errors
///
/// Returns the first validation error if the configuration is invalid.
pub fn build_parts(cfg: &ScenarioConfig, now: i64) -> Result<Vec<ProblemPart>, ConfigError> {
    if let Some(e) = cfg.validate().into_iter().next() {
        return Err(e);
    }
    let h = &cfg.household;
    let s = &cfg.scheduling;
    let offset = s.utc_offset_secs;
    let horizon_end = now + s.horizon_secs;
    let mut models: Vec<(&str, DeviceModel)> = Vec::new();

    if h.baseload.enabled {
        let b = &h.baseload;
        let params = BaseLoadParams {
            base_w: kw(b.base_kw),
            amp_w: kw(b.amp_kw),
            phase_rad: b.phase_rad,
            noise_std_w: kw(b.noise_std_kw),
            power_factor: b.power_factor,
            utc_offset_secs: offset,
        };
        models.push(("baseload", BaseLoad::new(params, kw_i32(b.observed_kw)).into()));
    }

    if h.pv.enabled {
        let p = &h.pv;
        let params = PvParams {
            peak_w: kw(p.kw_peak),
            sunrise_secs: hours(p.sunrise_hour),
            sunset_secs: hours(p.sunset_hour),
            alpha: p.alpha,
            cloud_noise_std: p.cloud_noise_std,
            utc_offset_secs: offset,
        };
        models.push(("pv", Pv::new(params, 0).into()));
    }

    if h.battery.enabled {
        let b = &h.battery;
        let params = BatteryParams {
            capacity_wh: kw(b.capacity_kwh),
            max_charge_w: kw(b.max_charge_kw),
            max_discharge_w: kw(b.max_discharge_kw),
            eta_c: b.eta_charge,
            eta_d: b.eta_discharge,
            slot_secs: b.slot_minutes * 60,
            cervisia_per_kwh: b.cervisia_per_kwh,
        };
        models.push(("battery", Battery::new(params, b.initial_soc).into()));
    }

    if h.appliance.enabled {
        let a = &h.appliance;
        let mut program = LoadProfile::new();
        program.set_load(Commodity::ActivePower, 0, kw_i32(a.power_kw));
        program.close(a.duration_minutes * 60);
        let day_start = now - second_of_day(now, offset);
        let mut earliest_start = day_start + hours(a.earliest_start_hour);
        let mut latest_start = day_start + hours(a.latest_start_hour);
        if latest_start < now {
            earliest_start += DAY_SECS;
            latest_start += DAY_SECS;
        }
        let params = ApplianceParams {
            program,
            earliest_start,
            latest_start,
            resolution_secs: a.resolution_minutes * 60,
            cervisia_per_hour_delay: a.cervisia_per_hour_delay,
        };
        models.push(("appliance", Appliance::new(params, None).into()));
    }

    if h.hot_water.enabled {
        let w = &h.hot_water;
        let tank = HotWaterTankParams {
            commodity: HEAT,
            volume_l: w.volume_l,
            ambient_temperature: w.ambient_temperature,
            loss_w_per_k: w.loss_w_per_k,
            min_comfort_temperature: w.min_comfort_temperature,
            cervisia_per_kelvin_hour: w.cervisia_per_kelvin_hour,
        };
        models.push(("hot_water_tank", HotWaterTank::new(tank, w.initial_temperature).into()));

        let slots: Vec<i32> = w.demand_hourly_kw.iter().map(|v| kw_i32(*v)).collect();
        let prediction = NaiveForecast::new(offset).forecast(&daily_profile(HEAT, &slots), now, horizon_end);
        let observed = prediction.value_at(HEAT, now);
        models.push(("heat_demand", ThermalDemand::new(HEAT, prediction, observed).into()));
    }

    if h.gas_boiler.enabled {
        let g = &h.gas_boiler;
        let params = GasBoilerParams {
            min_temperature: g.min_temperature,
            max_temperature: g.max_temperature,
            max_hot_water_power_w: kw_i32(g.heat_kw),
            max_gas_power_w: kw_i32(g.gas_kw),
            commodity: HEAT,
            cervisia_per_start: g.cervisia_per_start,
        };
        models.push(("gas_boiler", GasBoiler::new(params, false).into()));
    }

    if h.chp.enabled {
        let c = &h.chp;
        let params = ChpParams {
            active_power_w: kw_i32(c.active_kw),
            thermal_power_w: kw_i32(c.thermal_kw),
            gas_power_w: kw_i32(c.gas_kw),
            min_temperature: c.min_temperature,
            max_temperature: c.max_temperature,
            slot_secs: c.slot_minutes * 60,
            commodity: HEAT,
            cervisia_per_start: c.cervisia_per_start,
        };
        models.push(("chp", Chp::new(params, false).into()));
    }

    if h.smart_heater.enabled {
        let sh = &h.smart_heater;
        let params = SmartHeaterParams {
            commodity: HEAT,
            stage_w: kw_i32(sh.stage_kw),
            stages: sh.stages,
            max_temperature: sh.max_temperature,
        };
        models.push(("smart_heater", SmartHeater::new(params, 0).into()));
    }

    let parts = models
        .into_iter()
        .map(|(id, model)| {
            let mut part = ProblemPart::new(DeviceId::new(id), now, model).with_compression(cfg.compression.default);
            for (commodity, compression) in cfg.compression.overrides() {
                part = part.with_commodity_compression(commodity, compression);
            }
            part.recalculate_encoding(now, horizon_end);
            part
        })
        .collect();
    Ok(parts)
}

/// Price and limit signals covering `[from, to)`.
pub fn build_signals(cfg: &ScenarioConfig, from: i64, to: i64) -> SignalSnapshot {
    let p = &cfg.prices;
    let base = Tariff {
        import_per_kwh: p.electricity_import_per_kwh,
        export_per_kwh: p.electricity_export_per_kwh,
    };
    let mut electricity = StepSeries::constant(base);
    if let Some(peak_price) = p.peak_import_per_kwh {
        let peak = Tariff {
            import_per_kwh: peak_price,
            ..base
        };
        let offset = cfg.scheduling.utc_offset_secs;
        let mut day = from - second_of_day(from, offset);
        while day < to {
            electricity.insert(day + i64::from(p.peak_start_hour) * 3600, peak);
            electricity.insert(day + i64::from(p.peak_end_hour) * 3600, base);
            day += DAY_SECS;
        }
    }
    let gas = StepSeries::constant(Tariff {
        import_per_kwh: p.gas_per_kwh,
        export_per_kwh: 0.0,
    });
    let limit = StepSeries::constant(PowerLimit {
        upper_w: cfg.limits.max_import_w,
        lower_w: -cfg.limits.max_export_w,
    });

    SignalSnapshot::new()
        .with_price(Commodity::ActivePower, electricity)
        .with_price(Commodity::NaturalGasPower, gas)
        .with_limit(Commodity::ActivePower, limit)
}
