//! Every built-in preset schedules end to end, and scenario files load.

mod common;

use std::sync::Arc;

use hems_sched::config::ScenarioConfig;
use hems_sched::household::{build_parts, build_signals};
use hems_sched::scheduling::{ChannelSink, FixedTimeSource, Scheduler, SchedulerEvent};

const HORIZON: i64 = 6 * 3600;

fn run_preset(name: &str) -> (usize, Vec<String>, f64) {
    let mut cfg = ScenarioConfig::from_preset(name).unwrap();
    cfg.scheduling.step_size_secs = 900;
    cfg.scheduling.horizon_secs = HORIZON;
    let parts = build_parts(&cfg, 0).unwrap();
    let device_count = parts.len();

    let (sink, rx) = ChannelSink::unbounded();
    let s = Scheduler::new(common::settings(4, 8, HORIZON), Arc::new(FixedTimeSource::new(0)), sink).unwrap();
    for part in parts {
        s.publish(part);
    }
    s.update_signals(build_signals(&cfg, 0, HORIZON));
    let summary = s.request_run().unwrap().unwrap();

    let ids: Vec<String> = rx
        .try_iter()
        .filter_map(|e| match e {
            SchedulerEvent::Schedule(s) => Some(s.device_id.as_str().to_string()),
            SchedulerEvent::Summary(_) => None,
        })
        .collect();
    assert!(summary.failed_devices.is_empty(), "{name}: {:?}", summary.failed_devices);
    (device_count, ids, summary.objectives.energy_cost)
}

#[test]
fn every_preset_publishes_one_schedule_per_device() {
    for name in ScenarioConfig::PRESETS {
        let (devices, ids, cost) = run_preset(name);
        assert_eq!(ids.len(), devices, "preset {name}");
        assert!(cost.is_finite(), "preset {name}");
    }
}

#[test]
fn presets_differ_in_heat_generation() {
    let (_, baseline, _) = run_preset("baseline");
    let (_, chp, _) = run_preset("chp");
    let (_, electric, _) = run_preset("all_electric");
    assert!(baseline.iter().any(|id| id == "gas_boiler"));
    assert!(chp.iter().any(|id| id == "chp"));
    assert!(electric.iter().any(|id| id == "smart_heater"));
    assert!(!electric.iter().any(|id| id == "gas_boiler"));
}

#[test]
fn scenario_file_round_trips() {
    let cfg = ScenarioConfig::chp();
    let text = toml::to_string(&cfg).unwrap();
    let path = std::env::temp_dir().join(format!("hems-sched-scenario-{}.toml", std::process::id()));
    std::fs::write(&path, text).unwrap();
    let loaded = ScenarioConfig::from_toml_file(&path);
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.unwrap(), cfg);
}

#[test]
fn missing_scenario_file_names_the_path() {
    let e = ScenarioConfig::from_toml_file(std::path::Path::new("/nonexistent/scenario.toml")).unwrap_err();
    assert_eq!(e.field, "scenario");
    assert!(e.message.contains("/nonexistent/scenario.toml"));
}
