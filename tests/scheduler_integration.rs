//! End-to-end runs of the demo household through the scheduler.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use hems_sched::config::ScenarioConfig;
use hems_sched::devices::ProblemPart;
use hems_sched::household::{build_parts, build_signals};
use hems_sched::profile::Commodity;
use hems_sched::scheduling::{
    ChannelSink, DeviationMonitor, FixedTimeSource, RunSummary, Scheduler, SchedulerEvent, TimeSource,
    TriggerReason,
};
use hems_sched::sim::{HouseholdKpi, Schedule};

type TestScheduler = Scheduler<Arc<FixedTimeSource>, ChannelSink>;

fn baseline(step: i64, horizon: i64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.scheduling.step_size_secs = step;
    cfg.scheduling.horizon_secs = horizon;
    cfg
}

fn scheduler(
    cfg: &ScenarioConfig,
    population: usize,
    evaluations: usize,
) -> (TestScheduler, Arc<FixedTimeSource>, Receiver<SchedulerEvent>) {
    let horizon = cfg.scheduling.horizon_secs;
    let mut settings = common::settings(population, evaluations, horizon);
    settings.step_size_secs = cfg.scheduling.step_size_secs;
    let time = Arc::new(FixedTimeSource::new(0));
    let (sink, rx) = ChannelSink::unbounded();
    let s = Scheduler::new(settings, Arc::clone(&time), sink).unwrap();
    for part in build_parts(cfg, 0).unwrap() {
        s.publish(part);
    }
    s.update_signals(build_signals(cfg, 0, horizon));
    (s, time, rx)
}

fn drain(rx: &Receiver<SchedulerEvent>) -> (Vec<Schedule>, Vec<RunSummary>) {
    let mut schedules = Vec::new();
    let mut summaries = Vec::new();
    for event in rx.try_iter() {
        match event {
            SchedulerEvent::Schedule(s) => schedules.push(s),
            SchedulerEvent::Summary(s) => summaries.push(s),
        }
    }
    (schedules, summaries)
}

#[test]
fn baseline_household_gets_a_full_schedule_set() {
    let cfg = baseline(900, 86_400);
    let (s, _, rx) = scheduler(&cfg, 4, 8);
    let summary = s.request_run().unwrap().unwrap();
    assert_eq!(summary.generations, 2);
    assert_eq!(summary.evaluations, 8);
    assert!(summary.fitness.is_finite());
    assert!(summary.failed_devices.is_empty());

    let (schedules, summaries) = drain(&rx);
    let ids: Vec<&str> = schedules.iter().map(|s| s.device_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["appliance", "baseload", "battery", "gas_boiler", "heat_demand", "hot_water_tank", "pv"]
    );
    assert_eq!(summaries, vec![summary]);

    let kpi = HouseholdKpi::from_schedules(&schedules, 0, 86_400);
    assert!(kpi.imported_kwh > 0.0);
    assert_eq!(kpi.failed_devices, 0);
}

#[test]
fn published_summary_serializes_to_json() {
    let cfg = baseline(900, 6 * 3600);
    let (s, _, _rx) = scheduler(&cfg, 4, 8);
    let summary = s.request_run().unwrap().unwrap();
    let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["trigger"], "manual");
    assert_eq!(json["evaluations"], 8);
    assert!(json["objectives"]["energy_cost"].is_number());
}

#[test]
fn same_seed_same_household_same_plan() {
    let cfg = baseline(900, 6 * 3600);
    let (a, _, rx_a) = scheduler(&cfg, 6, 24);
    let (b, _, rx_b) = scheduler(&cfg, 6, 24);
    let ra = a.request_run().unwrap().unwrap();
    let rb = b.request_run().unwrap().unwrap();
    assert_eq!(ra.objectives, rb.objectives);
    assert_eq!(drain(&rx_a).0, drain(&rx_b).0);
}

#[test]
fn trigger_during_a_run_is_served_right_after_it() {
    let cfg = baseline(60, 86_400);
    let (s, _, rx) = scheduler(&cfg, 8, 200);

    std::thread::scope(|scope| {
        let running = scope.spawn(|| s.request_run());
        let deadline = Instant::now() + Duration::from_secs(30);
        while !s.is_running() {
            assert!(Instant::now() < deadline, "run never started");
            std::hint::spin_loop();
        }
        // Neither call blocks while the run is in flight.
        assert!(s.request_run().unwrap().is_none());
        s.publish(common::pv("pv_garage"));

        let last = running.join().unwrap().unwrap().unwrap();
        assert_eq!(last.trigger, TriggerReason::Queued);
    });

    let (schedules, summaries) = drain(&rx);
    let triggers: Vec<_> = summaries.iter().map(|s| s.trigger).collect();
    assert_eq!(triggers, vec![TriggerReason::Manual, TriggerReason::Queued]);
    // Seven devices in the first run, eight in the queued one.
    assert_eq!(schedules.len(), 15);
}

#[test]
fn deviation_forces_a_reschedule() {
    let cfg = baseline(900, 6 * 3600);
    let (s, time, rx) = scheduler(&cfg, 4, 8);
    assert_eq!(s.poll().unwrap().map(|r| r.trigger), Some(TriggerReason::Initial));
    let (schedules, _) = drain(&rx);
    let plan = &schedules.iter().find(|s| s.device_id.as_str() == "baseload").unwrap().profile;

    let mut monitor = DeviationMonitor::new(Commodity::ActivePower, 500, 600);
    let mut forced = false;
    for minute in 0..20 {
        let t = minute * 60;
        time.set(t);
        let measured = plan.value_at(Commodity::ActivePower, t) + 3000;
        forced = monitor.observe(plan, t, measured);
        if forced {
            break;
        }
    }
    assert!(forced);
    assert!(s.poll().unwrap().is_none());

    let snapshot = s.registry().snapshot();
    let baseload = snapshot.values().find(|p| p.device_id().as_str() == "baseload").unwrap();
    s.publish(ProblemPart::clone(baseload).with_forced_reschedule(true));
    let summary = s.poll().unwrap().unwrap();
    assert_eq!(summary.trigger, TriggerReason::Forced);
    assert_eq!(summary.reference_time, time.now());
}
