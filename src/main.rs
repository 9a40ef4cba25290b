//! hems-sched entry point: CLI wiring and a single optimization run of the
//! configured household.

use std::path::Path;
use std::process;

use hems_sched::config::ScenarioConfig;
use hems_sched::household::{build_parts, build_signals};
use hems_sched::io::export::export_csv;
use hems_sched::scheduling::{
    ChannelSink, FixedTimeSource, RunSummary, Scheduler, SchedulerEvent, SchedulerSettings, SystemTimeSource,
    TimeSource,
};
use hems_sched::sim::{HouseholdKpi, Schedule};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    start: Option<i64>,
    schedule_out: Option<String>,
    json: bool,
}

fn print_help() {
    eprintln!("hems-sched - household energy scheduler");
    eprintln!();
    eprintln!("Usage: hems-sched [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, chp, all_electric)");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --start <epoch>          Schedule from this time instead of now (s)");
    eprintln!("  --schedule-out <path>    Export published schedules to CSV");
    eprintln!("  --json                   Print the run summary as JSON");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn value_of(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        start: None,
        schedule_out: None,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(value_of(&args, i, "--scenario", "a path argument"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value_of(&args, i, "--preset", "a name argument"));
            }
            "--seed" => {
                i += 1;
                let raw = value_of(&args, i, "--seed", "a u64 argument");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--start" => {
                i += 1;
                let raw = value_of(&args, i, "--start", "an epoch seconds argument");
                if let Ok(t) = raw.parse::<i64>() {
                    cli.start = Some(t);
                } else {
                    eprintln!("error: --start value \"{raw}\" is not a valid i64");
                    process::exit(1);
                }
            }
            "--schedule-out" => {
                i += 1;
                cli.schedule_out = Some(value_of(&args, i, "--schedule-out", "a path argument"));
            }
            "--json" => {
                cli.json = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.scenario_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --scenario and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

/// One line per device: type, net energy per commodity and cervisia.
fn print_schedule(s: &Schedule, from: i64, to: i64) {
    if s.failed {
        println!("{:<16} {:<14} FAILED (empty schedule)", s.device_id.as_str(), s.device_type);
        return;
    }
    let mut line = format!("{:<16} {:<14}", s.device_id.as_str(), s.device_type);
    for commodity in s.profile.commodities() {
        let (pos, neg) = s.profile.energy_wh(commodity, from, to);
        let unit = if commodity.is_grid_commodity() { "kWh" } else { "kWh(th)" };
        line.push_str(&format!(" {commodity}={:+.2}{unit}", (pos - neg) / 1000.0));
    }
    if s.profile.commodities().next().is_none() {
        line.push_str(" idle");
    }
    line.push_str(&format!(" cervisia={:.2}", s.cervisia));
    println!("{line}");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let mut scenario = load_scenario(&cli);

    if let Some(seed) = cli.seed_override {
        scenario.scheduling.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let now = cli.start.unwrap_or_else(|| SystemTimeSource.now());
    let horizon_end = now + scenario.scheduling.horizon_secs;

    let parts = match build_parts(&scenario, now) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    info!(devices = parts.len(), start = now, "household assembled");

    let (sink, events) = ChannelSink::unbounded();
    let scheduler = match Scheduler::new(SchedulerSettings::from_config(&scenario), FixedTimeSource::new(now), sink) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    for part in parts {
        scheduler.publish(part);
    }
    scheduler.update_signals(build_signals(&scenario, now, horizon_end));

    if let Err(e) = scheduler.request_run() {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let mut schedules = Vec::new();
    let mut summary: Option<RunSummary> = None;
    for event in events.try_iter() {
        match event {
            SchedulerEvent::Schedule(s) => schedules.push(s),
            SchedulerEvent::Summary(s) => summary = Some(s),
        }
    }

    for s in &schedules {
        print_schedule(s, now, horizon_end);
    }

    let kpi = HouseholdKpi::from_schedules(&schedules, now, horizon_end);
    println!("\n{kpi}");
    println!(
        "Grid peak within limit: {}",
        f64::from(kpi.peak_import_w) <= scenario.limits.max_import_w
    );

    if cli.json {
        if let Some(ref s) = summary {
            match serde_json::to_string_pretty(s) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("error: failed to serialize run summary: {e}");
                    process::exit(1);
                }
            }
        }
    }

    if let Some(ref path) = cli.schedule_out {
        if let Err(e) = export_csv(&schedules, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Schedules written to {path}");
    }
}
