//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use hems_sched::devices::battery::{Battery, BatteryParams};
use hems_sched::devices::gas_boiler::{GasBoiler, GasBoilerParams};
use hems_sched::devices::hot_water_tank::{HotWaterTank, HotWaterTankParams};
use hems_sched::devices::pv::{Pv, PvParams};
use hems_sched::devices::{DeviceId, ProblemPart};
use hems_sched::ea::{AlgorithmParameters, StoppingRule, VariableEncoding};
use hems_sched::profile::Commodity;
use hems_sched::random::RandomStream;
use hems_sched::scheduling::SchedulerSettings;
use hems_sched::signals::{SignalSnapshot, StepSeries, Tariff};
use hems_sched::sim::{FitnessWeights, HouseholdProblem, SimulationTiming};

/// Quarter-hour ticks.
pub const STEP: i64 = 900;

/// Flat prices: electricity 30/8 ct, gas 10 ct per kWh.
pub fn flat_prices() -> SignalSnapshot {
    SignalSnapshot::new()
        .with_price(
            Commodity::ActivePower,
            StepSeries::constant(Tariff {
                import_per_kwh: 30.0,
                export_per_kwh: 8.0,
            }),
        )
        .with_price(
            Commodity::NaturalGasPower,
            StepSeries::constant(Tariff {
                import_per_kwh: 10.0,
                export_per_kwh: 0.0,
            }),
        )
}

/// Gas boiler (60-80 °C band, 15 kW) starting off.
pub fn boiler(id: &str) -> ProblemPart {
    ProblemPart::new(DeviceId::new(id), 0, GasBoiler::new(GasBoilerParams::default(), false))
}

/// Tank so large its temperature stays put over a few hours.
pub fn constant_tank(id: &str, temperature: f64) -> ProblemPart {
    let params = HotWaterTankParams {
        volume_l: 1.0e9,
        ..HotWaterTankParams::default()
    };
    ProblemPart::new(DeviceId::new(id), 0, HotWaterTank::new(params, temperature))
}

/// 10 kWh battery at half charge, encoded over `[0, horizon)`.
pub fn battery(id: &str, horizon: i64) -> ProblemPart {
    let mut part = ProblemPart::new(DeviceId::new(id), 0, Battery::new(BatteryParams::default(), 0.5));
    part.recalculate_encoding(0, horizon);
    part
}

pub fn pv(id: &str) -> ProblemPart {
    ProblemPart::new(DeviceId::new(id), 0, Pv::new(PvParams::default(), 0))
}

/// Household problem over `[0, horizon)` with quarter-hour ticks.
pub fn problem(parts: Vec<ProblemPart>, encoding: VariableEncoding, horizon: i64, seed: u64) -> HouseholdProblem {
    HouseholdProblem::new(
        parts,
        encoding,
        Arc::new(flat_prices()),
        SimulationTiming::new(0, STEP, horizon).unwrap(),
        FitnessWeights::default(),
        RandomStream::new(seed),
    )
    .unwrap()
}

/// Single-threaded operators with a small population.
pub fn small_algorithm(population_size: usize) -> AlgorithmParameters {
    AlgorithmParameters {
        population_size,
        worker_threads: 1,
        ..AlgorithmParameters::default()
    }
}

/// Scheduler settings with a pure evaluation budget.
pub fn settings(population_size: usize, max_evaluations: usize, horizon: i64) -> SchedulerSettings {
    SchedulerSettings {
        algorithm: small_algorithm(population_size),
        stopping: vec![StoppingRule::MaxEvaluations { max_evaluations }],
        encoding: VariableEncoding::Binary,
        seed: 42,
        step_size_secs: STEP,
        horizon_secs: horizon,
        reschedule_interval_secs: 3600,
        keep_prediction: true,
        fitness: FitnessWeights::default(),
    }
}
