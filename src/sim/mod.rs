/// Simulation clock for timestep management.
pub mod clock;
/// Tick-stepped co-simulation of one chromosome.
pub mod evaluator;
pub mod kpi;
pub mod power_balance;
pub mod problem;
/// Final per-device schedules.
pub mod schedule;
pub mod state;
pub mod types;

pub use evaluator::{InputRouting, InterdependentSimulation, SimulationSetup};
pub use kpi::HouseholdKpi;
pub use problem::HouseholdProblem;
pub use schedule::Schedule;
pub use types::{EvaluationOutcome, FitnessWeights, Objectives, SimulationTiming};
