//! Household energy scheduling with an interdependent evolutionary algorithm.

pub mod config;
pub mod devices;
pub mod ea;
pub mod error;
pub mod forecast;
pub mod household;
pub mod io;
pub mod profile;
pub mod random;
/// Reschedule triggers, device registry and run orchestration.
pub mod scheduling;
pub mod signals;
/// Interdependent simulation, the household problem and KPIs.
pub mod sim;
