//! Device models and the problem parts that wrap them.

/// Shiftable appliance program.
pub mod appliance;
/// Uncontrolled household consumption.
pub mod baseload;
/// Home battery storage.
pub mod battery;
/// Micro combined heat and power unit.
pub mod chp;
pub mod gas_boiler;
pub mod hot_water_tank;
pub mod model;
pub mod part;
/// Rooftop photovoltaic generation.
pub mod pv;
pub mod smart_heater;
pub mod thermal_demand;
pub mod types;

// Re-export the main types for convenience
pub use model::DeviceModel;
pub use part::{CalculationSettings, ProblemPart};
pub use types::{Capabilities, DeviceId, InterdependentModel, RunContext, TickContext};
