//! Reschedule triggers, the part registry and the run orchestrator.

pub mod deviation;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod time;
pub mod trigger;

pub use deviation::DeviationMonitor;
pub use events::{ChannelSink, EventSink, RunSummary, SchedulerEvent};
pub use orchestrator::{Scheduler, SchedulerSettings};
pub use registry::{PartRegistry, PartSnapshot};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use trigger::{RescheduleTrigger, TriggerReason};
