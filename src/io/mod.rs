//! File output for schedules.

pub mod export;
