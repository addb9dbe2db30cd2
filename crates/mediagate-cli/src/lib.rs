//! Support code for the `mediagate` binary.

pub mod output;
pub mod telemetry;
