//! Perception for the fleet: robot pose telemetry
pub mod telemetry;

pub use telemetry::{apply_datagram, TelemetryRecord, RECORD_LEN};
