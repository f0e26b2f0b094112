//! Pose telemetry records
//!
//! Each robot reports its pose as a fixed 20-byte little-endian record:
//!
//! ```text
//! ┌──────────┬─────────┬─────────┬───────────────┐
//! │ id (i32) │ x (f32) │ y (f32) │ heading (f64) │
//! └──────────┴─────────┴─────────┴───────────────┘
//! ```
//!
//! Positions arrive in raw units (mm) and are converted to working units
//! (cm). Heading is in radians.

use crate::common::types::RobotId;
use crate::error::{FleetError, Result};
use crate::fleet::Fleet;

/// Size of one telemetry record
pub const RECORD_LEN: usize = 20;

/// Raw position units per working unit
pub const RAW_UNITS_PER_WORKING_UNIT: f64 = 10.0;

/// One decoded pose report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub id: RobotId,
    /// Working units
    pub x: f64,
    /// Working units
    pub y: f64,
    /// Radians
    pub theta: f64,
}

impl TelemetryRecord {
    /// Decode the record at the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_LEN {
            return Err(FleetError::InvalidTelemetry {
                expected: RECORD_LEN,
                len: bytes.len(),
            });
        }

        let id = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let x = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let y = f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let mut heading = [0u8; 8];
        heading.copy_from_slice(&bytes[12..20]);

        let theta = f64::from_le_bytes(heading);

        for (field, finite) in [("x", x.is_finite()), ("y", y.is_finite()), ("heading", theta.is_finite())] {
            if !finite {
                return Err(FleetError::InvalidPose {
                    id,
                    reason: format!("{} is not a finite number", field),
                });
            }
        }

        Ok(TelemetryRecord {
            id,
            x: f64::from(x) / RAW_UNITS_PER_WORKING_UNIT,
            y: f64::from(y) / RAW_UNITS_PER_WORKING_UNIT,
            theta,
        })
    }

    /// Encode in raw units, as a robot would send it
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[0..4].copy_from_slice(&self.id.to_le_bytes());
        bytes[4..8].copy_from_slice(&((self.x * RAW_UNITS_PER_WORKING_UNIT) as f32).to_le_bytes());
        bytes[8..12].copy_from_slice(&((self.y * RAW_UNITS_PER_WORKING_UNIT) as f32).to_le_bytes());
        bytes[12..20].copy_from_slice(&self.theta.to_le_bytes());
        bytes
    }
}

/// Apply every record in a datagram to the fleet.
///
/// A datagram shorter than one record is dropped. Records with unusable
/// values are skipped one by one. Returns how many poses were applied.
pub fn apply_datagram(fleet: &Fleet, datagram: &[u8], now_ms: f64) -> usize {
    if datagram.len() < RECORD_LEN {
        log::warn!(
            "Discarding telemetry datagram: {}",
            FleetError::InvalidTelemetry {
                expected: RECORD_LEN,
                len: datagram.len(),
            }
        );
        return 0;
    }

    let chunks = datagram.chunks_exact(RECORD_LEN);
    if !chunks.remainder().is_empty() {
        log::warn!("Ignoring {} trailing telemetry bytes", chunks.remainder().len());
    }

    let mut applied = 0;
    for chunk in chunks {
        let record = match TelemetryRecord::parse(chunk) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping telemetry record: {}", e);
                continue;
            }
        };
        match fleet.update_pose(record.id, record.x, record.y, record.theta, now_ms) {
            Ok(_) => applied += 1,
            Err(e) => log::warn!("Robot {}: pose update failed: {}", record.id, e),
        }
    }
    applied
}
