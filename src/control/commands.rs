//! Motor command wire format
//!
//! Every command is five bytes: one ASCII tag followed by two signed 16-bit
//! little-endian parameters, one per wheel.
//!
//! ```text
//! ┌─────┬───────────────┬────────────────┐
//! │ tag │ left (i16 LE) │ right (i16 LE) │
//! └─────┴───────────────┴────────────────┘
//! ```
//!
//! - `'D'`: differential turn, parameters are encoder ticks per wheel
//! - `'S'`: symmetric drive, parameters are wheel speeds; `0, 0` stops

use crate::error::{FleetError, Result};

/// Length of an encoded command
pub const COMMAND_LEN: usize = 5;

const TURN_TAG: u8 = b'D';
const DRIVE_TAG: u8 = b'S';

/// Command understood by the robot firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCommand {
    /// Turn in place by driving the wheels the given ticks
    Turn { left: i16, right: i16 },
    /// Drive both wheels at the given speeds
    Drive { left: i16, right: i16 },
}

impl MotorCommand {
    /// Turn command for a signed tick count: `(+ticks, -ticks)`
    pub fn turn(ticks: i16) -> Self {
        MotorCommand::Turn {
            left: ticks,
            right: ticks.saturating_neg(),
        }
    }

    pub fn drive(speed: i16) -> Self {
        MotorCommand::Drive {
            left: speed,
            right: speed,
        }
    }

    pub fn stop() -> Self {
        MotorCommand::Drive { left: 0, right: 0 }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, MotorCommand::Drive { left: 0, right: 0 })
    }

    pub fn encode(&self) -> [u8; COMMAND_LEN] {
        let (tag, left, right) = match *self {
            MotorCommand::Turn { left, right } => (TURN_TAG, left, right),
            MotorCommand::Drive { left, right } => (DRIVE_TAG, left, right),
        };

        let mut message = [0u8; COMMAND_LEN];
        message[0] = tag;
        message[1..3].copy_from_slice(&left.to_le_bytes());
        message[3..5].copy_from_slice(&right.to_le_bytes());
        message
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMMAND_LEN {
            return Err(FleetError::InvalidCommand(format!(
                "expected {} bytes, got {}",
                COMMAND_LEN,
                bytes.len()
            )));
        }

        let left = i16::from_le_bytes([bytes[1], bytes[2]]);
        let right = i16::from_le_bytes([bytes[3], bytes[4]]);
        match bytes[0] {
            TURN_TAG => Ok(MotorCommand::Turn { left, right }),
            DRIVE_TAG => Ok(MotorCommand::Drive { left, right }),
            tag => Err(FleetError::InvalidCommand(format!("unknown tag {:#04x}", tag))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_is_encoded_little_endian() {
        let bytes = MotorCommand::turn(25).encode();
        assert_eq!(bytes, [b'D', 25, 0, 0xE7, 0xFF]);
    }

    #[test]
    fn stop_is_symmetric_zero() {
        assert_eq!(MotorCommand::stop().encode(), [b'S', 0, 0, 0, 0]);
        assert!(MotorCommand::stop().is_stop());
        assert!(!MotorCommand::drive(50).is_stop());
    }

    #[test]
    fn decode_reads_back_drive() {
        let bytes = [b'S', 0x32, 0x00, 0x32, 0x00];
        assert_eq!(MotorCommand::decode(&bytes).unwrap(), MotorCommand::drive(50));
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(MotorCommand::decode(&[b'S', 0, 0]).is_err());
        assert!(MotorCommand::decode(&[b'X', 0, 0, 0, 0]).is_err());
    }
}
