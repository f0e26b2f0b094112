//! Transports between the coordinator and the robots
//!
//! Outbound motor commands go through a [`CommandSink`]; inbound pose
//! telemetry is received by the [`TelemetryListener`].
pub mod listener;
pub mod udp;

pub use listener::TelemetryListener;
pub use udp::UdpCommandLink;

use crate::common::types::RobotId;
use crate::control::MotorCommand;
use crate::error::{FleetError, Result};
use std::net::SocketAddr;
use std::sync::Mutex;

/// Destination for motor commands
pub trait CommandSink: Send + Sync {
    /// Deliver `command` to `robot` at `address`
    fn send(&self, robot: RobotId, address: Option<SocketAddr>, command: MotorCommand) -> Result<()>;
}

/// A command captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct SentCommand {
    pub robot: RobotId,
    pub address: Option<SocketAddr>,
    pub command: MotorCommand,
    pub sent_at: tokio::time::Instant,
}

/// Keeps every command in memory instead of sending it
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentCommand>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<MotorCommand> {
        self.sent().into_iter().map(|s| s.command).collect()
    }

    /// Commands sent to one robot
    pub fn commands_for(&self, robot: RobotId) -> Vec<MotorCommand> {
        self.sent()
            .into_iter()
            .filter(|s| s.robot == robot)
            .map(|s| s.command)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, robot: RobotId, address: Option<SocketAddr>, command: MotorCommand) -> Result<()> {
        log::debug!("Robot {} <- {:?}", robot, command);
        self.sent
            .lock()
            .map_err(|_| FleetError::LockPoisoned)?
            .push(SentCommand {
                robot,
                address,
                command,
                sent_at: tokio::time::Instant::now(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.send(1, None, MotorCommand::turn(10)).unwrap();
        sink.send(2, None, MotorCommand::drive(50)).unwrap();
        sink.send(1, None, MotorCommand::stop()).unwrap();

        assert_eq!(
            sink.commands_for(1),
            vec![MotorCommand::turn(10), MotorCommand::stop()]
        );
        assert_eq!(sink.commands().len(), 3);

        sink.clear();
        assert!(sink.sent().is_empty());
    }
}
