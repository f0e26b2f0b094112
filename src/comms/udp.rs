//! UDP command link
//!
//! Each motor command is sent as a single 5-byte datagram to the robot's
//! configured address.

use super::CommandSink;
use crate::common::types::RobotId;
use crate::control::MotorCommand;
use crate::error::{FleetError, Result};
use std::net::{SocketAddr, UdpSocket};

/// Sends motor commands over UDP
#[derive(Debug)]
pub struct UdpCommandLink {
    socket: UdpSocket,
}

impl UdpCommandLink {
    /// Bind to `bind_addr`, e.g. `"0.0.0.0:0"` for an ephemeral port
    pub fn bind(bind_addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr)?;
        log::info!("Command link bound to {}", socket.local_addr()?);
        Ok(UdpCommandLink { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl CommandSink for UdpCommandLink {
    fn send(&self, robot: RobotId, address: Option<SocketAddr>, command: MotorCommand) -> Result<()> {
        let address = address.ok_or(FleetError::NoAddress(robot))?;
        let message = command.encode();
        let sent = self.socket.send_to(&message, address)?;
        log::debug!("Robot {} <- {:?} ({} bytes to {})", robot, command, sent, address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::commands::COMMAND_LEN;

    #[test]
    fn sends_encoded_command() {
        let robot = UdpSocket::bind("127.0.0.1:0").unwrap();
        let link = UdpCommandLink::bind("127.0.0.1:0").unwrap();

        link.send(3, Some(robot.local_addr().unwrap()), MotorCommand::drive(50))
            .unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = robot.recv_from(&mut buf).unwrap();
        assert_eq!(len, COMMAND_LEN);
        assert_eq!(MotorCommand::decode(&buf[..len]).unwrap(), MotorCommand::drive(50));
    }

    #[test]
    fn missing_address_is_an_error() {
        let link = UdpCommandLink::bind("127.0.0.1:0").unwrap();
        let result = link.send(9, None, MotorCommand::stop());
        assert!(matches!(result, Err(FleetError::NoAddress(9))));
    }
}
