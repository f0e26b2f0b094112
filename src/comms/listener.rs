//! Telemetry listener
//!
//! Receives pose datagrams on a UDP socket and applies them to the fleet.
//! Bad datagrams are logged and skipped; the listener keeps running.

use crate::common::Clock;
use crate::error::{FleetError, Result};
use crate::fleet::Fleet;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::perception::apply_datagram;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Largest datagram accepted
const MAX_DATAGRAM_SIZE: usize = 65536;

/// Pause after a socket error before receiving again
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// UDP receiver for pose telemetry
pub struct TelemetryListener {
    base: LifecycleNodeBase,
    bind_addr: String,
    fleet: Arc<Fleet>,
    clock: Arc<dyn Clock>,
    socket: Option<std::net::UdpSocket>,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl TelemetryListener {
    pub fn new(bind_addr: &str, fleet: Arc<Fleet>, clock: Arc<dyn Clock>) -> Self {
        TelemetryListener {
            base: LifecycleNodeBase::new("telemetry_listener"),
            bind_addr: bind_addr.to_string(),
            fleet,
            clock,
            socket: None,
            local_addr: None,
            task: None,
        }
    }

    /// Address the socket is bound to, once configured
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn state(&self) -> State {
        self.base.get_state()
    }

    fn bind(&mut self) -> Result<()> {
        let socket = std::net::UdpSocket::bind(&self.bind_addr)?;
        socket.set_nonblocking(true)?;
        self.local_addr = Some(socket.local_addr()?);
        self.socket = Some(socket);
        Ok(())
    }
}

async fn receive_loop(socket: tokio::net::UdpSocket, fleet: Arc<Fleet>, clock: Arc<dyn Clock>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, peer)) => {
                log::trace!("{} telemetry bytes from {}", len, peer);
                apply_datagram(&fleet, &buf[..len], clock.now_ms());
            }
            Err(e) => {
                log::warn!("Telemetry receive failed: {}", e);
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }
}

impl LifecycleNode for TelemetryListener {
    fn on_configure(&mut self) -> Result<()> {
        log::info!("Configuring telemetry listener on {}", self.bind_addr);
        self.bind()?;
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| FleetError::Lifecycle("telemetry listener needs a tokio runtime".to_string()))?;

        if self.socket.is_none() {
            self.bind()?;
        }
        let std_socket = self
            .socket
            .take()
            .ok_or_else(|| FleetError::Lifecycle("telemetry socket not bound".to_string()))?;

        let _guard = handle.enter();
        let socket = tokio::net::UdpSocket::from_std(std_socket)?;
        log::info!("Listening for telemetry on {}", socket.local_addr()?);

        let fleet = Arc::clone(&self.fleet);
        let clock = Arc::clone(&self.clock);
        self.task = Some(handle.spawn(receive_loop(socket, fleet, clock)));
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<()> {
        log::info!("Deactivating telemetry listener");
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<()> {
        log::info!("Cleaning up telemetry listener");
        self.socket = None;
        self.local_addr = None;
        self.base.set_state(State::Unconfigured);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RuntimeClock;
    use crate::config::FleetConfig;
    use crate::perception::TelemetryRecord;

    fn listener() -> (TelemetryListener, Arc<Fleet>) {
        let fleet = Arc::new(Fleet::from_config(&FleetConfig::default()).unwrap());
        let listener = TelemetryListener::new("127.0.0.1:0", Arc::clone(&fleet), Arc::new(RuntimeClock::new()));
        (listener, fleet)
    }

    #[test]
    fn activation_requires_runtime() {
        let (mut listener, _) = listener();
        listener.on_configure().unwrap();
        assert_eq!(listener.state(), State::Inactive);
        assert!(matches!(listener.on_activate(), Err(FleetError::Lifecycle(_))));
    }

    #[tokio::test]
    async fn received_records_update_the_fleet() {
        let (mut listener, fleet) = listener();
        listener.on_configure().unwrap();
        listener.on_activate().unwrap();
        assert_eq!(listener.state(), State::Active);

        let robot = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let record = TelemetryRecord {
            id: 12,
            x: 40.0,
            y: 20.0,
            theta: 0.0,
        };
        let target = listener.local_addr().unwrap();

        // Garbage first: must be skipped without stopping the loop
        robot.send_to(&[1, 2, 3], target).unwrap();
        robot.send_to(&record.encode(), target).unwrap();

        for _ in 0..100 {
            if fleet.contains(12) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(fleet.robot(12).unwrap().pose.point(), (40.0, 20.0));
        assert_eq!(fleet.ids().unwrap(), vec![12]);

        listener.on_deactivate().unwrap();
        listener.on_cleanup().unwrap();
        assert_eq!(listener.state(), State::Unconfigured);
    }
}
