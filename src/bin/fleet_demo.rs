//! Two robots on a line: robot 1 drives through idle robot 2 and has to go
//! around it. Commands are recorded instead of sent.

use anyhow::{Context, Result};
use fleet_core::comms::RecordingSink;
use fleet_core::common::types::Pose2D;
use fleet_core::common::RuntimeClock;
use fleet_core::config::FleetConfig;
use fleet_core::FleetCore;
use std::sync::Arc;
use std::time::Duration;

const TARGET: (f64, f64) = (100.0, 0.0);
const TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = FleetConfig::default();
    config.planner.settle_delay_ms = 250.0;
    config.planner.retry_margin_ms = 100.0;

    let sink = Arc::new(RecordingSink::new());
    let core = FleetCore::new(&config, sink.clone(), Arc::new(RuntimeClock::new()))
        .context("failed to create fleet core")?;

    core.fleet().spawn(1, Pose2D::new(0.0, 0.0, 0.0))?;
    core.fleet().spawn(2, Pose2D::new(50.0, 0.0, 0.0))?;

    let started = tokio::time::Instant::now();
    let decision = core.plan_and_execute(1, TARGET.0, TARGET.1)?;
    log::info!("First decision: {:?}", decision);

    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;

        let now = core.coordinator().now_ms();
        let robot = core.fleet().robot(1)?;
        let arrived = robot
            .projection()
            .is_some_and(|p| p.pose.distance_to(TARGET) < 1e-6 && p.arrival_ms <= now);
        if arrived {
            break;
        }
        if started.elapsed() > TIMEOUT {
            anyhow::bail!("robot 1 did not reach {:?} within {:?}", TARGET, TIMEOUT);
        }
    }

    // Let the final stop go out
    tokio::time::sleep(Duration::from_millis(100)).await;

    for sent in sink.sent() {
        println!(
            "{:>7.0} ms  robot {}  {:?}  {:02x?}",
            sent.sent_at.duration_since(started).as_secs_f64() * 1000.0,
            sent.robot,
            sent.command,
            sent.command.encode()
        );
    }
    Ok(())
}
