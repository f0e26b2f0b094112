use anyhow::{bail, Context, Result};
use fleet_core::common::types::RobotId;
use fleet_core::config::FleetConfig;
use fleet_core::navigation::PlanDecision;
use fleet_core::FleetCore;
use std::env;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_CONFIG_PATH: &str = "fleet.toml";

/// Config path from `--config <path>`, `-c <path>` or the first bare argument
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    DEFAULT_CONFIG_PATH.to_string()
}

enum Console {
    Goto { id: RobotId, x: f64, y: f64 },
    List,
    Quit,
}

fn parse_line(line: &str) -> Result<Option<Console>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => Ok(None),
        ["goto", id, x, y] => Ok(Some(Console::Goto {
            id: id.parse().context("robot id")?,
            x: x.parse().context("target x")?,
            y: y.parse().context("target y")?,
        })),
        ["list"] => Ok(Some(Console::List)),
        ["quit"] | ["exit"] => Ok(Some(Console::Quit)),
        _ => bail!("unknown command '{}' (goto <id> <x> <y> | list | quit)", line.trim()),
    }
}

fn list_robots(core: &FleetCore) -> Result<()> {
    let now = core.coordinator().now_ms();
    for id in core.fleet().ids()? {
        let robot = core.fleet().robot(id)?;
        let (x, y) = robot.position(now);
        println!(
            "robot {:>4}  ({:>8.1}, {:>8.1})  {} reservation(s)",
            id,
            x,
            y,
            robot.ledger.active(now).count()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = if Path::new(&config_path).exists() {
        FleetConfig::from_file(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path))?
    } else {
        FleetConfig::default()
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level)).init();

    log::info!("fleet_node v{} starting", env!("CARGO_PKG_VERSION"));
    if !Path::new(&config_path).exists() {
        log::warn!("Config file {} not found, using defaults", config_path);
    }
    log::info!(
        "{} robot(s) configured, telemetry on {}, commands to port {}",
        config.robots.len(),
        config.network.telemetry_bind,
        config.network.command_port
    );

    let mut core = FleetCore::from_config(&config).context("failed to create fleet core")?;
    core.init().context("failed to start components")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(Some(Console::Goto { id, x, y })) => match core.plan_and_execute(id, x, y) {
                        Ok(PlanDecision::Hold) => println!("robot {} is already there", id),
                        Ok(PlanDecision::Commit(leg)) => {
                            println!("robot {}: driving to ({:.1}, {:.1})", id, leg.to.0, leg.to.1)
                        }
                        Ok(PlanDecision::Deflect { waypoint, conflict, .. }) => println!(
                            "robot {}: avoiding robot {} via ({:.1}, {:.1})",
                            id, conflict.owner, waypoint.0, waypoint.1
                        ),
                        Err(e) => log::error!("Robot {}: {}", id, e),
                    },
                    Ok(Some(Console::List)) => list_robots(&core)?,
                    Ok(Some(Console::Quit)) => break,
                    Ok(None) => {}
                    Err(e) => println!("{:#}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    core.shutdown().context("failed to stop components")?;
    log::info!("fleet_node stopped");
    Ok(())
}
