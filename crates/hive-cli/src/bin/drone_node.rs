//! Run one drone against the hive server.
//!
//! Registers (retrying with a fixed delay), optionally joins a hive, then
//! polls its command queue and reports telemetry until interrupted.

use clap::Parser;
use hive_cli::{init_tracing, parse_link, sim::SimulatedDrone};
use hive_core::{Drone, DroneType};
use hive_sdk::{dispatch, HiveClient, RetryPolicy};
use std::time::Duration;
use tokio::time;

/// Run a simulated mesh drone
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Hive server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Drone identifier
    #[arg(long, default_value = "DRONE001")]
    drone_id: String,

    /// Register as a relay drone
    #[arg(long)]
    relay: bool,

    /// Outgoing link as PEER=WEIGHT (repeatable)
    #[arg(long = "link", value_parser = parse_link)]
    links: Vec<(String, f64)>,

    /// Hive to join after registering
    #[arg(long)]
    hive: Option<String>,

    /// Starting latitude
    #[arg(long, default_value_t = 33.6846)]
    lat: f64,

    /// Starting longitude
    #[arg(long, default_value_t = -117.8265)]
    lon: f64,

    /// Starting altitude in meters
    #[arg(long, default_value_t = 0.0)]
    altitude: f64,

    /// Command poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// Report telemetry every N polls
    #[arg(long, default_value_t = 5)]
    telemetry_every: u32,

    /// Registration attempts before giving up
    #[arg(long, default_value_t = 5)]
    register_attempts: u32,

    /// Delay between registration attempts in milliseconds
    #[arg(long, default_value_t = 2000)]
    register_delay_ms: u64,

    /// Stop after this many seconds (runs until Ctrl-C when unset)
    #[arg(long)]
    duration: Option<u64>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("drone_node=info", args.json_logs)?;

    let mut drone = Drone::new(
        args.drone_id.clone(),
        if args.relay { DroneType::Relay } else { DroneType::Other },
    );
    for (peer, weight) in &args.links {
        drone.set_connection(peer.clone(), *weight);
    }

    let mut client = HiveClient::new(&args.url);
    let policy = RetryPolicy {
        max_attempts: args.register_attempts,
        delay: Duration::from_millis(args.register_delay_ms),
    };
    if let Err(err) = client.register_with_retry(&drone, policy).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }

    if let Some(hive_id) = &args.hive {
        match client.join_hive(hive_id).await {
            Ok(()) => tracing::info!("Joined hive {}", hive_id),
            Err(err) => tracing::warn!("Could not join hive {}: {}", hive_id, err),
        }
    }

    let mut sim = SimulatedDrone::new(args.lat, args.lon, args.altitude);
    for (peer, weight) in &args.links {
        sim.links.insert(peer.clone(), *weight);
    }

    let mut ticker = time::interval(Duration::from_millis(args.poll_ms.max(50)));
    let deadline = args
        .duration
        .map(|secs| time::Instant::now() + Duration::from_secs(secs));
    let mut tick: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
        if deadline.is_some_and(|d| time::Instant::now() >= d) {
            break;
        }
        tick = tick.wrapping_add(1);

        // Drain everything queued since the last poll
        loop {
            match client.next_command().await {
                Ok(Some(command)) => {
                    let outcome = dispatch(&mut sim, &command);
                    tracing::debug!(
                        "{} {:?}: accepted={}",
                        outcome.command_id,
                        command.command_type(),
                        outcome.accepted
                    );
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("Command poll failed: {}", err);
                    break;
                }
            }
        }

        sim.step();
        if sim.telemetry_requested || tick % args.telemetry_every.max(1) == 0 {
            match client
                .send_telemetry(sim.lat, sim.lon, sim.altitude_m, Some(sim.battery_pct))
                .await
            {
                Ok(()) => sim.telemetry_requested = false,
                Err(err) => tracing::warn!("Telemetry failed: {}", err),
            }
        }
    }

    tracing::info!(
        "Drone {} stopping ({} relays forwarded)",
        args.drone_id,
        sim.relayed
    );
    Ok(())
}
