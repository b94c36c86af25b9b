//! Seed a hive on a running server, build a topology and route a command.
//!
//! Drone 1 is registered as the hive's entry relay.

use anyhow::{Context, Result};
use clap::Parser;
use hive_cli::hive_creation_status;
use hive_core::{Command, CommandPayload, Drone, DroneType, TopologyKind};
use reqwest::Client;
use serde_json::{json, Value};

/// Build a demo mesh and route a command through it
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Hive server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Hive identifier
    #[arg(long, default_value = "DEMO-HIVE")]
    hive: String,

    /// Number of drones to create
    #[arg(long, default_value_t = 6)]
    drones: usize,

    /// mesh, star or dual_star
    #[arg(long, default_value = "star")]
    topology: TopologyKind,

    /// Link weight before jitter
    #[arg(long, default_value_t = 0.8)]
    weight: f64,

    /// Minimum link weight for routing
    #[arg(long, default_value_t = 0.5)]
    min_weight: f64,
}

fn drone_id(index: usize) -> String {
    format!("DEMO-{:02}", index)
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        anyhow::bail!("{}: {}", status, body);
    }
    Ok(body)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.drones < 3 {
        anyhow::bail!("need at least 3 drones");
    }
    let client = Client::new();
    let base = args.url.trim_end_matches('/');

    println!("Seeding hive {} on {}...", args.hive, base);
    let created = client
        .post(format!("{}/v1/hives", base))
        .json(&json!({ "id": args.hive }))
        .send()
        .await
        .with_context(|| format!("creating hive {}", args.hive))?;
    if !hive_creation_status(created.status())? {
        println!("  Hive {} already exists", args.hive);
    }

    let ids: Vec<String> = (1..=args.drones).map(drone_id).collect();
    for (i, id) in ids.iter().enumerate() {
        let kind = if i < 2 { DroneType::Relay } else { DroneType::Other };
        send(client.put(format!("{}/v1/drones", base)).json(&Drone::new(id.clone(), kind)))
            .await
            .with_context(|| format!("registering {}", id))?;
    }

    let joined = send(
        client
            .post(format!("{}/v1/hives/{}/drones", base, args.hive))
            .json(&json!({ "drone_ids": ids })),
    )
    .await?;
    println!("  Joined: {} (failed: {})", joined["joined"], joined["failed"]);

    send(
        client
            .put(format!("{}/v1/hives/{}/entry-relays", base, args.hive))
            .json(&json!({ "relay_ids": [ids[0]] })),
    )
    .await?;

    let report = send(
        client
            .post(format!("{}/v1/hives/{}/topology", base, args.hive))
            .json(&json!({
                "topology": args.topology,
                "hub_id": ids[0],
                "hub2_id": ids[1],
                "weight": args.weight,
            })),
    )
    .await?;
    println!(
        "  Topology {}: removed {}, created {}",
        args.topology, report["removed_edges"], report["created_edges"]
    );
    if let Some(warning) = report["warning"].as_str() {
        println!("  Warning: {}", warning);
    }

    let snapshot = send(client.get(format!("{}/v1/hives/{}/connectivity", base, args.hive))).await?;
    println!(
        "  Components: {}, fully connected: {}, edges: {}",
        snapshot["connected_components"],
        snapshot["is_fully_connected"],
        snapshot["edge_stats"]["edge_count"]
    );

    let target = ids[ids.len() - 1].clone();
    let command = Command::new(
        target.clone(),
        CommandPayload::Move {
            lat: 33.6850,
            lon: -117.8260,
            altitude_m: 60.0,
        },
    );
    let routed = send(
        client
            .post(format!("{}/v1/commands/route", base))
            .json(&json!({ "command": command, "minimum_weight": args.min_weight })),
    )
    .await?;

    println!();
    if routed["success"] == Value::Bool(true) {
        println!("Routed MOVE to {}", target);
        println!("  Route: {}", routed["route"]);
        println!("  Hops: {}, relays: {}", routed["hop_count"], routed["relays_used"]);
        println!("  Weakest link: {}", routed["minimum_link_weight"]);
    } else {
        println!("Could not route to {}: {}", target, routed["error"]);
    }
    Ok(())
}
