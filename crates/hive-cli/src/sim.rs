//! Simulated drone that executes hive commands in memory.

use hive_core::RelayPayload;
use hive_sdk::CommandHandler;
use std::collections::BTreeMap;

/// Speed used to close the gap toward a move target on each tick.
const STEP_DEG: f64 = 0.0005;

#[derive(Debug, Clone)]
pub struct SimulatedDrone {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub battery_pct: f64,
    target: Option<(f64, f64, f64)>,
    /// Local view of outgoing link weights
    pub links: BTreeMap<String, f64>,
    /// Set by GET_TELEMETRY; cleared once reported
    pub telemetry_requested: bool,
    pub relayed: usize,
}

impl SimulatedDrone {
    pub fn new(lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m,
            battery_pct: 100.0,
            target: None,
            links: BTreeMap::new(),
            telemetry_requested: false,
            relayed: 0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Advance toward the current move target.
    pub fn step(&mut self) {
        let Some((lat, lon, altitude_m)) = self.target else {
            return;
        };
        let d_lat = lat - self.lat;
        let d_lon = lon - self.lon;
        let distance = (d_lat * d_lat + d_lon * d_lon).sqrt();
        if distance <= STEP_DEG {
            self.lat = lat;
            self.lon = lon;
            self.altitude_m = altitude_m;
            self.target = None;
        } else {
            self.lat += d_lat / distance * STEP_DEG;
            self.lon += d_lon / distance * STEP_DEG;
            self.altitude_m += (altitude_m - self.altitude_m) * 0.2;
        }
        self.battery_pct = (self.battery_pct - 0.05).max(0.0);
    }
}

impl CommandHandler for SimulatedDrone {
    fn on_move(&mut self, lat: f64, lon: f64, altitude_m: f64) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(format!("target ({}, {}) out of range", lat, lon));
        }
        if altitude_m < 0.0 {
            return Err("negative altitude".to_string());
        }
        tracing::info!("Moving to ({:.5}, {:.5}) at {:.0}m", lat, lon, altitude_m);
        self.target = Some((lat, lon, altitude_m));
        Ok(())
    }

    fn on_stop(&mut self) -> Result<(), String> {
        tracing::info!("Holding position");
        self.target = None;
        Ok(())
    }

    fn on_get_telemetry(&mut self) -> Result<(), String> {
        self.telemetry_requested = true;
        Ok(())
    }

    fn on_change_connection(&mut self, peer_drone_id: &str, weight: f64) -> Result<(), String> {
        tracing::info!("Link to {} now {:.2}", peer_drone_id, weight);
        self.links
            .insert(peer_drone_id.to_string(), hive_core::clamp_weight(weight));
        Ok(())
    }

    fn on_relay(&mut self, relay: &RelayPayload) -> Result<(), String> {
        let next = relay
            .next_hop_drone_id
            .as_deref()
            .unwrap_or(&relay.final_destination_drone_id);
        tracing::info!(
            "Forwarding {:?} for {} to {}",
            relay.final_command.command_type(),
            relay.final_destination_drone_id,
            next
        );
        self.relayed += 1;
        Ok(())
    }
}
