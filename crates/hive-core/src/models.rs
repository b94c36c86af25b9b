//! Core data models for the hive mesh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clamp a link weight into `[0, 1]`. NaN collapses to a dead link.
pub fn clamp_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        return 0.0;
    }
    weight.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneType {
    /// Can forward traffic for other drones
    Relay,
    #[default]
    Other,
}

/// Directed, weighted link from the owning drone to `target_drone_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneConnection {
    pub target_drone_id: String,
    /// Link quality in `[0, 1]`
    pub weight: f64,
}

impl DroneConnection {
    pub fn new(target_drone_id: impl Into<String>, weight: f64) -> Self {
        Self {
            target_drone_id: target_drone_id.into(),
            weight: clamp_weight(weight),
        }
    }
}

/// A mesh node and its outgoing links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    #[serde(default)]
    pub drone_type: DroneType,
    #[serde(default)]
    pub connections: Vec<DroneConnection>,
}

impl Drone {
    pub fn new(id: impl Into<String>, drone_type: DroneType) -> Self {
        Self {
            id: id.into(),
            drone_type,
            connections: Vec::new(),
        }
    }

    pub fn relay(id: impl Into<String>) -> Self {
        Self::new(id, DroneType::Relay)
    }

    pub fn is_relay(&self) -> bool {
        self.drone_type == DroneType::Relay
    }

    /// Builder-style link insertion, mostly for seeding fixtures.
    pub fn with_connection(mut self, target_drone_id: impl Into<String>, weight: f64) -> Self {
        self.set_connection(target_drone_id, weight);
        self
    }

    pub fn connection_to(&self, target_drone_id: &str) -> Option<&DroneConnection> {
        self.connections
            .iter()
            .find(|c| c.target_drone_id == target_drone_id)
    }

    pub fn has_connection_to(&self, target_drone_id: &str) -> bool {
        self.connection_to(target_drone_id).is_some()
    }

    /// Insert or overwrite the link to `target_drone_id`.
    ///
    /// Returns false for self-links, which are never stored.
    pub fn set_connection(&mut self, target_drone_id: impl Into<String>, weight: f64) -> bool {
        let target_drone_id = target_drone_id.into();
        if target_drone_id == self.id {
            return false;
        }
        match self
            .connections
            .iter_mut()
            .find(|c| c.target_drone_id == target_drone_id)
        {
            Some(existing) => existing.weight = clamp_weight(weight),
            None => self
                .connections
                .push(DroneConnection::new(target_drone_id, weight)),
        }
        true
    }

    /// Update the weight of an existing link only.
    pub fn update_weight(&mut self, target_drone_id: &str, weight: f64) -> bool {
        match self
            .connections
            .iter_mut()
            .find(|c| c.target_drone_id == target_drone_id)
        {
            Some(existing) => {
                existing.weight = clamp_weight(weight);
                true
            }
            None => false,
        }
    }

    pub fn remove_connection(&mut self, target_drone_id: &str) -> bool {
        let before = self.connections.len();
        self.connections
            .retain(|c| c.target_drone_id != target_drone_id);
        self.connections.len() != before
    }

    /// Enforce edge invariants on externally supplied link lists:
    /// weights clamped, self-links dropped, one link per target (last wins).
    pub fn normalize(&mut self) {
        let mut normalized: Vec<DroneConnection> = Vec::with_capacity(self.connections.len());
        for connection in self.connections.drain(..) {
            if connection.target_drone_id == self.id {
                continue;
            }
            let weight = clamp_weight(connection.weight);
            match normalized
                .iter_mut()
                .find(|c| c.target_drone_id == connection.target_drone_id)
            {
                Some(existing) => existing.weight = weight,
                None => normalized.push(DroneConnection {
                    target_drone_id: connection.target_drone_id,
                    weight,
                }),
            }
        }
        self.connections = normalized;
    }
}

/// A named group of drones under one mesh operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hive {
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub member_drone_ids: Vec<String>,
    /// Explicit ingress relays; empty means "every Relay-type drone"
    #[serde(default)]
    pub entry_relay_ids: Vec<String>,
}

impl Hive {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            created_at: Utc::now(),
            member_drone_ids: Vec::new(),
            entry_relay_ids: Vec::new(),
        }
    }

    pub fn has_member(&self, drone_id: &str) -> bool {
        self.member_drone_ids.iter().any(|id| id == drone_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Move,
    Stop,
    GetTelemetry,
    ChangeConnection,
    Relay,
}

/// Command issued to a drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Empty until the command is stamped for delivery
    #[serde(default)]
    pub command_id: String,
    pub target_drone_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: CommandPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandPayload {
    /// Fly to a position
    Move {
        lat: f64,
        lon: f64,
        altitude_m: f64,
    },
    Stop,
    /// Ask the drone to report telemetry on its next poll
    GetTelemetry,
    /// Retune a single outgoing link
    ChangeConnection {
        peer_drone_id: String,
        weight: f64,
    },
    /// Forward `final_command` one hop further along `route_path`
    Relay(RelayPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub final_destination_drone_id: String,
    /// `None` when the next hop is the final destination itself
    pub next_hop_drone_id: Option<String>,
    pub final_command: Box<Command>,
    pub route_path: Vec<String>,
}

impl Command {
    /// Create a stamped command addressed to `target_drone_id`.
    pub fn new(target_drone_id: impl Into<String>, payload: CommandPayload) -> Self {
        let mut command = Self {
            command_id: String::new(),
            target_drone_id: target_drone_id.into(),
            timestamp: None,
            payload,
        };
        command.stamp();
        command
    }

    pub fn command_type(&self) -> CommandType {
        match self.payload {
            CommandPayload::Move { .. } => CommandType::Move,
            CommandPayload::Stop => CommandType::Stop,
            CommandPayload::GetTelemetry => CommandType::GetTelemetry,
            CommandPayload::ChangeConnection { .. } => CommandType::ChangeConnection,
            CommandPayload::Relay(_) => CommandType::Relay,
        }
    }

    /// Assign an id and timestamp where missing.
    pub fn stamp(&mut self) {
        if self.command_id.trim().is_empty() {
            self.command_id = next_command_id();
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
    }
}

pub fn next_command_id() -> String {
    format!("CMD-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// Telemetry reported by a drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub drone_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    #[serde(default)]
    pub battery_pct: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Radio interference affecting a hive's airspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interference {
    pub interference_id: String,
    pub hive_id: String,
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
    /// Severity in `[0, 1]`
    pub strength: f64,
    pub created_at: DateTime<Utc>,
}
