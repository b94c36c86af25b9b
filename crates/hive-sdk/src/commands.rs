//! Command dispatch on the drone side.
//!
//! Every payload variant has its own handler method, so adding a variant is a
//! compile error until each drone implementation handles it.

use hive_core::{Command, CommandPayload, RelayPayload};
use serde::{Deserialize, Serialize};

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command_id: String,
    pub accepted: bool,
    pub reason: Option<String>,
}

impl CommandOutcome {
    pub fn accepted(command_id: &str) -> Self {
        Self {
            command_id: command_id.to_string(),
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(command_id: &str, reason: impl Into<String>) -> Self {
        Self {
            command_id: command_id.to_string(),
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Trait for handling commands from the hive.
pub trait CommandHandler {
    fn on_move(&mut self, lat: f64, lon: f64, altitude_m: f64) -> Result<(), String>;

    fn on_stop(&mut self) -> Result<(), String>;

    fn on_get_telemetry(&mut self) -> Result<(), String>;

    fn on_change_connection(&mut self, peer_drone_id: &str, weight: f64) -> Result<(), String>;

    /// This drone is an intermediate hop. The server has already queued the
    /// follow-up on the next hop; the handler only performs the local forward.
    fn on_relay(&mut self, relay: &RelayPayload) -> Result<(), String>;
}

pub fn dispatch<H: CommandHandler + ?Sized>(handler: &mut H, command: &Command) -> CommandOutcome {
    let result = match &command.payload {
        CommandPayload::Move {
            lat,
            lon,
            altitude_m,
        } => handler.on_move(*lat, *lon, *altitude_m),
        CommandPayload::Stop => handler.on_stop(),
        CommandPayload::GetTelemetry => handler.on_get_telemetry(),
        CommandPayload::ChangeConnection {
            peer_drone_id,
            weight,
        } => handler.on_change_connection(peer_drone_id, *weight),
        CommandPayload::Relay(relay) => handler.on_relay(relay),
    };
    match result {
        Ok(()) => CommandOutcome::accepted(&command.command_id),
        Err(reason) => {
            tracing::warn!("Command {} rejected: {}", command.command_id, reason);
            CommandOutcome::rejected(&command.command_id, reason)
        }
    }
}
