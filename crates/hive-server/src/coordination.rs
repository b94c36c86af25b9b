//! Drone/hive coordination: joins, membership-gated neighbor queries, command
//! polling and routed command submission.

use hive_core::{Command, HiveError, HiveResult};
use serde::{Deserialize, Serialize};

use crate::directory::{CommandQueue, DroneDirectory, HiveDirectory};
use crate::mesh_router::{MeshRouter, RouteResult};
use crate::state::store::JoinOutcome;
use std::collections::HashSet;

/// Per-drone result of a batch join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResult {
    pub drone_id: String,
    pub success: bool,
    /// True when the drone was already in this hive
    #[serde(default)]
    pub already_member: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct CoordinationService {
    drones: DroneDirectory,
    hives: HiveDirectory,
    commands: CommandQueue,
    router: MeshRouter,
}

impl CoordinationService {
    pub fn new(
        drones: DroneDirectory,
        hives: HiveDirectory,
        commands: CommandQueue,
        router: MeshRouter,
    ) -> Self {
        Self {
            drones,
            hives,
            commands,
            router,
        }
    }

    /// Add a drone to a hive. Rejoining the same hive is a no-op success.
    pub fn join_drone(&self, hive_id: &str, drone_id: &str) -> HiveResult<JoinOutcome> {
        if !self.hives.exists(hive_id) {
            return Err(HiveError::HiveNotFound {
                hive_id: hive_id.to_string(),
            });
        }
        let outcome = self.hives.add_drone_to_hive(hive_id, drone_id)?;
        if outcome == JoinOutcome::Joined {
            tracing::info!("Drone {} joined hive {}", drone_id, hive_id);
        }
        Ok(outcome)
    }

    pub fn batch_join(&self, hive_id: &str, drone_ids: &[String]) -> Vec<JoinResult> {
        drone_ids
            .iter()
            .map(|drone_id| match self.join_drone(hive_id, drone_id) {
                Ok(outcome) => JoinResult {
                    drone_id: drone_id.clone(),
                    success: true,
                    already_member: outcome == JoinOutcome::AlreadyMember,
                    error: None,
                },
                Err(err) => {
                    tracing::warn!("Join of {} to hive {} rejected: {}", drone_id, hive_id, err);
                    JoinResult {
                        drone_id: drone_id.clone(),
                        success: false,
                        already_member: false,
                        error: Some(err.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Outgoing link targets of `drone_id` that are members of `hive_id`.
    ///
    /// Links to drones outside the hive are never reported.
    pub fn get_connected_drones(&self, hive_id: &str, drone_id: &str) -> HiveResult<Vec<String>> {
        let hive = self.hives.get_by_id(hive_id).ok_or_else(|| HiveError::HiveNotFound {
            hive_id: hive_id.to_string(),
        })?;
        let drone = self
            .drones
            .get_by_id(drone_id)
            .ok_or_else(|| HiveError::DroneNotFound {
                drone_id: drone_id.to_string(),
            })?;
        if !hive.has_member(drone_id) {
            return Err(HiveError::NotHiveMember {
                drone_id: drone_id.to_string(),
                hive_id: hive_id.to_string(),
            });
        }

        Ok(drone
            .connections
            .into_iter()
            .filter(|c| hive.has_member(&c.target_drone_id))
            .map(|c| c.target_drone_id)
            .collect())
    }

    pub fn get_next_command(&self, drone_id: &str) -> Option<Command> {
        self.commands.dequeue(drone_id)
    }

    pub fn get_all_commands(&self, drone_id: &str) -> Vec<Command> {
        self.commands.peek_all(drone_id)
    }

    /// Route a command through the mesh to its target drone.
    pub fn route_command(&self, command: Command, minimum_weight: f64) -> HiveResult<RouteResult> {
        if !self.drones.exists(&command.target_drone_id) {
            return Err(HiveError::DroneNotFound {
                drone_id: command.target_drone_id,
            });
        }
        Ok(self.router.route(command, minimum_weight))
    }

    /// Configure a hive's entry relays. Every relay must be a member.
    pub fn set_entry_relays(&self, hive_id: &str, relay_ids: Vec<String>) -> HiveResult<()> {
        let hive = self.hives.get_by_id(hive_id).ok_or_else(|| HiveError::HiveNotFound {
            hive_id: hive_id.to_string(),
        })?;
        if let Some(outsider) = relay_ids.iter().find(|id| !hive.has_member(id)) {
            return Err(HiveError::NotHiveMember {
                drone_id: outsider.clone(),
                hive_id: hive_id.to_string(),
            });
        }
        let mut seen = HashSet::new();
        let mut relay_ids = relay_ids;
        relay_ids.retain(|id| seen.insert(id.clone()));
        tracing::info!("Hive {} entry relays: {:?}", hive_id, relay_ids);
        self.hives.set_entry_relays(hive_id, relay_ids);
        Ok(())
    }
}
