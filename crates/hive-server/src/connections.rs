//! Point edits of individual link weights.
//!
//! Reads from the directory are copies, so every edit ends with an explicit
//! write back of the modified drone.

use hive_core::clamp_weight;
use serde::{Deserialize, Serialize};

use crate::directory::DroneDirectory;

/// One requested weight change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightUpdate {
    pub from_drone_id: String,
    pub to_drone_id: String,
    pub weight: f64,
}

/// Per-item result of a batch weight change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightUpdateOutcome {
    pub from_drone_id: String,
    pub to_drone_id: String,
    pub weight: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ConnectionManager {
    drones: DroneDirectory,
}

impl ConnectionManager {
    pub fn new(drones: DroneDirectory) -> Self {
        Self { drones }
    }

    /// Change the weight of an existing `from -> to` link.
    ///
    /// The reverse link is updated too when it exists. Fails when `from` is
    /// unknown or has no link to `to`.
    pub fn update_weight(&self, from_drone_id: &str, to_drone_id: &str, weight: f64) -> bool {
        let Some(mut from) = self.drones.get_by_id(from_drone_id) else {
            return false;
        };
        if !from.update_weight(to_drone_id, weight) || !self.drones.update(from) {
            return false;
        }

        if let Some(mut to) = self.drones.get_by_id(to_drone_id) {
            if to.update_weight(from_drone_id, weight) {
                self.drones.update(to);
            }
        }
        tracing::debug!(
            "Link {} <-> {} set to {:.3}",
            from_drone_id,
            to_drone_id,
            clamp_weight(weight)
        );
        true
    }

    /// Remove the single directed link `from -> to`.
    pub fn remove_connection(&self, from_drone_id: &str, to_drone_id: &str) -> bool {
        let Some(mut from) = self.drones.get_by_id(from_drone_id) else {
            return false;
        };
        from.remove_connection(to_drone_id) && self.drones.update(from)
    }

    pub fn get_weight(&self, from_drone_id: &str, to_drone_id: &str) -> Option<f64> {
        self.drones
            .get_by_id(from_drone_id)?
            .connection_to(to_drone_id)
            .map(|c| c.weight)
    }

    /// Apply a batch of weight changes. One bad item never aborts the rest.
    pub fn degrade(&self, updates: &[WeightUpdate]) -> Vec<WeightUpdateOutcome> {
        updates
            .iter()
            .map(|update| {
                let error = if !update.weight.is_finite() {
                    Some("Weight must be a finite number".to_string())
                } else if !self.drones.exists(&update.from_drone_id) {
                    Some(format!("Drone {} not found", update.from_drone_id))
                } else if !self.update_weight(&update.from_drone_id, &update.to_drone_id, update.weight) {
                    Some(format!(
                        "No link from {} to {}",
                        update.from_drone_id, update.to_drone_id
                    ))
                } else {
                    None
                };
                if let Some(reason) = &error {
                    tracing::warn!("Weight update skipped: {}", reason);
                }
                WeightUpdateOutcome {
                    from_drone_id: update.from_drone_id.clone(),
                    to_drone_id: update.to_drone_id.clone(),
                    weight: clamp_weight(update.weight),
                    success: error.is_none(),
                    error,
                }
            })
            .collect()
    }
}
