//! Drone directory.

use hive_core::Drone;
use std::sync::Arc;

use crate::state::SwarmStore;

#[derive(Clone)]
pub struct DroneDirectory {
    store: Arc<SwarmStore>,
}

impl DroneDirectory {
    pub fn new(store: Arc<SwarmStore>) -> Self {
        Self { store }
    }

    pub fn get_by_id(&self, drone_id: &str) -> Option<Drone> {
        self.store.get_drone(drone_id)
    }

    pub fn get_all(&self) -> Vec<Drone> {
        self.store.get_all_drones()
    }

    pub fn get_many(&self, drone_ids: &[String]) -> Vec<Drone> {
        self.store.get_drones(drone_ids)
    }

    pub fn exists(&self, drone_id: &str) -> bool {
        self.store.drone_exists(drone_id)
    }

    /// Upsert. Returns true when the drone was created.
    pub fn add(&self, drone: Drone) -> bool {
        self.store.upsert_drone(drone)
    }

    pub fn update(&self, drone: Drone) -> bool {
        self.store.update_drone(drone)
    }

    pub fn remove(&self, drone_id: &str) -> bool {
        self.store.remove_drone(drone_id)
    }

    pub fn get_by_hive_id(&self, hive_id: &str) -> Vec<Drone> {
        self.store.drones_in_hive(hive_id)
    }
}
