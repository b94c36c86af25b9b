//! Hive directory.

use hive_core::{Hive, HiveResult};
use std::sync::Arc;

use crate::state::store::JoinOutcome;
use crate::state::SwarmStore;

#[derive(Clone)]
pub struct HiveDirectory {
    store: Arc<SwarmStore>,
}

impl HiveDirectory {
    pub fn new(store: Arc<SwarmStore>) -> Self {
        Self { store }
    }

    pub fn get_by_id(&self, hive_id: &str) -> Option<Hive> {
        self.store.get_hive(hive_id)
    }

    pub fn get_all(&self) -> Vec<Hive> {
        self.store.get_all_hives()
    }

    pub fn exists(&self, hive_id: &str) -> bool {
        self.store.hive_exists(hive_id)
    }

    /// False when a hive with this id already exists.
    pub fn add(&self, hive: Hive) -> bool {
        self.store.create_hive(hive)
    }

    pub fn remove(&self, hive_id: &str) -> bool {
        self.store.remove_hive(hive_id)
    }

    pub fn get_drone_ids(&self, hive_id: &str) -> Vec<String> {
        self.store.hive_member_ids(hive_id)
    }

    pub fn hive_of(&self, drone_id: &str) -> Option<String> {
        self.store.hive_of(drone_id)
    }

    pub fn add_drone_to_hive(&self, hive_id: &str, drone_id: &str) -> HiveResult<JoinOutcome> {
        self.store.add_drone_to_hive(hive_id, drone_id)
    }

    pub fn remove_drone_from_hive(&self, hive_id: &str, drone_id: &str) -> bool {
        self.store.remove_drone_from_hive(hive_id, drone_id)
    }

    pub fn set_entry_relays(&self, hive_id: &str, relay_ids: Vec<String>) -> bool {
        self.store.set_entry_relays(hive_id, relay_ids)
    }

    /// Explicitly configured entry relays only; empty means "use the default".
    pub fn get_entry_relays(&self, hive_id: &str) -> Vec<String> {
        self.store.entry_relays(hive_id)
    }
}
