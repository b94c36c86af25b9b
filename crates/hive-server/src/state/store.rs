//! In-memory swarm store using DashMap.
//!
//! Each concern lives in its own lock domain: drones, hive membership,
//! commands, interferences and telemetry. No method holds locks from two
//! domains at once. Every read hands out an owned copy; callers persist
//! changes through an explicit write method.

use dashmap::DashMap;
use hive_core::{Command, Drone, Hive, HiveError, HiveResult, Interference, Telemetry};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Outcome of a successful hive join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// Drone was already a member of this hive; nothing changed
    AlreadyMember,
}

#[derive(Debug, Default)]
struct Membership {
    hives: HashMap<String, Hive>,
    /// drone id -> hive id
    drone_hive: HashMap<String, String>,
}

/// Authoritative swarm state shared by every service.
pub struct SwarmStore {
    drones: DashMap<String, Drone>,
    membership: RwLock<Membership>,
    commands: DashMap<String, VecDeque<Command>>,
    interferences: DashMap<String, Interference>,
    /// drone id -> interference ids announced to it
    interference_deliveries: DashMap<String, Vec<String>>,
    telemetry: DashMap<String, VecDeque<Telemetry>>,
    telemetry_history: usize,
}

impl Default for SwarmStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SwarmStore {
    pub fn new(telemetry_history: usize) -> Self {
        Self {
            drones: DashMap::new(),
            membership: RwLock::new(Membership::default()),
            commands: DashMap::new(),
            interferences: DashMap::new(),
            interference_deliveries: DashMap::new(),
            telemetry: DashMap::new(),
            telemetry_history: telemetry_history.max(1),
        }
    }

    fn membership(&self) -> RwLockReadGuard<'_, Membership> {
        self.membership.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn membership_mut(&self) -> RwLockWriteGuard<'_, Membership> {
        self.membership.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== DRONES ==========

    /// Insert or fully replace a drone. Returns true when the id was new.
    pub fn upsert_drone(&self, mut drone: Drone) -> bool {
        drone.normalize();
        self.drones.insert(drone.id.clone(), drone).is_none()
    }

    /// Overwrite an existing drone. Unknown ids are not created.
    pub fn update_drone(&self, mut drone: Drone) -> bool {
        drone.normalize();
        match self.drones.get_mut(&drone.id) {
            Some(mut entry) => {
                *entry = drone;
                true
            }
            None => false,
        }
    }

    pub fn get_drone(&self, drone_id: &str) -> Option<Drone> {
        self.drones.get(drone_id).map(|r| r.value().clone())
    }

    pub fn drone_exists(&self, drone_id: &str) -> bool {
        self.drones.contains_key(drone_id)
    }

    pub fn get_all_drones(&self) -> Vec<Drone> {
        let mut drones: Vec<Drone> = self.drones.iter().map(|r| r.value().clone()).collect();
        drones.sort_by(|a, b| a.id.cmp(&b.id));
        drones
    }

    /// Copies of the requested drones that exist, in request order.
    pub fn get_drones(&self, drone_ids: &[String]) -> Vec<Drone> {
        drone_ids.iter().filter_map(|id| self.get_drone(id)).collect()
    }

    pub fn drone_count(&self) -> usize {
        self.drones.len()
    }

    /// Remove a drone and cascade to its membership, commands and telemetry.
    ///
    /// Links other drones hold toward it are left in place.
    pub fn remove_drone(&self, drone_id: &str) -> bool {
        if self.drones.remove(drone_id).is_none() {
            return false;
        }
        {
            let mut membership = self.membership_mut();
            if let Some(hive_id) = membership.drone_hive.remove(drone_id) {
                if let Some(hive) = membership.hives.get_mut(&hive_id) {
                    hive.member_drone_ids.retain(|id| id != drone_id);
                    hive.entry_relay_ids.retain(|id| id != drone_id);
                }
            }
        }
        self.commands.remove(drone_id);
        self.telemetry.remove(drone_id);
        self.interference_deliveries.remove(drone_id);
        true
    }

    // ========== HIVES ==========

    /// Register a new hive. Membership starts empty regardless of the input.
    pub fn create_hive(&self, mut hive: Hive) -> bool {
        hive.member_drone_ids.clear();
        hive.entry_relay_ids.clear();
        let mut membership = self.membership_mut();
        if membership.hives.contains_key(&hive.id) {
            return false;
        }
        membership.hives.insert(hive.id.clone(), hive);
        true
    }

    pub fn get_hive(&self, hive_id: &str) -> Option<Hive> {
        self.membership().hives.get(hive_id).cloned()
    }

    pub fn hive_exists(&self, hive_id: &str) -> bool {
        self.membership().hives.contains_key(hive_id)
    }

    pub fn get_all_hives(&self) -> Vec<Hive> {
        let mut hives: Vec<Hive> = self.membership().hives.values().cloned().collect();
        hives.sort_by(|a, b| a.id.cmp(&b.id));
        hives
    }

    /// Delete a hive, releasing every member and dropping its interferences.
    pub fn remove_hive(&self, hive_id: &str) -> bool {
        {
            let mut membership = self.membership_mut();
            let Some(hive) = membership.hives.remove(hive_id) else {
                return false;
            };
            for drone_id in &hive.member_drone_ids {
                membership.drone_hive.remove(drone_id);
            }
        }
        self.interferences.retain(|_, i| i.hive_id != hive_id);
        true
    }

    /// Add a drone to a hive. Membership is exclusive.
    ///
    /// Existence is checked under the membership lock so a concurrent
    /// `remove_drone` cannot leave a member behind.
    pub fn add_drone_to_hive(&self, hive_id: &str, drone_id: &str) -> HiveResult<JoinOutcome> {
        let mut membership = self.membership_mut();
        if !self.drones.contains_key(drone_id) {
            return Err(HiveError::DroneNotFound {
                drone_id: drone_id.to_string(),
            });
        }
        if !membership.hives.contains_key(hive_id) {
            return Err(HiveError::HiveNotFound {
                hive_id: hive_id.to_string(),
            });
        }
        match membership.drone_hive.get(drone_id) {
            Some(current) if current == hive_id => return Ok(JoinOutcome::AlreadyMember),
            Some(current) => {
                return Err(HiveError::AlreadyInHive {
                    drone_id: drone_id.to_string(),
                    hive_id: current.clone(),
                })
            }
            None => {}
        }
        membership
            .drone_hive
            .insert(drone_id.to_string(), hive_id.to_string());
        if let Some(hive) = membership.hives.get_mut(hive_id) {
            hive.member_drone_ids.push(drone_id.to_string());
        }
        Ok(JoinOutcome::Joined)
    }

    pub fn remove_drone_from_hive(&self, hive_id: &str, drone_id: &str) -> bool {
        let mut membership = self.membership_mut();
        if membership.drone_hive.get(drone_id).map(String::as_str) != Some(hive_id) {
            return false;
        }
        membership.drone_hive.remove(drone_id);
        if let Some(hive) = membership.hives.get_mut(hive_id) {
            hive.member_drone_ids.retain(|id| id != drone_id);
            hive.entry_relay_ids.retain(|id| id != drone_id);
        }
        true
    }

    pub fn hive_of(&self, drone_id: &str) -> Option<String> {
        self.membership().drone_hive.get(drone_id).cloned()
    }

    pub fn hive_member_ids(&self, hive_id: &str) -> Vec<String> {
        self.membership()
            .hives
            .get(hive_id)
            .map(|h| h.member_drone_ids.clone())
            .unwrap_or_default()
    }

    pub fn drones_in_hive(&self, hive_id: &str) -> Vec<Drone> {
        let member_ids = self.hive_member_ids(hive_id);
        self.get_drones(&member_ids)
    }

    /// Replace a hive's explicit entry relays. Empty restores the default.
    pub fn set_entry_relays(&self, hive_id: &str, relay_ids: Vec<String>) -> bool {
        let mut membership = self.membership_mut();
        match membership.hives.get_mut(hive_id) {
            Some(hive) => {
                hive.entry_relay_ids = relay_ids;
                true
            }
            None => false,
        }
    }

    pub fn entry_relays(&self, hive_id: &str) -> Vec<String> {
        self.membership()
            .hives
            .get(hive_id)
            .map(|h| h.entry_relay_ids.clone())
            .unwrap_or_default()
    }

    // ========== COMMANDS ==========

    pub fn enqueue_command(&self, command: Command) {
        self.commands
            .entry(command.target_drone_id.clone())
            .or_default()
            .push_back(command);
    }

    /// Pop the oldest pending command for a drone.
    pub fn dequeue_command(&self, drone_id: &str) -> Option<Command> {
        self.commands
            .get_mut(drone_id)
            .and_then(|mut queue| queue.pop_front())
    }

    /// All pending commands for a drone, oldest first, without consuming them.
    pub fn peek_commands(&self, drone_id: &str) -> Vec<Command> {
        self.commands
            .get(drone_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn pending_command_count(&self, drone_id: &str) -> usize {
        self.commands.get(drone_id).map_or(0, |queue| queue.len())
    }

    // ========== TELEMETRY ==========

    /// Append telemetry for a known drone, trimming the oldest samples.
    pub fn record_telemetry(&self, telemetry: Telemetry) -> bool {
        if !self.drone_exists(&telemetry.drone_id) {
            return false;
        }
        let mut history = self
            .telemetry
            .entry(telemetry.drone_id.clone())
            .or_default();
        history.push_back(telemetry);
        while history.len() > self.telemetry_history {
            history.pop_front();
        }
        true
    }

    pub fn latest_telemetry(&self, drone_id: &str) -> Option<Telemetry> {
        self.telemetry
            .get(drone_id)
            .and_then(|history| history.back().cloned())
    }

    pub fn telemetry_history(&self, drone_id: &str) -> Vec<Telemetry> {
        self.telemetry
            .get(drone_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ========== INTERFERENCES ==========

    pub fn add_interference(&self, interference: Interference) {
        self.interferences
            .insert(interference.interference_id.clone(), interference);
    }

    pub fn get_interference(&self, interference_id: &str) -> Option<Interference> {
        self.interferences
            .get(interference_id)
            .map(|r| r.value().clone())
    }

    pub fn interferences_for_hive(&self, hive_id: &str) -> Vec<Interference> {
        let mut found: Vec<Interference> = self
            .interferences
            .iter()
            .filter(|r| r.value().hive_id == hive_id)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        found
    }

    pub fn remove_interference(&self, interference_id: &str) -> bool {
        self.interferences.remove(interference_id).is_some()
    }

    pub fn record_interference_delivery(&self, drone_id: &str, interference_id: &str) {
        let mut delivered = self
            .interference_deliveries
            .entry(drone_id.to_string())
            .or_default();
        if !delivered.iter().any(|id| id == interference_id) {
            delivered.push(interference_id.to_string());
        }
    }

    /// Interferences announced to a drone that are still active.
    pub fn interferences_for_drone(&self, drone_id: &str) -> Vec<Interference> {
        let delivered = self
            .interference_deliveries
            .get(drone_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        delivered
            .iter()
            .filter_map(|id| self.get_interference(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hive_core::{CommandPayload, DroneType};
    use std::sync::Arc;

    fn drone(id: &str) -> Drone {
        Drone::new(id, DroneType::Other)
    }

    #[test]
    fn upsert_reports_new_then_replaces_links() {
        let store = SwarmStore::default();
        assert!(store.upsert_drone(drone("D1").with_connection("D2", 0.4)));
        assert!(!store.upsert_drone(drone("D1").with_connection("D3", 0.9)));

        let stored = store.get_drone("D1").unwrap();
        assert_eq!(stored.connections.len(), 1);
        assert_eq!(stored.connections[0].target_drone_id, "D3");
    }

    #[test]
    fn reads_are_copies() {
        let store = SwarmStore::default();
        store.upsert_drone(drone("D1"));
        let mut copy = store.get_drone("D1").unwrap();
        copy.set_connection("D2", 1.0);
        assert!(store.get_drone("D1").unwrap().connections.is_empty());

        assert!(store.update_drone(copy));
        assert!(store.get_drone("D1").unwrap().has_connection_to("D2"));
        assert!(!store.update_drone(drone("ghost")));
        assert!(!store.drone_exists("ghost"));
    }

    #[test]
    fn join_is_exclusive_and_idempotent() {
        let store = SwarmStore::default();
        store.upsert_drone(drone("D1"));
        store.create_hive(Hive::new("A", None));
        store.create_hive(Hive::new("B", None));

        assert_eq!(store.add_drone_to_hive("A", "D1"), Ok(JoinOutcome::Joined));
        assert_eq!(
            store.add_drone_to_hive("B", "D1"),
            Err(HiveError::AlreadyInHive {
                drone_id: "D1".into(),
                hive_id: "A".into()
            })
        );
        assert_eq!(store.add_drone_to_hive("A", "D1"), Ok(JoinOutcome::AlreadyMember));
        assert_eq!(store.hive_member_ids("A"), vec!["D1"]);
        assert!(store.hive_member_ids("B").is_empty());
        assert!(matches!(
            store.add_drone_to_hive("nope", "D1"),
            Err(HiveError::HiveNotFound { .. })
        ));
    }

    #[test]
    fn concurrent_joins_pick_exactly_one_hive() {
        let store = Arc::new(SwarmStore::default());
        store.upsert_drone(drone("D1"));
        for i in 0..8 {
            store.create_hive(Hive::new(format!("H{}", i), None));
        }

        let joined: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = store.clone();
                    scope.spawn(move || store.add_drone_to_hive(&format!("H{}", i), "D1").is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(false))
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(joined, 1);
    }

    #[test]
    fn join_racing_removal_leaves_no_stale_member() {
        let store = Arc::new(SwarmStore::default());
        store.create_hive(Hive::new("A", None));

        for round in 0..200 {
            let id = format!("D{}", round);
            store.upsert_drone(drone(&id));
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    let _ = store.add_drone_to_hive("A", &id);
                });
                scope.spawn(|| {
                    store.remove_drone(&id);
                });
            });
            assert!(!store.drone_exists(&id));
            assert!(store.hive_of(&id).is_none(), "{} still mapped to a hive", id);
            assert!(!store.hive_member_ids("A").contains(&id));
        }
    }

    #[test]
    fn removing_a_drone_cascades() {
        let store = SwarmStore::default();
        store.upsert_drone(Drone::relay("R1"));
        store.upsert_drone(drone("D2").with_connection("R1", 0.8));
        store.create_hive(Hive::new("A", None));
        store.add_drone_to_hive("A", "R1").unwrap();
        store.set_entry_relays("A", vec!["R1".into()]);
        store.enqueue_command(Command::new("R1", CommandPayload::Stop));

        assert!(store.remove_drone("R1"));
        assert!(store.hive_of("R1").is_none());
        assert!(store.hive_member_ids("A").is_empty());
        assert!(store.entry_relays("A").is_empty());
        assert!(store.peek_commands("R1").is_empty());
        // inbound link is stale, not removed
        assert!(store.get_drone("D2").unwrap().has_connection_to("R1"));
        assert!(!store.remove_drone("R1"));
    }

    #[test]
    fn deleting_a_hive_releases_members() {
        let store = SwarmStore::default();
        store.upsert_drone(drone("D1"));
        store.create_hive(Hive::new("A", None));
        store.create_hive(Hive::new("B", None));
        store.add_drone_to_hive("A", "D1").unwrap();

        assert!(store.remove_hive("A"));
        assert!(store.hive_of("D1").is_none());
        assert_eq!(store.add_drone_to_hive("B", "D1"), Ok(JoinOutcome::Joined));
        assert!(!store.remove_hive("A"));
    }

    #[test]
    fn command_queue_is_fifo() {
        let store = SwarmStore::default();
        let first = Command::new("D1", CommandPayload::Stop);
        let second = Command::new("D1", CommandPayload::GetTelemetry);
        store.enqueue_command(first.clone());
        store.enqueue_command(second.clone());

        assert_eq!(store.peek_commands("D1"), vec![first.clone(), second.clone()]);
        assert_eq!(store.dequeue_command("D1"), Some(first));
        assert_eq!(store.dequeue_command("D1"), Some(second));
        assert_eq!(store.dequeue_command("D1"), None);
        assert_eq!(store.dequeue_command("unknown"), None);
    }

    #[test]
    fn telemetry_history_is_bounded() {
        let store = SwarmStore::new(2);
        store.upsert_drone(drone("D1"));
        for i in 0..3 {
            assert!(store.record_telemetry(Telemetry {
                drone_id: "D1".into(),
                lat: i as f64,
                lon: 0.0,
                altitude_m: 10.0,
                battery_pct: None,
                timestamp: Utc::now(),
            }));
        }
        let history = store.telemetry_history("D1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].lat, 1.0);
        assert_eq!(store.latest_telemetry("D1").map(|t| t.lat), Some(2.0));
    }
}
