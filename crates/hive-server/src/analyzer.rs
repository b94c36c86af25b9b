//! Connectivity analysis against a point-in-time copy of the swarm.

use hive_core::connectivity::{self, ConnectionAnalysis, SwarmConnectivity};
use hive_core::graph_from;

use crate::directory::{DroneDirectory, HiveDirectory};

#[derive(Clone)]
pub struct ConnectivityAnalyzer {
    drones: DroneDirectory,
    hives: HiveDirectory,
}

impl ConnectivityAnalyzer {
    pub fn new(drones: DroneDirectory, hives: HiveDirectory) -> Self {
        Self { drones, hives }
    }

    /// Fewest-hop path from an entry relay to `target_drone_id` using only
    /// links with weight >= `minimum_weight`.
    ///
    /// Entry relays are the target hive's configured relays, or every relay in
    /// the swarm when the hive has none configured (or the target is not in a
    /// hive).
    pub fn analyze_connection(&self, target_drone_id: &str, minimum_weight: f64) -> ConnectionAnalysis {
        let graph = graph_from(self.drones.get_all());
        let configured = self
            .hives
            .hive_of(target_drone_id)
            .map(|hive_id| self.hives.get_entry_relays(&hive_id))
            .unwrap_or_default();
        let entry_relays = connectivity::resolve_entry_relays(&configured, &graph);

        let analysis =
            connectivity::analyze_connection(&graph, &entry_relays, target_drone_id, minimum_weight);
        match analysis.failure_message() {
            Some(reason) => tracing::debug!("Cannot reach {}: {}", target_drone_id, reason),
            None => tracing::debug!(
                "Path to {}: {} ({} hops)",
                target_drone_id,
                analysis.path.join(" -> "),
                analysis.hop_count
            ),
        }
        analysis
    }

    /// Component breakdown of a hive. `None` for unknown hives.
    pub fn analyze_swarm_connectivity(&self, hive_id: &str) -> Option<SwarmConnectivity> {
        if !self.hives.exists(hive_id) {
            return None;
        }
        let member_ids = self.hives.get_drone_ids(hive_id);
        let graph = graph_from(self.drones.get_many(&member_ids));
        Some(connectivity::analyze_swarm(&graph, hive_id, &member_ids))
    }
}
