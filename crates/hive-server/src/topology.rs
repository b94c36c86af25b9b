//! Bulk topology construction against the swarm store.
//!
//! Edge sets are computed on a copy of the affected drones and the touched
//! drones are written back afterwards. Drones removed in the meantime are
//! not resurrected.

use hive_core::topology::{self, EdgeChanges, LinkJitter, SwarmGraph, TopologyKind};
use hive_core::{graph_from, HiveResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::state::SwarmStore;

/// Link weight used when a rebuild request doesn't name one.
pub const DEFAULT_LINK_WEIGHT: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyRequest {
    pub topology: TopologyKind,
    /// Defaults to every member of the hive at the API layer
    #[serde(default)]
    pub drone_ids: Option<Vec<String>>,
    #[serde(default)]
    pub hub_id: Option<String>,
    #[serde(default)]
    pub hub2_id: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyReport {
    pub topology: TopologyKind,
    pub drone_count: usize,
    pub removed_edges: usize,
    pub created_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct TopologyBuilder {
    store: Arc<SwarmStore>,
    jitter: Mutex<LinkJitter>,
}

impl TopologyBuilder {
    pub fn new(store: Arc<SwarmStore>, seed: Option<u64>) -> Self {
        let jitter = match seed {
            Some(seed) => LinkJitter::seeded(seed),
            None => LinkJitter::from_entropy(),
        };
        Self::with_jitter(store, jitter)
    }

    pub fn with_jitter(store: Arc<SwarmStore>, jitter: LinkJitter) -> Self {
        Self {
            store,
            jitter: Mutex::new(jitter),
        }
    }

    fn with_graph<F>(&self, mut graph: SwarmGraph, build: F) -> HiveResult<usize>
    where
        F: FnOnce(&mut SwarmGraph, &mut LinkJitter) -> HiveResult<EdgeChanges>,
    {
        let changes = {
            let mut jitter = self.jitter.lock().unwrap_or_else(PoisonError::into_inner);
            build(&mut graph, &mut *jitter)?
        };
        self.write_back(graph, &changes);
        Ok(changes.edges)
    }

    fn write_back(&self, mut graph: SwarmGraph, changes: &EdgeChanges) {
        for drone_id in &changes.touched {
            if let Some(drone) = graph.remove(drone_id) {
                self.store.update_drone(drone);
            }
        }
    }

    fn snapshot(&self, drone_ids: &[String]) -> SwarmGraph {
        graph_from(self.store.get_drones(drone_ids))
    }

    /// Fully connect the set. Returns directed edges created.
    pub fn build_mesh(&self, drone_ids: &[String], weight: f64) -> usize {
        let graph = self.snapshot(drone_ids);
        let edges = self
            .with_graph(graph, |g, jitter| Ok(topology::build_mesh(g, drone_ids, weight, jitter)))
            .unwrap_or(0);
        tracing::info!("Built mesh over {} drones ({} links)", drone_ids.len(), edges);
        edges
    }

    /// Hub-and-spoke. Returns 0 without touching anything when the hub is
    /// not part of the set.
    pub fn build_star(&self, drone_ids: &[String], hub_id: &str, weight: f64) -> usize {
        let graph = self.snapshot(drone_ids);
        match self.with_graph(graph, |g, jitter| {
            topology::build_star(g, drone_ids, hub_id, weight, jitter)
        }) {
            Ok(edges) => {
                tracing::info!("Built star around {} ({} links)", hub_id, edges);
                edges
            }
            Err(err) => {
                tracing::warn!("Star topology not built: {}", err);
                0
            }
        }
    }

    pub fn build_dual_star(
        &self,
        drone_ids: &[String],
        hub1_id: &str,
        hub2_id: &str,
        weight: f64,
    ) -> usize {
        let graph = self.snapshot(drone_ids);
        match self.with_graph(graph, |g, jitter| {
            topology::build_dual_star(g, drone_ids, hub1_id, hub2_id, weight, jitter)
        }) {
            Ok(edges) => {
                tracing::info!(
                    "Built dual star around {} and {} ({} links)",
                    hub1_id,
                    hub2_id,
                    edges
                );
                edges
            }
            Err(err) => {
                tracing::warn!("Dual-star topology not built: {}", err);
                0
            }
        }
    }

    /// Remove every link touching the set, including links other drones hold
    /// toward it. Returns directed edges removed.
    pub fn remove_all_connections(&self, drone_ids: &[String]) -> usize {
        let mut graph = graph_from(self.store.get_all_drones());
        let changes = topology::remove_all_connections(&mut graph, drone_ids);
        self.write_back(graph, &changes);
        tracing::info!(
            "Removed {} links touching {} drones",
            changes.edges,
            drone_ids.len()
        );
        changes.edges
    }

    /// Tear down the set's links and build the requested topology in their place.
    pub fn rebuild(&self, drone_ids: &[String], request: &TopologyRequest) -> TopologyReport {
        let weight = request.weight.unwrap_or(DEFAULT_LINK_WEIGHT);
        let present: Vec<String> = self
            .store
            .get_drones(drone_ids)
            .into_iter()
            .map(|d| d.id)
            .collect();

        let mut report = TopologyReport {
            topology: request.topology,
            drone_count: present.len(),
            removed_edges: 0,
            created_edges: 0,
            warning: None,
        };

        let hubs: Vec<&str> = match request.topology {
            TopologyKind::Mesh => Vec::new(),
            TopologyKind::Star => vec![request.hub_id.as_deref().unwrap_or_default()],
            TopologyKind::DualStar => vec![
                request.hub_id.as_deref().unwrap_or_default(),
                request.hub2_id.as_deref().unwrap_or_default(),
            ],
        };
        if let Some(missing) = hubs
            .iter()
            .copied()
            .find(|hub| !present.iter().any(|id| id.as_str() == *hub))
        {
            let warning = format!("Hub '{}' is not part of the drone set", missing);
            tracing::warn!("Topology rebuild skipped: {}", warning);
            report.warning = Some(warning);
            return report;
        }
        if hubs.len() == 2 && hubs[0] == hubs[1] {
            let warning = format!("Hubs must differ, both are '{}'", hubs[0]);
            tracing::warn!("Topology rebuild skipped: {}", warning);
            report.warning = Some(warning);
            return report;
        }

        report.removed_edges = self.remove_all_connections(&present);
        report.created_edges = match request.topology {
            TopologyKind::Mesh => self.build_mesh(&present, weight),
            TopologyKind::Star => self.build_star(&present, hubs[0], weight),
            TopologyKind::DualStar => self.build_dual_star(&present, hubs[0], hubs[1], weight),
        };
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{Drone, DroneType};

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("D{}", i)).collect()
    }

    fn builder(n: usize, seed: u64) -> (TopologyBuilder, Arc<SwarmStore>) {
        let store = Arc::new(SwarmStore::default());
        for id in ids(n) {
            store.upsert_drone(Drone::new(id, DroneType::Other));
        }
        (TopologyBuilder::new(store.clone(), Some(seed)), store)
    }

    fn directed_edges(store: &SwarmStore) -> usize {
        store
            .get_all_drones()
            .iter()
            .map(|d| d.connections.len())
            .sum()
    }

    #[test]
    fn mesh_is_written_back_to_the_store() {
        let (builder, store) = builder(4, 11);
        assert_eq!(builder.build_mesh(&ids(4), 0.7), 12);
        assert_eq!(directed_edges(&store), 12);
        for drone in store.get_all_drones() {
            for c in &drone.connections {
                assert!(c.weight >= 0.65 - 1e-9 && c.weight <= 0.75 + 1e-9);
            }
        }
    }

    #[test]
    fn teardown_after_build_counts_both_directions() {
        let (builder, store) = builder(5, 3);
        builder.build_star(&ids(5), "D1", 0.9);
        assert_eq!(builder.remove_all_connections(&ids(5)), 2 * 4);
        assert_eq!(directed_edges(&store), 0);
        assert_eq!(builder.remove_all_connections(&ids(5)), 0);
    }

    #[test]
    fn missing_hub_is_a_no_op() {
        let (builder, store) = builder(3, 1);
        assert_eq!(builder.build_star(&ids(3), "D7", 0.9), 0);
        assert_eq!(builder.build_dual_star(&ids(3), "D1", "D7", 0.9), 0);
        assert_eq!(directed_edges(&store), 0);
    }

    #[test]
    fn seeded_builders_agree() {
        let (first, first_store) = builder(4, 99);
        let (second, second_store) = builder(4, 99);
        first.build_mesh(&ids(4), 0.5);
        second.build_mesh(&ids(4), 0.5);
        assert_eq!(first_store.get_all_drones(), second_store.get_all_drones());
    }

    #[test]
    fn rebuild_replaces_previous_topology() {
        let (builder, store) = builder(4, 5);
        builder.build_mesh(&ids(4), 0.9);

        let report = builder.rebuild(
            &ids(4),
            &TopologyRequest {
                topology: TopologyKind::Star,
                drone_ids: None,
                hub_id: Some("D2".into()),
                hub2_id: None,
                weight: Some(0.6),
            },
        );
        assert_eq!(report.removed_edges, 12);
        assert_eq!(report.created_edges, 6);
        assert!(report.warning.is_none());
        assert_eq!(directed_edges(&store), 6);
        assert!(!store.get_drone("D1").unwrap().has_connection_to("D3"));
    }

    #[test]
    fn rebuild_with_missing_hub_keeps_existing_links() {
        let (builder, store) = builder(3, 5);
        builder.build_mesh(&ids(3), 0.9);

        let report = builder.rebuild(
            &ids(3),
            &TopologyRequest {
                topology: TopologyKind::DualStar,
                drone_ids: None,
                hub_id: Some("D1".into()),
                hub2_id: None,
                weight: None,
            },
        );
        assert!(report.warning.is_some());
        assert_eq!(report.created_edges, 0);
        assert_eq!(directed_edges(&store), 6);
    }

    #[test]
    fn rebuild_with_identical_hubs_keeps_existing_links() {
        let (builder, store) = builder(4, 5);
        builder.build_mesh(&ids(4), 0.9);

        let report = builder.rebuild(
            &ids(4),
            &TopologyRequest {
                topology: TopologyKind::DualStar,
                drone_ids: None,
                hub_id: Some("D1".into()),
                hub2_id: Some("D1".into()),
                weight: None,
            },
        );
        assert!(report.warning.is_some());
        assert_eq!(report.removed_edges, 0);
        assert_eq!(report.created_edges, 0);
        assert_eq!(directed_edges(&store), 12);
    }
}
