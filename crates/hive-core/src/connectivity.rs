//! Connectivity analysis over a swarm snapshot.
//!
//! Path finding is a breadth-first search from a hive's entry relays that only
//! follows links at or above a weight threshold. It returns the fewest-hop
//! path (ties broken by discovery order) and the weakest link on *that* path.
//! It is not a widest-path search.

use crate::models::{Drone, DroneConnection};
use crate::topology::SwarmGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Links weaker than this are ignored unless the caller says otherwise.
pub const DEFAULT_MINIMUM_WEIGHT: f64 = 0.5;

/// Why a connection analysis could not produce a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailure {
    EmptySwarm,
    UnknownTarget,
    NoEntryRelays,
    /// No path where every link meets the threshold
    Unreachable,
}

impl ConnectFailure {
    pub fn describe(&self, target_drone_id: &str, minimum_weight: f64) -> String {
        match self {
            ConnectFailure::EmptySwarm => "Swarm has no drones".to_string(),
            ConnectFailure::UnknownTarget => format!("Drone {} not found", target_drone_id),
            ConnectFailure::NoEntryRelays => "No entry relays available".to_string(),
            ConnectFailure::Unreachable => format!(
                "No path to drone {} with link weight >= {:.2}",
                target_drone_id, minimum_weight
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionAnalysis {
    pub target_drone_id: String,
    pub can_connect: bool,
    /// Entry relay first, target last
    pub path: Vec<String>,
    /// `link_weights[i]` is the weight of `path[i] -> path[i + 1]`
    pub link_weights: Vec<f64>,
    pub entry_relay_id: Option<String>,
    pub minimum_link_weight: Option<f64>,
    pub hop_count: usize,
    pub minimum_weight_threshold: f64,
    pub failure: Option<ConnectFailure>,
}

impl ConnectionAnalysis {
    fn failed(target_drone_id: &str, minimum_weight: f64, failure: ConnectFailure) -> Self {
        Self {
            target_drone_id: target_drone_id.to_string(),
            can_connect: false,
            path: Vec::new(),
            link_weights: Vec::new(),
            entry_relay_id: None,
            minimum_link_weight: None,
            hop_count: 0,
            minimum_weight_threshold: minimum_weight,
            failure: Some(failure),
        }
    }

    pub fn failure_message(&self) -> Option<String> {
        self.failure
            .map(|f| f.describe(&self.target_drone_id, self.minimum_weight_threshold))
    }
}

/// Configured entry relays, or every Relay-type drone when none are configured.
pub fn resolve_entry_relays(configured: &[String], graph: &SwarmGraph) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    let mut relays: Vec<String> = graph
        .values()
        .filter(|d| d.is_relay())
        .map(|d| d.id.clone())
        .collect();
    relays.sort();
    relays
}

/// Find a path from any entry relay to `target_drone_id`.
pub fn analyze_connection(
    graph: &SwarmGraph,
    entry_relays: &[String],
    target_drone_id: &str,
    minimum_weight: f64,
) -> ConnectionAnalysis {
    if graph.is_empty() {
        return ConnectionAnalysis::failed(target_drone_id, minimum_weight, ConnectFailure::EmptySwarm);
    }
    if !graph.contains_key(target_drone_id) {
        return ConnectionAnalysis::failed(target_drone_id, minimum_weight, ConnectFailure::UnknownTarget);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    // node -> (predecessor, weight of predecessor -> node)
    let mut parent: HashMap<&str, (&str, f64)> = HashMap::new();
    let mut bottleneck: HashMap<&str, f64> = HashMap::new();

    for relay in entry_relays {
        let Some((relay_id, _)) = graph.get_key_value(relay.as_str()) else {
            continue;
        };
        if visited.insert(relay_id.as_str()) {
            queue.push_back(relay_id.as_str());
            bottleneck.insert(relay_id.as_str(), 1.0);
        }
    }
    if queue.is_empty() {
        return ConnectionAnalysis::failed(target_drone_id, minimum_weight, ConnectFailure::NoEntryRelays);
    }
    if visited.contains(target_drone_id) {
        return found(target_drone_id, minimum_weight, &parent, &bottleneck);
    }

    while let Some(current) = queue.pop_front() {
        let Some(drone) = graph.get(current) else {
            continue;
        };
        let current_min = bottleneck.get(current).copied().unwrap_or(1.0);

        for connection in &drone.connections {
            if connection.weight < minimum_weight {
                continue;
            }
            // Links toward removed drones are stale
            let Some((next_id, _)) = graph.get_key_value(connection.target_drone_id.as_str()) else {
                continue;
            };
            let next = next_id.as_str();
            if !visited.insert(next) {
                continue;
            }
            parent.insert(next, (current, connection.weight));
            bottleneck.insert(next, current_min.min(connection.weight));

            if next == target_drone_id {
                return found(target_drone_id, minimum_weight, &parent, &bottleneck);
            }
            queue.push_back(next);
        }
    }

    ConnectionAnalysis::failed(target_drone_id, minimum_weight, ConnectFailure::Unreachable)
}

fn found<'a>(
    target_drone_id: &'a str,
    minimum_weight: f64,
    parent: &HashMap<&'a str, (&'a str, f64)>,
    bottleneck: &HashMap<&'a str, f64>,
) -> ConnectionAnalysis {
    let mut path = vec![target_drone_id.to_string()];
    let mut link_weights = Vec::new();
    let mut cursor = target_drone_id;
    while let Some((previous, weight)) = parent.get(cursor) {
        path.push((*previous).to_string());
        link_weights.push(*weight);
        cursor = *previous;
    }
    path.reverse();
    link_weights.reverse();

    ConnectionAnalysis {
        target_drone_id: target_drone_id.to_string(),
        can_connect: true,
        entry_relay_id: path.first().cloned(),
        hop_count: link_weights.len(),
        minimum_link_weight: Some(bottleneck.get(target_drone_id).copied().unwrap_or(1.0)),
        path,
        link_weights,
        minimum_weight_threshold: minimum_weight,
        failure: None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub component_id: usize,
    pub drone_ids: Vec<String>,
    pub size: usize,
    /// Directed edges with both endpoints in this component
    pub internal_edges: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeStatistics {
    pub edge_count: usize,
    pub average_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

/// Point-in-time reachability report over a hive's drones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConnectivity {
    pub hive_id: String,
    pub total_drones: usize,
    pub connected_components: usize,
    pub largest_component_size: usize,
    pub is_fully_connected: bool,
    pub components: Vec<ComponentSummary>,
    pub edge_stats: EdgeStatistics,
    /// Links between hive members, keyed by source drone
    pub adjacency: BTreeMap<String, Vec<DroneConnection>>,
    /// Components smaller than the largest one
    pub isolated_groups: Vec<ComponentSummary>,
}

/// Partition `member_ids` into connected components.
///
/// Links are treated as undirected and weights are ignored; only links whose
/// endpoints are both members count.
pub fn analyze_swarm(graph: &SwarmGraph, hive_id: &str, member_ids: &[String]) -> SwarmConnectivity {
    let mut members: Vec<&Drone> = member_ids
        .iter()
        .filter_map(|id| graph.get(id.as_str()))
        .collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));
    members.dedup_by(|a, b| a.id == b.id);
    let member_set: HashSet<&str> = members.iter().map(|d| d.id.as_str()).collect();

    let mut neighbors: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut adjacency: BTreeMap<String, Vec<DroneConnection>> = BTreeMap::new();
    let mut weights: Vec<f64> = Vec::new();

    for drone in &members {
        let internal: Vec<DroneConnection> = drone
            .connections
            .iter()
            .filter(|c| member_set.contains(c.target_drone_id.as_str()))
            .cloned()
            .collect();
        for c in &internal {
            let (source, target) = (drone.id.as_str(), c.target_drone_id.as_str());
            if let Some(&target) = member_set.get(target) {
                neighbors.entry(source).or_default().push(target);
                neighbors.entry(target).or_default().push(source);
            }
            weights.push(c.weight);
        }
        adjacency.insert(drone.id.clone(), internal);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut components: Vec<ComponentSummary> = Vec::new();
    for drone in &members {
        let start = drone.id.as_str();
        if !visited.insert(start) {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        let mut component: Vec<String> = Vec::new();
        while let Some(current) = queue.pop_front() {
            component.push(current.to_string());
            for &next in neighbors.get(current).map(Vec::as_slice).unwrap_or(&[]) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        component.sort();
        let internal_edges = component
            .iter()
            .map(|id| adjacency.get(id).map_or(0, Vec::len))
            .sum();
        components.push(ComponentSummary {
            component_id: components.len(),
            size: component.len(),
            drone_ids: component,
            internal_edges,
        });
    }

    let largest_component_size = components.iter().map(|c| c.size).max().unwrap_or(0);
    let isolated_groups = components
        .iter()
        .filter(|c| c.size < largest_component_size)
        .cloned()
        .collect();

    SwarmConnectivity {
        hive_id: hive_id.to_string(),
        total_drones: members.len(),
        connected_components: components.len(),
        largest_component_size,
        is_fully_connected: components.len() == 1,
        components,
        edge_stats: edge_statistics(&weights),
        adjacency,
        isolated_groups,
    }
}

fn edge_statistics(weights: &[f64]) -> EdgeStatistics {
    if weights.is_empty() {
        return EdgeStatistics::default();
    }
    let sum: f64 = weights.iter().sum();
    EdgeStatistics {
        edge_count: weights.len(),
        average_weight: sum / weights.len() as f64,
        min_weight: weights.iter().copied().fold(f64::INFINITY, f64::min),
        max_weight: weights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DroneType;
    use crate::topology::graph_from;

    fn relays(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn chain(weight: f64) -> SwarmGraph {
        graph_from([
            Drone::relay("relay1").with_connection("relay2", weight),
            Drone::relay("relay2").with_connection("target", weight),
            Drone::new("target", DroneType::Other),
        ])
    }

    #[test]
    fn two_hop_chain_is_found() {
        let graph = chain(1.0);
        let result = analyze_connection(&graph, &relays(&["relay1"]), "target", 0.5);

        assert!(result.can_connect);
        assert_eq!(result.path, vec!["relay1", "relay2", "target"]);
        assert_eq!(result.link_weights, vec![1.0, 1.0]);
        assert_eq!(result.hop_count, 2);
        assert_eq!(result.minimum_link_weight, Some(1.0));
        assert_eq!(result.entry_relay_id.as_deref(), Some("relay1"));
    }

    #[test]
    fn weak_links_block_the_only_path() {
        let mut graph = chain(1.0);
        graph.get_mut("relay2").unwrap().update_weight("target", 0.3);
        let result = analyze_connection(&graph, &relays(&["relay1"]), "target", 0.5);

        assert!(!result.can_connect);
        assert!(result.path.is_empty());
        assert!(result.link_weights.is_empty());
        assert_eq!(result.minimum_link_weight, None);
        assert_eq!(result.failure, Some(ConnectFailure::Unreachable));
    }

    #[test]
    fn fewest_hops_wins_over_better_bottleneck() {
        // R -> A -> T is short but weak; R -> B -> C -> T is strong but longer
        let graph = graph_from([
            Drone::relay("R")
                .with_connection("A", 0.55)
                .with_connection("B", 1.0),
            Drone::new("A", DroneType::Other).with_connection("T", 0.6),
            Drone::new("B", DroneType::Other).with_connection("C", 1.0),
            Drone::new("C", DroneType::Other).with_connection("T", 1.0),
            Drone::new("T", DroneType::Other),
        ]);
        let result = analyze_connection(&graph, &relays(&["R"]), "T", 0.5);
        assert_eq!(result.path, vec!["R", "A", "T"]);
        assert_eq!(result.minimum_link_weight, Some(0.55));
    }

    #[test]
    fn ties_follow_discovery_order() {
        let graph = graph_from([
            Drone::relay("R")
                .with_connection("B", 0.9)
                .with_connection("A", 0.9),
            Drone::new("A", DroneType::Other).with_connection("T", 0.9),
            Drone::new("B", DroneType::Other).with_connection("T", 0.7),
            Drone::new("T", DroneType::Other),
        ]);
        let result = analyze_connection(&graph, &relays(&["R"]), "T", 0.5);
        assert_eq!(result.path, vec!["R", "B", "T"]);
        assert_eq!(result.minimum_link_weight, Some(0.7));
    }

    #[test]
    fn entry_relay_that_is_the_target_is_a_zero_hop_path() {
        let graph = chain(1.0);
        let result = analyze_connection(&graph, &relays(&["relay2"]), "relay2", 0.5);
        assert!(result.can_connect);
        assert_eq!(result.path, vec!["relay2"]);
        assert_eq!(result.hop_count, 0);
        assert_eq!(result.minimum_link_weight, Some(1.0));
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let empty = SwarmGraph::new();
        assert_eq!(
            analyze_connection(&empty, &[], "x", 0.5).failure,
            Some(ConnectFailure::EmptySwarm)
        );

        let graph = chain(1.0);
        assert_eq!(
            analyze_connection(&graph, &relays(&["relay1"]), "ghost", 0.5).failure,
            Some(ConnectFailure::UnknownTarget)
        );
        assert_eq!(
            analyze_connection(&graph, &relays(&["missing"]), "target", 0.5).failure,
            Some(ConnectFailure::NoEntryRelays)
        );
    }

    #[test]
    fn stale_links_to_removed_drones_are_skipped() {
        let graph = graph_from([
            Drone::relay("R").with_connection("gone", 1.0),
            Drone::new("T", DroneType::Other),
        ]);
        let result = analyze_connection(&graph, &relays(&["R"]), "T", 0.0);
        assert_eq!(result.failure, Some(ConnectFailure::Unreachable));
    }

    #[test]
    fn default_entry_relays_are_relay_type_drones() {
        let graph = chain(1.0);
        assert_eq!(resolve_entry_relays(&[], &graph), vec!["relay1", "relay2"]);
        assert_eq!(resolve_entry_relays(&relays(&["x"]), &graph), vec!["x"]);
    }

    #[test]
    fn disjoint_sets_form_two_components() {
        let graph = graph_from([
            Drone::relay("A1").with_connection("A2", 0.9),
            Drone::new("A2", DroneType::Other).with_connection("A3", 0.2),
            Drone::new("A3", DroneType::Other),
            Drone::relay("B1").with_connection("B2", 0.4),
            Drone::new("B2", DroneType::Other),
        ]);
        let members = relays(&["A1", "A2", "A3", "B1", "B2"]);
        let report = analyze_swarm(&graph, "hive-1", &members);

        assert_eq!(report.connected_components, 2);
        assert!(!report.is_fully_connected);
        assert_eq!(report.largest_component_size, 3);
        assert_eq!(report.isolated_groups.len(), 1);
        assert_eq!(report.isolated_groups[0].drone_ids, vec!["B1", "B2"]);
        assert_eq!(report.components[0].internal_edges, 2);
        assert_eq!(report.edge_stats.edge_count, 3);
        assert!((report.edge_stats.average_weight - 0.5).abs() < 1e-9);
        assert_eq!(report.edge_stats.min_weight, 0.2);
        assert_eq!(report.edge_stats.max_weight, 0.9);
    }

    #[test]
    fn links_leaving_the_hive_are_ignored() {
        let graph = graph_from([
            Drone::relay("A").with_connection("outsider", 1.0),
            Drone::new("B", DroneType::Other).with_connection("outsider", 1.0),
            Drone::new("outsider", DroneType::Other),
        ]);
        let report = analyze_swarm(&graph, "h", &relays(&["A", "B"]));
        assert_eq!(report.connected_components, 2);
        assert_eq!(report.edge_stats.edge_count, 0);
        assert!(report.adjacency["A"].is_empty());
        // equal-sized components: none is smaller than the largest
        assert!(report.isolated_groups.is_empty());
    }

    #[test]
    fn single_component_is_fully_connected() {
        let graph = graph_from([
            Drone::relay("A").with_connection("B", 0.8),
            Drone::new("B", DroneType::Other),
        ]);
        let report = analyze_swarm(&graph, "h", &relays(&["A", "B"]));
        assert!(report.is_fully_connected);
        assert_eq!(report.largest_component_size, 2);

        let empty = analyze_swarm(&graph, "h", &[]);
        assert!(!empty.is_fully_connected);
        assert_eq!(empty.connected_components, 0);
    }
}
