//! Bulk edge-set construction for mesh, star and dual-star topologies.
//!
//! Functions here operate on an owned [`SwarmGraph`] (a copy of the drones
//! read from the store). Callers write the touched drones back afterwards.

use crate::error::{HiveError, HiveResult};
use crate::models::{clamp_weight, Drone};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Default per-direction jitter applied to freshly built links.
pub const DEFAULT_JITTER: f64 = 0.05;

/// Drones keyed by id.
pub type SwarmGraph = HashMap<String, Drone>;

pub fn graph_from(drones: impl IntoIterator<Item = Drone>) -> SwarmGraph {
    drones.into_iter().map(|d| (d.id.clone(), d)).collect()
}

/// Random perturbation source for link weights.
///
/// Seed it in tests to make built topologies exactly reproducible.
#[derive(Debug, Clone)]
pub struct LinkJitter {
    rng: StdRng,
    amplitude: f64,
}

impl LinkJitter {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            amplitude: DEFAULT_JITTER,
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            amplitude: DEFAULT_JITTER,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude.abs();
        self
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// `base` plus uniform noise in `[-amplitude, amplitude]`, clamped to `[0, 1]`.
    pub fn apply(&mut self, base: f64) -> f64 {
        if self.amplitude == 0.0 {
            return clamp_weight(base);
        }
        let offset = self.rng.random_range(-self.amplitude..=self.amplitude);
        clamp_weight(base + offset)
    }
}

impl Default for LinkJitter {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    Mesh,
    Star,
    DualStar,
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyKind::Mesh => f.write_str("mesh"),
            TopologyKind::Star => f.write_str("star"),
            TopologyKind::DualStar => f.write_str("dual_star"),
        }
    }
}

impl FromStr for TopologyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mesh" => Ok(TopologyKind::Mesh),
            "star" => Ok(TopologyKind::Star),
            "dual_star" | "dual-star" | "dualstar" => Ok(TopologyKind::DualStar),
            other => Err(format!("unknown topology '{}'", other)),
        }
    }
}

/// Result of a bulk edge operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeChanges {
    /// Directed edges inserted (builds) or removed (teardown)
    pub edges: usize,
    /// Drones whose link list changed and must be written back
    pub touched: BTreeSet<String>,
}

impl EdgeChanges {
    fn link(&mut self, graph: &mut SwarmGraph, a: &str, b: &str, weight: f64, jitter: &mut LinkJitter) {
        if a == b || !graph.contains_key(a) || !graph.contains_key(b) {
            return;
        }
        let forward = jitter.apply(weight);
        let backward = jitter.apply(weight);
        if let Some(drone) = graph.get_mut(a) {
            drone.remove_connection(b);
            drone.set_connection(b, forward);
        }
        if let Some(drone) = graph.get_mut(b) {
            drone.remove_connection(a);
            drone.set_connection(a, backward);
        }
        self.edges += 2;
        self.touched.insert(a.to_string());
        self.touched.insert(b.to_string());
    }
}

/// Supplied ids that exist in `graph`, deduplicated, in supplied order.
fn present_ids(graph: &SwarmGraph, ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| graph.contains_key(id.as_str()))
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Link every unordered pair in both directions.
pub fn build_mesh(
    graph: &mut SwarmGraph,
    ids: &[String],
    weight: f64,
    jitter: &mut LinkJitter,
) -> EdgeChanges {
    let members = present_ids(graph, ids);
    let mut changes = EdgeChanges::default();
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            changes.link(graph, a, b, weight, jitter);
        }
    }
    changes
}

/// Link `hub_id` with every other drone in the set.
pub fn build_star(
    graph: &mut SwarmGraph,
    ids: &[String],
    hub_id: &str,
    weight: f64,
    jitter: &mut LinkJitter,
) -> HiveResult<EdgeChanges> {
    let members = present_ids(graph, ids);
    require_hub(&members, hub_id)?;

    let mut changes = EdgeChanges::default();
    for spoke in members.iter().filter(|id| id.as_str() != hub_id) {
        changes.link(graph, hub_id, spoke, weight, jitter);
    }
    Ok(changes)
}

/// Two hubs linked to each other and to every other drone.
pub fn build_dual_star(
    graph: &mut SwarmGraph,
    ids: &[String],
    hub1_id: &str,
    hub2_id: &str,
    weight: f64,
    jitter: &mut LinkJitter,
) -> HiveResult<EdgeChanges> {
    if hub1_id == hub2_id {
        return Err(HiveError::IdenticalHubs {
            hub_id: hub1_id.to_string(),
        });
    }
    let members = present_ids(graph, ids);
    require_hub(&members, hub1_id)?;
    require_hub(&members, hub2_id)?;

    let mut changes = EdgeChanges::default();
    changes.link(graph, hub1_id, hub2_id, weight, jitter);
    for spoke in members
        .iter()
        .filter(|id| id.as_str() != hub1_id && id.as_str() != hub2_id)
    {
        changes.link(graph, hub1_id, spoke, weight, jitter);
        changes.link(graph, hub2_id, spoke, weight, jitter);
    }
    Ok(changes)
}

fn require_hub(members: &[String], hub_id: &str) -> HiveResult<()> {
    if members.iter().any(|id| id == hub_id) {
        Ok(())
    } else {
        Err(HiveError::HubMissing {
            hub_id: hub_id.to_string(),
        })
    }
}

/// Drop every directed edge with either endpoint in `ids`.
///
/// `graph` should hold the whole swarm so edges pointing into the set from
/// outside are removed as well.
pub fn remove_all_connections(graph: &mut SwarmGraph, ids: &[String]) -> EdgeChanges {
    let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut changes = EdgeChanges::default();

    for drone in graph.values_mut() {
        let before = drone.connections.len();
        if targets.contains(drone.id.as_str()) {
            drone.connections.clear();
        } else {
            drone
                .connections
                .retain(|c| !targets.contains(c.target_drone_id.as_str()));
        }
        let removed = before - drone.connections.len();
        if removed > 0 {
            changes.edges += removed;
            changes.touched.insert(drone.id.clone());
        }
    }
    changes
}
