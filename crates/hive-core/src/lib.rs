//! Hive Core - drone mesh model and graph algorithms.

pub mod connectivity;
pub mod error;
pub mod models;
pub mod topology;

pub use connectivity::{
    analyze_connection, analyze_swarm, resolve_entry_relays, ComponentSummary, ConnectFailure,
    ConnectionAnalysis, EdgeStatistics, SwarmConnectivity, DEFAULT_MINIMUM_WEIGHT,
};
pub use error::{HiveError, HiveResult};
pub use models::{
    clamp_weight, Command, CommandPayload, CommandType, Drone, DroneConnection, DroneType, Hive,
    Interference, RelayPayload, Telemetry,
};
pub use topology::{
    build_dual_star, build_mesh, build_star, graph_from, remove_all_connections, EdgeChanges,
    LinkJitter, SwarmGraph, TopologyKind, DEFAULT_JITTER,
};
