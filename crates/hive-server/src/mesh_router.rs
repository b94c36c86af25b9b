//! Multi-hop command delivery.
//!
//! A command for a drone that no entry relay reaches directly is wrapped in a
//! chain of `RELAY` commands, one per intermediate hop, each queued on the
//! drone that has to forward it. The original command is queued on the target
//! last.

use hive_core::{Command, CommandPayload, RelayPayload};
use serde::{Deserialize, Serialize};

use crate::analyzer::ConnectivityAnalyzer;
use crate::directory::CommandQueue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub route: Vec<String>,
    pub link_weights: Vec<f64>,
    pub minimum_link_weight: Option<f64>,
    pub hop_count: usize,
    pub relays_used: usize,
    /// Ids of every command queued, in queue order
    pub command_ids: Vec<String>,
}

#[derive(Clone)]
pub struct MeshRouter {
    analyzer: ConnectivityAnalyzer,
    commands: CommandQueue,
}

impl MeshRouter {
    pub fn new(analyzer: ConnectivityAnalyzer, commands: CommandQueue) -> Self {
        Self { analyzer, commands }
    }

    /// Deliver `command` to its target through the mesh.
    ///
    /// Nothing is queued when no qualifying path exists.
    pub fn route(&self, command: Command, minimum_weight: f64) -> RouteResult {
        let target = command.target_drone_id.clone();
        let analysis = self.analyzer.analyze_connection(&target, minimum_weight);
        if !analysis.can_connect {
            let error = analysis
                .failure_message()
                .unwrap_or_else(|| format!("No path to drone {}", target));
            tracing::warn!("Routing to {} failed: {}", target, error);
            return RouteResult {
                error: Some(error),
                ..RouteResult::default()
            };
        }

        let mut result = RouteResult {
            success: true,
            error: None,
            route: analysis.path.clone(),
            link_weights: analysis.link_weights.clone(),
            minimum_link_weight: analysis.minimum_link_weight,
            hop_count: analysis.hop_count,
            relays_used: 0,
            command_ids: Vec::new(),
        };

        // A single link needs no forwarding
        if analysis.hop_count <= 1 {
            result.command_ids.push(self.commands.enqueue(command));
            tracing::info!("Delivered command directly to {}", target);
            return result;
        }

        let mut final_command = command;
        final_command.stamp();
        let path = &analysis.path;
        let relay_hops = path.len() - 1;

        for (i, hop) in path[..relay_hops].iter().enumerate() {
            let next = &path[i + 1];
            let next_hop_drone_id = (next != &target).then(|| next.clone());
            let relay = Command::new(
                hop.clone(),
                CommandPayload::Relay(RelayPayload {
                    final_destination_drone_id: target.clone(),
                    next_hop_drone_id,
                    final_command: Box::new(final_command.clone()),
                    route_path: path.clone(),
                }),
            );
            result.command_ids.push(self.commands.enqueue(relay));
        }
        result.relays_used = relay_hops;
        result.command_ids.push(self.commands.enqueue(final_command));

        tracing::info!(
            "Routed command to {} via {} relays ({})",
            target,
            relay_hops,
            path.join(" -> ")
        );
        result
    }
}
