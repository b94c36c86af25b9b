//! Per-drone command queues.

use hive_core::Command;
use std::sync::Arc;

use crate::state::SwarmStore;

#[derive(Clone)]
pub struct CommandQueue {
    store: Arc<SwarmStore>,
}

impl CommandQueue {
    pub fn new(store: Arc<SwarmStore>) -> Self {
        Self { store }
    }

    /// Stamp the command if needed and append it to its target's queue.
    /// Returns the command id.
    pub fn enqueue(&self, mut command: Command) -> String {
        command.stamp();
        let command_id = command.command_id.clone();
        tracing::debug!(
            "Queued {:?} command {} for drone {}",
            command.command_type(),
            command_id,
            command.target_drone_id
        );
        self.store.enqueue_command(command);
        command_id
    }

    pub fn dequeue(&self, drone_id: &str) -> Option<Command> {
        self.store.dequeue_command(drone_id)
    }

    pub fn peek_all(&self, drone_id: &str) -> Vec<Command> {
        self.store.peek_commands(drone_id)
    }
}
