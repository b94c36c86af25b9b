//! Accessor facades over the swarm store.
//!
//! Services talk to these rather than to the store directly.

pub mod commands;
pub mod drones;
pub mod hives;

pub use commands::CommandQueue;
pub use drones::DroneDirectory;
pub use hives::HiveDirectory;
