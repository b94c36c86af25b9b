//! Hive server library surface, shared by the binary and integration tests.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod connections;
pub mod coordination;
pub mod directory;
pub mod mesh_router;
pub mod notify;
pub mod state;
pub mod topology;
