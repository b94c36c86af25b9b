//! Hive SDK - drone-side library
//!
//! Registers a drone with the hive server, polls its command queue and
//! reports telemetry back.

pub mod client;
pub mod commands;
pub mod telemetry;

pub use client::{HiveClient, RegistrationError, RetryPolicy};
pub use commands::{dispatch, CommandHandler, CommandOutcome};
pub use hive_core::{Command, CommandPayload, Drone, Telemetry};
