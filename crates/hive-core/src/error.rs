//! Error types for hive operations.
//!
//! Absence is not an error in this crate: lookups return `Option`/`bool`.
//! These variants cover operations that must be aborted with a reason.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HiveError {
    #[error("Drone not found: {drone_id}")]
    DroneNotFound { drone_id: String },

    #[error("Hive not found: {hive_id}")]
    HiveNotFound { hive_id: String },

    /// Membership is exclusive
    #[error("Drone {drone_id} already belongs to hive {hive_id}")]
    AlreadyInHive { drone_id: String, hive_id: String },

    #[error("Drone {drone_id} is not a member of hive {hive_id}")]
    NotHiveMember { drone_id: String, hive_id: String },

    #[error("Hub {hub_id} is not part of the supplied drone set")]
    HubMissing { hub_id: String },

    #[error("Dual-star topology needs two distinct hubs, got {hub_id} twice")]
    IdenticalHubs { hub_id: String },
}

pub type HiveResult<T> = Result<T, HiveError>;
