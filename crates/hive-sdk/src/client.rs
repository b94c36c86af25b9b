//! Hive SDK client for drone registration and command polling.

use anyhow::Result;
use hive_core::{Command, Drone, Interference};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Client for one drone talking to the hive server.
pub struct HiveClient {
    pub(crate) base_url: String,
    pub(crate) drone_id: Option<String>,
    pub(crate) client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub drone: Drone,
    pub is_new: bool,
}

/// Fixed-delay, bounded retry for bootstrap registration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Registration gave up. The node cannot run unregistered.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Registration of {drone_id} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        drone_id: String,
        attempts: u32,
        last_error: String,
    },
}

impl HiveClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            drone_id: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn drone_id(&self) -> Option<&str> {
        self.drone_id.as_deref()
    }

    pub(crate) fn registered_id(&self) -> Result<&str> {
        self.drone_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Drone not registered"))
    }

    /// Upsert this drone once.
    pub async fn register(&mut self, drone: &Drone) -> Result<RegisterResponse> {
        let url = format!("{}/v1/drones", self.base_url);
        let response = self.client.put(&url).json(drone).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Registration rejected: {}", response.status());
        }
        let body: RegisterResponse = response.json().await?;
        self.drone_id = Some(body.drone.id.clone());
        Ok(body)
    }

    /// Register, retrying on any failure with a fixed delay.
    pub async fn register_with_retry(
        &mut self,
        drone: &Drone,
        policy: RetryPolicy,
    ) -> Result<RegisterResponse, RegistrationError> {
        let attempts = policy.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.register(drone).await {
                Ok(response) => {
                    tracing::info!(
                        "Registered drone {} (attempt {}, new: {})",
                        drone.id,
                        attempt,
                        response.is_new
                    );
                    return Ok(response);
                }
                Err(err) => {
                    tracing::warn!(
                        "Registration attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        drone.id,
                        err
                    );
                    last_error = err.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(policy.delay).await;
            }
        }
        Err(RegistrationError::Exhausted {
            drone_id: drone.id.clone(),
            attempts,
            last_error,
        })
    }

    /// Ask the server to add this drone to a hive.
    pub async fn join_hive(&self, hive_id: &str) -> Result<()> {
        let drone_id = self.registered_id()?;
        let url = format!("{}/v1/hives/{}/drones", self.base_url, hive_id);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "drone_ids": [drone_id] }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to join hive {}: {}", hive_id, response.status());
        }
        let body: serde_json::Value = response.json().await?;
        if body["results"][0]["success"] != serde_json::Value::Bool(true) {
            anyhow::bail!(
                "Failed to join hive {}: {}",
                hive_id,
                body["results"][0]["error"].as_str().unwrap_or("rejected")
            );
        }
        Ok(())
    }

    // ========== COMMAND HANDLING ==========

    /// Pop the next queued command. `None` when the queue is empty.
    pub async fn next_command(&self) -> Result<Option<Command>> {
        let drone_id = self.registered_id()?;
        let url = format!("{}/v1/drones/{}/commands/next", self.base_url, drone_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to poll commands: {}", response.status());
        }
        Ok(response.json().await?)
    }

    /// Every queued command without consuming any.
    pub async fn pending_commands(&self) -> Result<Vec<Command>> {
        let drone_id = self.registered_id()?;
        let url = format!("{}/v1/drones/{}/commands", self.base_url, drone_id);
        let commands: Vec<Command> = self.client.get(&url).send().await?.json().await?;
        Ok(commands)
    }

    /// Interferences announced to this drone.
    pub async fn interferences(&self) -> Result<Vec<Interference>> {
        let drone_id = self.registered_id()?;
        let url = format!("{}/v1/drones/{}/interferences", self.base_url, drone_id);
        let found: Vec<Interference> = self.client.get(&url).send().await?.json().await?;
        Ok(found)
    }
}
