//! Interference announcements fanned out to every drone of a hive.

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use hive_core::{clamp_weight, HiveError, HiveResult, Interference};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::state::SwarmStore;

/// Inbound interference report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterferenceRequest {
    #[serde(default)]
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
    /// Clamped to [0, 1]
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub drone_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterferenceAnnouncement {
    pub interference: Interference,
    pub delivered: usize,
    pub failed: usize,
    pub deliveries: Vec<DeliveryOutcome>,
}

/// How an announcement reaches a single drone.
#[derive(Clone)]
pub enum DroneNotifier {
    /// POST to a per-drone callback URL
    Http(HttpNotifier),
    /// Record in the store for the drone to poll
    Store,
}

impl DroneNotifier {
    pub fn from_config(config: &Config) -> Self {
        match config.drone_callback_url.as_deref() {
            Some(template) => DroneNotifier::Http(HttpNotifier::new(template)),
            None => DroneNotifier::Store,
        }
    }

    async fn deliver(
        &self,
        store: &SwarmStore,
        drone_id: &str,
        interference: &Interference,
    ) -> Result<()> {
        match self {
            DroneNotifier::Http(http) => http.post(drone_id, interference).await,
            DroneNotifier::Store => {
                store.record_interference_delivery(drone_id, &interference.interference_id);
                Ok(())
            }
        }
    }
}

#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url_template: String,
}

impl HttpNotifier {
    /// `url_template` may contain a `{drone_id}` placeholder.
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url_template: url_template.into(),
        }
    }

    fn url_for(&self, drone_id: &str) -> String {
        self.url_template.replace("{drone_id}", drone_id)
    }

    async fn post(&self, drone_id: &str, interference: &Interference) -> Result<()> {
        let response = self
            .client
            .post(self.url_for(drone_id))
            .json(interference)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("Callback returned {}", response.status());
        }
        Ok(())
    }
}

pub struct HiveNotifier {
    store: Arc<SwarmStore>,
    notifier: DroneNotifier,
    timeout: Duration,
}

impl HiveNotifier {
    pub fn new(store: Arc<SwarmStore>, notifier: DroneNotifier, timeout_ms: u64) -> Self {
        Self {
            store,
            notifier,
            timeout: Duration::from_millis(timeout_ms.max(1)),
        }
    }

    /// Record an interference for `hive_id` and deliver it to every member
    /// concurrently. Each delivery is bounded by the configured timeout and
    /// reported on its own.
    pub async fn announce_interference(
        &self,
        hive_id: &str,
        request: InterferenceRequest,
    ) -> HiveResult<InterferenceAnnouncement> {
        if !self.store.hive_exists(hive_id) {
            return Err(HiveError::HiveNotFound {
                hive_id: hive_id.to_string(),
            });
        }

        let interference = Interference {
            interference_id: format!("INT-{}", uuid::Uuid::new_v4().simple().to_string().to_uppercase()),
            hive_id: hive_id.to_string(),
            description: request.description,
            lat: request.lat,
            lon: request.lon,
            radius_m: request.radius_m.max(0.0),
            strength: clamp_weight(request.strength),
            created_at: Utc::now(),
        };
        self.store.add_interference(interference.clone());

        let members = self.store.hive_member_ids(hive_id);
        let deliveries = join_all(
            members
                .iter()
                .map(|drone_id| self.deliver_one(drone_id, &interference)),
        )
        .await;

        let delivered = deliveries.iter().filter(|d| d.success).count();
        let failed = deliveries.len() - delivered;
        tracing::info!(
            "Interference {} announced to hive {}: {} delivered, {} failed",
            interference.interference_id,
            hive_id,
            delivered,
            failed
        );

        Ok(InterferenceAnnouncement {
            interference,
            delivered,
            failed,
            deliveries,
        })
    }

    async fn deliver_one(&self, drone_id: &str, interference: &Interference) -> DeliveryOutcome {
        let attempt = self.notifier.deliver(&self.store, drone_id, interference);
        let error = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_) => Some(format!("Timed out after {}ms", self.timeout.as_millis())),
        };
        if let Some(reason) = &error {
            tracing::warn!("Interference delivery to {} failed: {}", drone_id, reason);
        }
        DeliveryOutcome {
            drone_id: drone_id.to_string(),
            success: error.is_none(),
            error,
        }
    }
}
