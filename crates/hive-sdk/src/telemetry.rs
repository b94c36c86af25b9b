//! Telemetry reporting helpers.

use crate::HiveClient;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct TelemetryReport {
    lat: f64,
    lon: f64,
    altitude_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_pct: Option<f64>,
    timestamp: chrono::DateTime<Utc>,
}

impl HiveClient {
    /// Report the drone's current position to the hive server.
    pub async fn send_telemetry(
        &self,
        lat: f64,
        lon: f64,
        altitude_m: f64,
        battery_pct: Option<f64>,
    ) -> Result<()> {
        let drone_id = self.registered_id()?;
        let url = format!("{}/v1/drones/{}/telemetry", self.base_url, drone_id);

        let report = TelemetryReport {
            lat,
            lon,
            altitude_m,
            battery_pct,
            timestamp: Utc::now(),
        };

        let response = self.client.post(&url).json(&report).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to send telemetry: {}", response.status());
        }
        Ok(())
    }
}
