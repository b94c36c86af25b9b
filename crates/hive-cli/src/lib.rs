//! Hive CLI - command line tools for hive mesh drones.
//!
//! Binaries:
//! - drone_node: runs one drone against the hive server
//! - mesh_demo: seeds a hive, builds a topology and routes a command

pub mod sim;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `json` switches to structured output.
pub fn init_tracing(default_directive: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(default_directive.parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

/// Parse a `PEER=WEIGHT` link argument.
pub fn parse_link(raw: &str) -> Result<(String, f64), String> {
    let (peer, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PEER=WEIGHT, got '{}'", raw))?;
    let peer = peer.trim();
    if peer.is_empty() {
        return Err(format!("missing peer in '{}'", raw));
    }
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight in '{}'", raw))?;
    Ok((peer.to_string(), weight))
}

/// Interpret the status of a hive-creation request.
///
/// Returns true when the hive was created, false when it already existed.
pub fn hive_creation_status(status: reqwest::StatusCode) -> anyhow::Result<bool> {
    match status {
        reqwest::StatusCode::CONFLICT => Ok(false),
        s if s.is_success() => Ok(true),
        s => anyhow::bail!("hive creation failed: {}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_link_accepts_peer_and_weight() {
        assert_eq!(parse_link("R2=0.75"), Ok(("R2".to_string(), 0.75)));
        assert_eq!(parse_link(" R2 = 1 "), Ok(("R2".to_string(), 1.0)));
        assert!(parse_link("R2").is_err());
        assert!(parse_link("=0.5").is_err());
        assert!(parse_link("R2=strong").is_err());
    }

    #[test]
    fn hive_creation_tolerates_only_conflict() {
        use reqwest::StatusCode;
        assert!(hive_creation_status(StatusCode::CREATED).unwrap());
        assert!(!hive_creation_status(StatusCode::CONFLICT).unwrap());
        assert!(hive_creation_status(StatusCode::INTERNAL_SERVER_ERROR).is_err());
        assert!(hive_creation_status(StatusCode::BAD_REQUEST).is_err());
    }
}
