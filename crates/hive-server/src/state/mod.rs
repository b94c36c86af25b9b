//! Shared application state.

pub mod store;

pub use store::SwarmStore;

use std::sync::Arc;

use crate::analyzer::ConnectivityAnalyzer;
use crate::config::Config;
use crate::connections::ConnectionManager;
use crate::coordination::CoordinationService;
use crate::directory::{CommandQueue, DroneDirectory, HiveDirectory};
use crate::mesh_router::MeshRouter;
use crate::notify::{DroneNotifier, HiveNotifier};
use crate::topology::TopologyBuilder;

/// Composition root: one store, every service wired against it.
pub struct AppState {
    config: Config,
    store: Arc<SwarmStore>,
    pub drones: DroneDirectory,
    pub hives: HiveDirectory,
    pub commands: CommandQueue,
    pub connections: ConnectionManager,
    pub topology: TopologyBuilder,
    pub analyzer: ConnectivityAnalyzer,
    pub coordination: CoordinationService,
    pub notifier: HiveNotifier,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let notifier = DroneNotifier::from_config(&config);
        Self::with_notifier(config, notifier)
    }

    pub fn with_notifier(config: Config, notifier: DroneNotifier) -> Self {
        let store = Arc::new(SwarmStore::new(config.telemetry_history));
        let drones = DroneDirectory::new(store.clone());
        let hives = HiveDirectory::new(store.clone());
        let commands = CommandQueue::new(store.clone());
        let analyzer = ConnectivityAnalyzer::new(drones.clone(), hives.clone());
        let router = MeshRouter::new(analyzer.clone(), commands.clone());

        Self {
            connections: ConnectionManager::new(drones.clone()),
            topology: TopologyBuilder::new(store.clone(), config.topology_seed),
            coordination: CoordinationService::new(
                drones.clone(),
                hives.clone(),
                commands.clone(),
                router,
            ),
            notifier: HiveNotifier::new(store.clone(), notifier, config.notify_timeout_ms),
            analyzer,
            drones,
            hives,
            commands,
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<SwarmStore> {
        &self.store
    }
}
