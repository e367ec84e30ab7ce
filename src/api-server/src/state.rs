use bastion_assets::{AssetStore, TaskDispatcher};
use bastion_authz::RbacEngine;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::task_client::TaskApiClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Asset inventory
    pub assets: Arc<dyn AssetStore>,

    /// Access control engine
    pub rbac: Arc<RbacEngine>,

    /// Queue for hardware refresh and connectivity jobs
    pub dispatcher: Arc<dyn TaskDispatcher>,

    /// Remote task API
    pub task_api: TaskApiClient,

    /// Random source for gateway selection
    pub rng: Arc<Mutex<StdRng>>,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(
        assets: Arc<dyn AssetStore>,
        rbac: Arc<RbacEngine>,
        dispatcher: Arc<dyn TaskDispatcher>,
        task_api: TaskApiClient,
    ) -> Self {
        Self {
            assets,
            rbac,
            dispatcher,
            task_api,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Replaces the random source, e.g. with a seeded one
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Arc::new(Mutex::new(rng));
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
