use crate::cluster::KubeDeploymentStore;
use crate::controller::CanaryController;
use crate::docker_hub::DockerHubClient;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub type Controller = CanaryController<KubeDeploymentStore, DockerHubClient>;

#[derive(Clone)]
pub struct ControllerContext {
    pub(crate) controller: Arc<Controller>,
    pub(crate) health: Arc<ScanHealth>,
}

/// Result of the most recent scan, as reported by the readiness probe.
#[derive(Debug, Default)]
pub struct ScanHealth {
    last_scan_succeeded: AtomicBool,
}

impl ScanHealth {
    pub fn record(&self, succeeded: bool) {
        self.last_scan_succeeded.store(succeeded, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.last_scan_succeeded.load(Ordering::Relaxed)
    }
}
