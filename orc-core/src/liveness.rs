//! Liveness Monitor: a background ticker that demotes stale nodes and hands
//! them to the Recovery Coordinator.
//!
//! A `tokio::spawn`ed `run_loop` driven by `tokio::time::interval`, with a
//! shared running flag for cooperative shutdown instead of a forced abort.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::node::NodeRegistry;
use crate::recovery::RecoveryCoordinator;

pub struct LivenessMonitor {
    nodes: Arc<NodeRegistry>,
    recovery: Arc<RecoveryCoordinator>,
    tick: Duration,
    timeout: Duration,
    running: Arc<RwLock<bool>>,
}

impl LivenessMonitor {
    pub fn new(
        nodes: Arc<NodeRegistry>,
        recovery: Arc<RecoveryCoordinator>,
        tick: Duration,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            nodes,
            recovery,
            tick,
            timeout,
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Spawns the background tick loop. Returns its join handle; the
    /// monitor keeps running until [`LivenessMonitor::stop`] is called.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        *self.running.write() = true;
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run_loop().await })
    }

    pub fn stop(&self) {
        *self.running.write() = false;
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    async fn run_loop(&self) {
        let mut interval = tokio::time::interval(self.tick);
        loop {
            interval.tick().await;
            if !self.is_running() {
                break;
            }
            self.check_all_nodes(tokio::time::Instant::now());
        }
    }

    /// Runs a single evaluation pass; exposed separately from the spawned
    /// loop so tests can drive it without waiting on real intervals.
    pub fn check_all_nodes(&self, now: tokio::time::Instant) {
        let transitioned = self.nodes.mark_stale_unhealthy(self.timeout, now);
        for node_id in transitioned {
            tracing::warn!(node_id = %node_id, "node missed heartbeat deadline, marking unhealthy");
            self.recovery.notify(node_id);
        }
    }
}
