//! Recovery Coordinator: reschedules a failed node's pods onto healthy
//! nodes, using each pod's original policy.
//!
//! `on_node_unhealthy` walks every pod that was on the failed node, in
//! creation order, and asks the scheduler to place each one on a surviving
//! node. There is no multi-phase plan/execute/verify split: placement here
//! is instantaneous and in-memory, so a single attempt per pod suffices.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ids::NodeId;
use crate::node::NodeRegistry;
use crate::pod::PodRegistry;
use crate::scheduler::{ScheduleError, Scheduler};

/// Consumes node-failure notifications off a channel (so the Liveness
/// Monitor's tick never blocks on rescheduling) and also serves direct,
/// synchronous calls from `Terminate`, which reschedules immediately rather
/// than waiting for a channel hop.
pub struct RecoveryCoordinator {
    nodes: Arc<NodeRegistry>,
    pods: Arc<PodRegistry>,
    scheduler: Arc<Scheduler>,
    tx: mpsc::UnboundedSender<NodeId>,
}

impl RecoveryCoordinator {
    /// Builds the coordinator and spawns its background worker task.
    pub fn spawn(
        nodes: Arc<NodeRegistry>,
        pods: Arc<PodRegistry>,
        scheduler: Arc<Scheduler>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(Self {
            nodes,
            pods,
            scheduler,
            tx,
        });
        let worker = Arc::clone(&coordinator);
        tokio::spawn(async move { worker.run(rx).await });
        coordinator
    }

    async fn run(&self, mut rx: mpsc::UnboundedReceiver<NodeId>) {
        while let Some(node_id) = rx.recv().await {
            self.on_node_unhealthy(&node_id);
        }
    }

    /// Enqueues a node for recovery; never blocks the caller.
    pub fn notify(&self, node_id: NodeId) {
        // The receiver only drops once the coordinator itself does, so a
        // send error here would mean the coordinator has already been torn
        // down; nothing useful to do but drop the notification.
        let _ = self.tx.send(node_id);
    }

    /// Reschedules every pod on `node_id`, in creation order, onto a
    /// healthy node using each pod's original policy. Pods that cannot be
    /// placed are left on the unhealthy node and logged, never dropped from
    /// accounting (they remain visible as stranded in `ListPods`/`Stats`).
    pub fn on_node_unhealthy(&self, node_id: &NodeId) {
        let stranded_candidates = self.pods.pods_on_node(node_id);
        for pod_id in stranded_candidates {
            let Some(record) = self.pods.get(&pod_id) else {
                continue;
            };
            match self.scheduler.schedule(record.cpu_request, record.policy) {
                Ok((new_pod_id, new_node_id)) => {
                    // `release_and` removes the old `PodRecord` from inside
                    // the node-registry write-lock critical section, so the
                    // capacity credit on the source node and the pod's
                    // disappearance from the Pod Registry become visible
                    // together — never a window where the pod is gone from
                    // one registry but still accounted for on the other.
                    let pods = &self.pods;
                    self.nodes.release_and(node_id, &pod_id, record.cpu_request, || {
                        pods.remove(&pod_id);
                    });
                    tracing::info!(
                        old_pod = %pod_id,
                        new_pod = %new_pod_id,
                        from_node = %node_id,
                        to_node = %new_node_id,
                        "rescheduled pod away from unhealthy node"
                    );
                    metrics::counter!("orc_recovery_rescheduled_total").increment(1);
                }
                Err(ScheduleError::NoHealthyNodes) | Err(ScheduleError::InsufficientResources) | Err(ScheduleError::RaceLost) => {
                    tracing::warn!(
                        pod = %pod_id,
                        from_node = %node_id,
                        "could not reschedule pod from unhealthy node, leaving stranded"
                    );
                    metrics::counter!("orc_recovery_stranded_total").increment(1);
                }
                Err(ScheduleError::InvalidInput) => {
                    // A stored pod record with a zero cpu_request cannot
                    // occur: scheduling validates this at creation time.
                    unreachable!("pod records are only created with a validated cpu_request")
                }
            }
        }
    }
}
