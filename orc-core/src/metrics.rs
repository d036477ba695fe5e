//! Metrics emission helpers.
//!
//! Thin wrapper functions around the `metrics` crate's macros for the
//! gauges that need refreshing from a full node snapshot. Per-operation
//! counters (schedule outcomes, recovery outcomes) are emitted inline at
//! their call sites instead, since each is a one-off event rather than a
//! recomputed snapshot.

use crate::node::NodeRegistry;

/// Emits a point-in-time gauge snapshot of cluster-wide node health. Called
/// after every liveness tick and admission/termination.
pub fn record_node_snapshot(nodes: &NodeRegistry) {
    let all = nodes.list();
    let healthy = all
        .iter()
        .filter(|n| n.status == crate::node::NodeStatus::Healthy)
        .count();
    let unhealthy = all.len() - healthy;

    metrics::gauge!("orc_nodes_healthy").set(healthy as f64);
    metrics::gauge!("orc_nodes_unhealthy").set(unhealthy as f64);
    metrics::gauge!("orc_nodes_total").set(all.len() as f64);
}

pub fn record_pod_count(total_pods: usize) {
    metrics::gauge!("orc_pods_total").set(total_pods as f64);
}
