//! Node Registry: the authoritative store of node records.
//!
//! A single `RwLock<HashMap<_, _>>` guards node state, with read-only view
//! structs handed out to callers instead of guard references.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{CoreError, Result};
use crate::ids::{NodeId, PodId};

/// Liveness state of a node. Never transitions `Unhealthy -> Healthy` within
/// a process run; see the no-resurrection decision in the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Healthy,
    Unhealthy,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Healthy => "healthy",
            NodeStatus::Unhealthy => "unhealthy",
        }
    }
}

struct NodeRecord {
    capacity: u32,
    available: u32,
    status: NodeStatus,
    pods: std::collections::HashSet<PodId>,
    last_heartbeat: Instant,
    insertion_seq: u64,
}

/// Read-only, point-in-time view of a node, handed out by every accessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub node_id: NodeId,
    pub capacity: u32,
    pub available: u32,
    pub status: NodeStatus,
    pub pod_count: usize,
    pub insertion_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitError {
    NotFound,
    NotHealthy,
    Insufficient,
}

struct Inner {
    nodes: HashMap<NodeId, NodeRecord>,
    next_seq: u64,
}

/// Authoritative node store. A single write-lock acquisition is the atomic
/// unit for every state transition; no code path holds this lock across an
/// `.await`.
pub struct NodeRegistry {
    inner: RwLock<Inner>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                nodes: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Admits a new node with the given capacity. Returns its fresh id.
    pub fn admit(&self, capacity: u32) -> Result<NodeId> {
        if capacity == 0 {
            return Err(CoreError::InvalidInput(
                "node capacity must be a positive integer".into(),
            ));
        }
        let node_id = NodeId::new();
        let mut guard = self.inner.write();
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.nodes.insert(
            node_id.clone(),
            NodeRecord {
                capacity,
                available: capacity,
                status: NodeStatus::Healthy,
                pods: std::collections::HashSet::new(),
                last_heartbeat: Instant::now(),
                insertion_seq: seq,
            },
        );
        Ok(node_id)
    }

    /// Refreshes `last_heartbeat`. Never resurrects an unhealthy node.
    pub fn record_heartbeat(&self, node_id: &NodeId, now: Instant) -> Result<()> {
        let mut guard = self.inner.write();
        let record = guard
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| CoreError::NotFound(format!("node {node_id} not found")))?;
        record.last_heartbeat = now;
        Ok(())
    }

    /// Marks a node unhealthy (idempotent). Does not itself trigger
    /// recovery; callers (the orchestrator facade) are responsible for
    /// notifying the recovery coordinator.
    pub fn terminate(&self, node_id: &NodeId) -> Result<()> {
        let mut guard = self.inner.write();
        let record = guard
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| CoreError::NotFound(format!("node {node_id} not found")))?;
        record.status = NodeStatus::Unhealthy;
        Ok(())
    }

    /// Atomically verifies health and capacity, decrements `available`, and
    /// records `pod_id` on the node — the single logical unit described by
    /// the reserve-and-commit operation.
    pub fn commit_reservation(
        &self,
        node_id: &NodeId,
        pod_id: PodId,
        cpu: u32,
    ) -> std::result::Result<(), CommitError> {
        self.commit_reservation_and(node_id, pod_id, cpu, || {})
    }

    /// Same reserve-and-commit as [`NodeRegistry::commit_reservation`], but
    /// runs `on_committed` before releasing the node-registry write lock.
    /// Callers use this to record the matching `PodRecord` in the Pod
    /// Registry from *inside* the node-registry critical section, so the
    /// capacity decrement and the pod record become visible to any other
    /// reader as a single unit — never a decremented `available` with no
    /// corresponding pod, or vice versa. `on_committed` only runs on success.
    pub fn commit_reservation_and<F>(
        &self,
        node_id: &NodeId,
        pod_id: PodId,
        cpu: u32,
        on_committed: F,
    ) -> std::result::Result<(), CommitError>
    where
        F: FnOnce(),
    {
        let mut guard = self.inner.write();
        let record = guard.nodes.get_mut(node_id).ok_or(CommitError::NotFound)?;
        if record.status != NodeStatus::Healthy {
            return Err(CommitError::NotHealthy);
        }
        if record.available < cpu {
            return Err(CommitError::Insufficient);
        }
        record.available -= cpu;
        record.pods.insert(pod_id);
        on_committed();
        Ok(())
    }

    /// Credits `cpu` back and removes `pod_id` from the node's pod set.
    /// Idempotent: a no-op if the pod is not present or the node is gone.
    pub fn release(&self, node_id: &NodeId, pod_id: &PodId, cpu: u32) {
        self.release_and(node_id, pod_id, cpu, || {})
    }

    /// Same release as [`NodeRegistry::release`], but runs `on_released`
    /// before releasing the node-registry write lock — callers use this to
    /// remove the matching `PodRecord` from the Pod Registry from inside the
    /// same critical section, so the capacity credit and the pod-registry
    /// removal become visible together rather than through a window where
    /// the pod is gone from one registry but still accounted for in the
    /// other. `on_released` runs unconditionally, even if the node-side
    /// release itself was a no-op (unknown node or pod already absent).
    pub fn release_and<F>(&self, node_id: &NodeId, pod_id: &PodId, cpu: u32, on_released: F)
    where
        F: FnOnce(),
    {
        let mut guard = self.inner.write();
        if let Some(record) = guard.nodes.get_mut(node_id) {
            if record.pods.remove(pod_id) {
                record.available += cpu;
            }
        }
        on_released();
    }

    /// Insertion-ordered view of every currently healthy node.
    pub fn snapshot_healthy(&self) -> Vec<NodeView> {
        let guard = self.inner.read();
        let mut views: Vec<NodeView> = guard
            .nodes
            .iter()
            .filter(|(_, r)| r.status == NodeStatus::Healthy)
            .map(|(id, r)| NodeView {
                node_id: id.clone(),
                capacity: r.capacity,
                available: r.available,
                status: r.status,
                pod_count: r.pods.len(),
                insertion_seq: r.insertion_seq,
            })
            .collect();
        views.sort_by_key(|v| v.insertion_seq);
        views
    }

    /// Transitions every currently-healthy node whose heartbeat is older
    /// than `timeout` to `Unhealthy`, returning the ids actually
    /// transitioned. Snapshots node ids before mutating so concurrent
    /// admission/termination during the scan is safe.
    pub fn mark_stale_unhealthy(&self, timeout: Duration, now: Instant) -> Vec<NodeId> {
        let candidate_ids: Vec<NodeId> = {
            let guard = self.inner.read();
            guard
                .nodes
                .iter()
                .filter(|(_, r)| {
                    r.status == NodeStatus::Healthy
                        && now.saturating_duration_since(r.last_heartbeat) > timeout
                })
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut transitioned = Vec::new();
        if candidate_ids.is_empty() {
            return transitioned;
        }
        let mut guard = self.inner.write();
        for id in candidate_ids {
            if let Some(record) = guard.nodes.get_mut(&id) {
                if record.status == NodeStatus::Healthy
                    && now.saturating_duration_since(record.last_heartbeat) > timeout
                {
                    record.status = NodeStatus::Unhealthy;
                    transitioned.push(id);
                }
            }
        }
        transitioned
    }

    pub fn get(&self, node_id: &NodeId) -> Option<NodeView> {
        let guard = self.inner.read();
        guard.nodes.get(node_id).map(|r| NodeView {
            node_id: node_id.clone(),
            capacity: r.capacity,
            available: r.available,
            status: r.status,
            pod_count: r.pods.len(),
            insertion_seq: r.insertion_seq,
        })
    }

    pub fn is_healthy(&self, node_id: &NodeId) -> bool {
        let guard = self.inner.read();
        guard
            .nodes
            .get(node_id)
            .map(|r| r.status == NodeStatus::Healthy)
            .unwrap_or(false)
    }

    /// Insertion-ordered view of every node, healthy or not.
    pub fn list(&self) -> Vec<NodeView> {
        let guard = self.inner.read();
        let mut views: Vec<NodeView> = guard
            .nodes
            .iter()
            .map(|(id, r)| NodeView {
                node_id: id.clone(),
                capacity: r.capacity,
                available: r.available,
                status: r.status,
                pod_count: r.pods.len(),
                insertion_seq: r.insertion_seq,
            })
            .collect();
        views.sort_by_key(|v| v.insertion_seq);
        views
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_rejects_zero_capacity() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.admit(0),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn admit_creates_healthy_node_with_full_capacity() {
        let registry = NodeRegistry::new();
        let id = registry.admit(4).unwrap();
        let view = registry.get(&id).unwrap();
        assert_eq!(view.available, 4);
        assert_eq!(view.status, NodeStatus::Healthy);
        assert_eq!(view.pod_count, 0);
    }

    #[test]
    fn commit_reservation_decrements_available_and_tracks_pod() {
        let registry = NodeRegistry::new();
        let id = registry.admit(4).unwrap();
        let pod_id = PodId::new();
        registry.commit_reservation(&id, pod_id.clone(), 3).unwrap();
        let view = registry.get(&id).unwrap();
        assert_eq!(view.available, 1);
        assert_eq!(view.pod_count, 1);
    }

    #[test]
    fn commit_reservation_rejects_insufficient_capacity() {
        let registry = NodeRegistry::new();
        let id = registry.admit(2).unwrap();
        let err = registry
            .commit_reservation(&id, PodId::new(), 3)
            .unwrap_err();
        assert_eq!(err, CommitError::Insufficient);
    }

    #[test]
    fn commit_reservation_rejects_unhealthy_node() {
        let registry = NodeRegistry::new();
        let id = registry.admit(4).unwrap();
        registry.terminate(&id).unwrap();
        let err = registry
            .commit_reservation(&id, PodId::new(), 1)
            .unwrap_err();
        assert_eq!(err, CommitError::NotHealthy);
    }

    #[test]
    fn release_credits_capacity_back_and_is_idempotent() {
        let registry = NodeRegistry::new();
        let id = registry.admit(4).unwrap();
        let pod_id = PodId::new();
        registry.commit_reservation(&id, pod_id.clone(), 3).unwrap();
        registry.release(&id, &pod_id, 3);
        assert_eq!(registry.get(&id).unwrap().available, 4);
        // idempotent: releasing again is a no-op, not a double-credit.
        registry.release(&id, &pod_id, 3);
        assert_eq!(registry.get(&id).unwrap().available, 4);
    }

    #[test]
    fn heartbeat_never_resurrects_unhealthy_node() {
        let registry = NodeRegistry::new();
        let id = registry.admit(4).unwrap();
        registry.terminate(&id).unwrap();
        registry.record_heartbeat(&id, Instant::now()).unwrap();
        assert_eq!(registry.get(&id).unwrap().status, NodeStatus::Unhealthy);
    }

    #[test]
    fn snapshot_healthy_excludes_unhealthy_and_preserves_insertion_order() {
        let registry = NodeRegistry::new();
        let a = registry.admit(1).unwrap();
        let b = registry.admit(1).unwrap();
        let c = registry.admit(1).unwrap();
        registry.terminate(&b).unwrap();
        let snapshot = registry.snapshot_healthy();
        let ids: Vec<&NodeId> = snapshot.iter().map(|v| &v.node_id).collect();
        assert_eq!(ids, vec![&a, &c]);
    }
}
