//! Pod Registry: the authoritative store of pod records.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, PodId};
use crate::scheduler::SchedulingPolicy;

#[derive(Debug, Clone)]
pub struct PodRecord {
    pub cpu_request: u32,
    pub assigned_node: NodeId,
    pub policy: SchedulingPolicy,
}

/// Read-only view of a pod, handed out by every accessor. `assigned_node_healthy`
/// lets a caller see a stranded pod (assigned to an unhealthy node that
/// recovery failed to reschedule) instead of it looking like an ordinary
/// placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodView {
    pub pod_id: PodId,
    pub cpu_request: u32,
    pub assigned_node: NodeId,
    pub policy: SchedulingPolicy,
    pub assigned_node_healthy: bool,
}

struct Inner {
    pods: HashMap<PodId, PodRecord>,
    creation_order: Vec<PodId>,
}

pub struct PodRegistry {
    inner: RwLock<Inner>,
}

impl PodRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                pods: HashMap::new(),
                creation_order: Vec::new(),
            }),
        }
    }

    pub fn insert(&self, pod_id: PodId, record: PodRecord) {
        let mut guard = self.inner.write();
        guard.creation_order.push(pod_id.clone());
        guard.pods.insert(pod_id, record);
    }

    pub fn remove(&self, pod_id: &PodId) -> Option<PodRecord> {
        let mut guard = self.inner.write();
        let record = guard.pods.remove(pod_id);
        if record.is_some() {
            guard.creation_order.retain(|id| id != pod_id);
        }
        record
    }

    pub fn get(&self, pod_id: &PodId) -> Option<PodRecord> {
        self.inner.read().pods.get(pod_id).cloned()
    }

    /// Pods assigned to `node_id`, in creation order — required by recovery
    /// so a node's pods are reprocessed deterministically.
    pub fn pods_on_node(&self, node_id: &NodeId) -> Vec<PodId> {
        let guard = self.inner.read();
        guard
            .creation_order
            .iter()
            .filter(|id| {
                guard
                    .pods
                    .get(*id)
                    .map(|r| &r.assigned_node == node_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All pod ids in creation order, paired with their records.
    pub fn list_ordered(&self) -> Vec<(PodId, PodRecord)> {
        let guard = self.inner.read();
        guard
            .creation_order
            .iter()
            .filter_map(|id| guard.pods.get(id).map(|r| (id.clone(), r.clone())))
            .collect()
    }
}

impl Default for PodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(node: &NodeId) -> PodRecord {
        PodRecord {
            cpu_request: 1,
            assigned_node: node.clone(),
            policy: SchedulingPolicy::FirstFit,
        }
    }

    #[test]
    fn insert_and_get_round_trips() {
        let registry = PodRegistry::new();
        let node = NodeId::new();
        let pod = PodId::new();
        registry.insert(pod.clone(), record(&node));
        let got = registry.get(&pod).unwrap();
        assert_eq!(got.assigned_node, node);
    }

    #[test]
    fn pods_on_node_preserves_creation_order() {
        let registry = PodRegistry::new();
        let node = NodeId::new();
        let other = NodeId::new();
        let p1 = PodId::new();
        let p2 = PodId::new();
        let p3 = PodId::new();
        registry.insert(p1.clone(), record(&node));
        registry.insert(p2.clone(), record(&other));
        registry.insert(p3.clone(), record(&node));
        assert_eq!(registry.pods_on_node(&node), vec![p1, p3]);
    }

    #[test]
    fn remove_drops_from_creation_order() {
        let registry = PodRegistry::new();
        let node = NodeId::new();
        let pod = PodId::new();
        registry.insert(pod.clone(), record(&node));
        assert!(registry.remove(&pod).is_some());
        assert!(registry.get(&pod).is_none());
        assert!(registry.pods_on_node(&node).is_empty());
    }
}
