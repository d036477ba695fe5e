//! Bin-packing scheduler: chooses a target node for a pod under one of five
//! policies and commits the placement atomically against the Node Registry.
//!
//! Candidate selection is a pure function over a pre-filtered snapshot,
//! wrapped by a retrying commit loop rather than holding any lock across
//! the decision.

use std::str::FromStr;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{NodeId, PodId};
use crate::node::{CommitError, NodeRegistry, NodeView};
use crate::pod::{PodRecord, PodRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingPolicy {
    FirstFit,
    BestFit,
    WorstFit,
    RoundRobin,
    RandomFit,
}

impl FromStr for SchedulingPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-fit" => Ok(SchedulingPolicy::FirstFit),
            "best-fit" => Ok(SchedulingPolicy::BestFit),
            "worst-fit" => Ok(SchedulingPolicy::WorstFit),
            "round-robin" => Ok(SchedulingPolicy::RoundRobin),
            "random-fit" => Ok(SchedulingPolicy::RandomFit),
            other => Err(CoreError::InvalidInput(format!(
                "unknown scheduling algorithm '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    InvalidInput,
    NoHealthyNodes,
    InsufficientResources,
    RaceLost,
}

impl From<ScheduleError> for CoreError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::InvalidInput => {
                CoreError::InvalidInput("cpu_request must be a positive integer".into())
            }
            ScheduleError::NoHealthyNodes => CoreError::NoHealthyNodes,
            ScheduleError::InsufficientResources => CoreError::InsufficientResources,
            ScheduleError::RaceLost => CoreError::RaceLost,
        }
    }
}

pub struct Scheduler {
    nodes: std::sync::Arc<NodeRegistry>,
    pods: std::sync::Arc<PodRegistry>,
    rng: Mutex<StdRng>,
    max_attempts: u32,
}

impl Scheduler {
    pub fn new(
        nodes: std::sync::Arc<NodeRegistry>,
        pods: std::sync::Arc<PodRegistry>,
        random_seed: Option<u64>,
        max_attempts: u32,
    ) -> Self {
        let rng = match random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes,
            pods,
            rng: Mutex::new(rng),
            max_attempts,
        }
    }

    /// Selects and commits a placement for a pod requesting `cpu_request`
    /// units of CPU under `policy`. Retries up to `max_attempts` times on a
    /// lost race before giving up with `RaceLost`.
    pub fn schedule(
        &self,
        cpu_request: u32,
        policy: SchedulingPolicy,
    ) -> Result<(PodId, NodeId), ScheduleError> {
        if cpu_request == 0 {
            return Err(ScheduleError::InvalidInput);
        }

        for _ in 0..self.max_attempts.max(1) {
            let healthy = self.nodes.snapshot_healthy();
            if healthy.is_empty() {
                return Err(ScheduleError::NoHealthyNodes);
            }
            let eligible: Vec<&NodeView> = healthy
                .iter()
                .filter(|n| n.available >= cpu_request)
                .collect();
            if eligible.is_empty() {
                return Err(ScheduleError::InsufficientResources);
            }

            let candidate = self.select_candidate(policy, &eligible).clone();
            let pod_id = PodId::new();
            // `commit_reservation_and` runs the Pod Registry insert from
            // inside the Node Registry's write-lock critical section, so
            // the capacity decrement and the new `PodRecord` commit as one
            // unit — no reader can observe `available` already reduced
            // without the pod present, or vice versa.
            let commit = self.nodes.commit_reservation_and(
                &candidate,
                pod_id.clone(),
                cpu_request,
                || {
                    self.pods.insert(
                        pod_id.clone(),
                        PodRecord {
                            cpu_request,
                            assigned_node: candidate.clone(),
                            policy,
                        },
                    );
                },
            );
            match commit {
                Ok(()) => {
                    metrics::counter!("orc_schedule_success_total", "policy" => policy_label(policy)).increment(1);
                    return Ok((pod_id, candidate));
                }
                Err(CommitError::NotFound) | Err(CommitError::NotHealthy) | Err(CommitError::Insufficient) => {
                    // Another scheduler won the race, or the node changed
                    // state between snapshot and commit. Retry with a fresh
                    // snapshot.
                    continue;
                }
            }
        }

        metrics::counter!("orc_schedule_race_lost_total", "policy" => policy_label(policy)).increment(1);
        Err(ScheduleError::RaceLost)
    }

    fn select_candidate<'a>(
        &self,
        policy: SchedulingPolicy,
        eligible: &[&'a NodeView],
    ) -> &'a NodeId {
        match policy {
            SchedulingPolicy::FirstFit => &eligible[0].node_id,
            SchedulingPolicy::BestFit => pick_extreme(eligible, |n| n.available, false),
            SchedulingPolicy::WorstFit => pick_extreme(eligible, |n| n.available, true),
            SchedulingPolicy::RoundRobin => pick_extreme(eligible, |n| n.pod_count as u32, false),
            SchedulingPolicy::RandomFit => {
                let index = self.rng.lock().gen_range(0..eligible.len());
                &eligible[index].node_id
            }
        }
    }
}

/// Folds `eligible` (already in insertion order) to the element with the
/// min (`want_max = false`) or max (`want_max = true`) key, keeping the
/// *first* occurrence on ties. `Iterator::max_by_key` keeps the *last*
/// occurrence on ties, which would violate the documented tie-break, so
/// this is a manual fold rather than a one-liner.
fn pick_extreme<'a, T>(
    eligible: &[&'a NodeView],
    key_fn: impl Fn(&NodeView) -> T,
    want_max: bool,
) -> &'a NodeId
where
    T: PartialOrd,
{
    let mut best = eligible[0];
    let mut best_key = key_fn(best);
    for candidate in &eligible[1..] {
        let candidate_key = key_fn(candidate);
        let better = if want_max {
            candidate_key > best_key
        } else {
            candidate_key < best_key
        };
        if better {
            best = candidate;
            best_key = candidate_key;
        }
    }
    &best.node_id
}

fn policy_label(policy: SchedulingPolicy) -> &'static str {
    match policy {
        SchedulingPolicy::FirstFit => "first-fit",
        SchedulingPolicy::BestFit => "best-fit",
        SchedulingPolicy::WorstFit => "worst-fit",
        SchedulingPolicy::RoundRobin => "round-robin",
        SchedulingPolicy::RandomFit => "random-fit",
    }
}
