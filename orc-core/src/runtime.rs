//! Pluggable container-runtime backend.
//!
//! A small `async_trait` seam with a single concrete implementation shipped:
//! a simulation stand-in. A real container backend is out of scope, but the
//! trait boundary is real so one could be added without touching the core.

use async_trait::async_trait;

use crate::error::Result;
use crate::ids::NodeId;

/// Starts (or simulates starting) a worker process backing an admitted
/// node. Failure here is never fatal to admission — see
/// [`crate::orchestrator::Orchestrator::admit_node`].
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn start_worker(&self, node_id: &NodeId, cpu_cores: u32) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Default backend: performs no I/O and always succeeds immediately. Stands
/// in for a real container runtime so the system runs end to end in
/// simulation mode with no external dependency.
pub struct SimulatedRuntime;

#[async_trait]
impl ContainerRuntime for SimulatedRuntime {
    async fn start_worker(&self, _node_id: &NodeId, _cpu_cores: u32) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "simulated"
    }
}
