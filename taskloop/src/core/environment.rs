//! Execution environment policy.
//!
//! Choosing where a tool runs is a policy seam: the default resolver applies a
//! fixed preference order and never fails. Future resolvers may probe actual
//! availability (installed runtimes, site configuration) per tool.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Known execution environments, most preferred first: container runtimes,
/// then package environments, then bare local execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionEnv {
    Docker,
    Singularity,
    Conda,
    Local,
}

impl ExecutionEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionEnv::Docker => "docker",
            ExecutionEnv::Singularity => "singularity",
            ExecutionEnv::Conda => "conda",
            ExecutionEnv::Local => "local",
        }
    }
}

impl fmt::Display for ExecutionEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses an execution environment for a tool. Deterministic and
/// side-effect-free; resolution never fails.
pub trait EnvironmentResolver {
    fn resolve(&self, tool_name: &str) -> ExecutionEnv;
}

/// Default policy: walk a fixed preference order and take the first entry.
#[derive(Debug, Clone)]
pub struct FixedOrderResolver {
    order: Vec<ExecutionEnv>,
}

impl FixedOrderResolver {
    pub fn new(order: Vec<ExecutionEnv>) -> Self {
        Self { order }
    }
}

impl Default for FixedOrderResolver {
    fn default() -> Self {
        Self::new(vec![
            ExecutionEnv::Docker,
            ExecutionEnv::Singularity,
            ExecutionEnv::Conda,
            ExecutionEnv::Local,
        ])
    }
}

impl EnvironmentResolver for FixedOrderResolver {
    fn resolve(&self, _tool_name: &str) -> ExecutionEnv {
        self.order.first().copied().unwrap_or(ExecutionEnv::Local)
    }
}
