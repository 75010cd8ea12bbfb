//! Failure taxonomy for orchestration runs.
//!
//! All three types propagate through `anyhow::Error`; callers that need to
//! react to a specific failure recover it with `downcast_ref`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The planner could not produce or revise a plan.
///
/// Fatal to the current run. The core never retries planning; a retry policy,
/// if any, belongs inside the planner implementation.
#[derive(Debug, Error)]
#[error("planning failed: {reason}")]
pub struct PlanningFailure {
    pub reason: String,
}

impl PlanningFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A step's tool or command failed: non-zero exit, tool error, provider error.
///
/// Recorded as a step report (visible to replanning) before it propagates.
/// For command steps `cause` includes the captured standard error.
#[derive(Debug, Error)]
#[error("step '{description}' failed: {cause}")]
pub struct ExecutionFailure {
    /// Description of the step that failed.
    pub description: String,
    /// Underlying cause, human readable.
    pub cause: String,
}

impl ExecutionFailure {
    pub fn new(description: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cause: cause.into(),
        }
    }
}

/// The audit substrate could not create, write, or close a log artifact.
///
/// Always fatal: the every-stage-logged guarantee cannot be partially honored,
/// so continuing silently would corrupt the audit trail.
#[derive(Debug, Error)]
#[error("audit log I/O failed at {}: {source}", path.display())]
pub struct LogIoFailure {
    /// Path of the artifact that could not be written.
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl LogIoFailure {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}
