//! Execution events reported by the job engine.

use serde::{Deserialize, Serialize};

/// Progress of a single step within a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Job the progress belongs to, when the engine reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Node currently being executed.
    pub node_id: String,
    /// Current step.
    pub value: u64,
    /// Total number of steps.
    pub max: u64,
}

impl Progress {
    /// Completion percentage in `0.0..=100.0`, or zero when `max` is zero.
    pub fn percent(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.value as f64 / self.max as f64 * 100.0).min(100.0)
    }
}

/// Event published by the execution channel.
///
/// Events are transient: they are delivered to the subscribers that are
/// listening at the time and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A node reported step progress.
    Progress(Progress),
    /// A node finished and produced its outputs.
    Completed {
        /// Job that produced the output.
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        /// Node that finished, when reported.
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },
    /// The job failed on the engine.
    Failed {
        /// Job that failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        /// Human readable failure description.
        message: String,
    },
}

impl ExecutionEvent {
    /// Returns the job identifier carried by the event, if any.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Progress(progress) => progress.job_id.as_deref(),
            Self::Completed { job_id, .. } | Self::Failed { job_id, .. } => job_id.as_deref(),
        }
    }

    /// Returns whether the event belongs to the given job.
    ///
    /// Events without a job identifier match every job.
    pub fn concerns(&self, job_id: &str) -> bool {
        self.job_id().is_none_or(|id| id == job_id)
    }

    /// Returns whether this event ends a job.
    ///
    /// Only failures do. The engine reports one [`Completed`](Self::Completed)
    /// per output node, so a finished job is recognised by its history
    /// rather than by any single event.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
