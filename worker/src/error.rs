use std::time::Duration;

/// Why a job did not produce a result.
///
/// Every variant is delivered to the caller as a failed result; none of them
/// tears down the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("no running worker is available to accept the job")]
    WorkerUnavailable,
    #[error("worker process exited while the job was pending")]
    WorkerCrashed,
    #[error("worker did not reply within {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("worker supervisor has been stopped")]
    Stopped,
    #[error("malformed worker response: {0}")]
    MalformedResponse(String),
    #[error("job payload could not be encoded: {0}")]
    InvalidPayload(String),
    /// The worker handled the job and reported a failure.
    #[error("{0}")]
    Worker(String),
}

impl JobError {
    /// Whether retrying the same job later can succeed without caller changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WorkerUnavailable | Self::WorkerCrashed | Self::Timeout(_)
        )
    }
}
