//! One outstanding call to the worker.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::JobError;
use crate::supervisor::Command;

/// Resolution of a pending job, delivered by the supervisor task.
pub(crate) type JobOutcome = Result<Value, JobError>;

/// Handle to a dispatched job.
///
/// The frame has already been handed to the worker when this exists. Dropping
/// the handle does not cancel the job; the reply is discarded when it arrives.
#[derive(Debug)]
pub struct RequestJob {
    id: u64,
    kind: String,
    rx: oneshot::Receiver<JobOutcome>,
    timeout: Option<Duration>,
    commands: mpsc::Sender<Command>,
}

impl RequestJob {
    pub(crate) fn new(
        id: u64,
        kind: String,
        rx: oneshot::Receiver<JobOutcome>,
        timeout: Option<Duration>,
        commands: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            id,
            kind,
            rx,
            timeout,
            commands,
        }
    }

    /// Correlation id carried on the wire.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Wait for the reply, honouring the configured deadline.
    pub async fn wait(self) -> Result<Value, JobError> {
        let Self {
            id,
            kind,
            rx,
            timeout,
            commands,
        } = self;

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(id, kind = %kind, "job timed out after {}ms", limit.as_millis());
                    // Best effort: a full channel only delays the cleanup until
                    // the next crash or shutdown clears the table.
                    let _ = commands.try_send(Command::Forget { id });
                    return Err(JobError::Timeout(limit));
                }
            },
            None => rx.await,
        };

        // The supervisor task dropped the sender without resolving: it is gone.
        received.unwrap_or(Err(JobError::Stopped))
    }

    /// Wait for the reply and deserialize it.
    pub async fn wait_as<T: DeserializeOwned>(self) -> Result<T, JobError> {
        let id = self.id;
        let value = self.wait().await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::debug!(id, "reply did not match the expected shape: {e}");
            JobError::MalformedResponse(e.to_string())
        })
    }
}
