//! WorkerSupervisor facade and the task that owns the worker.
//!
//! A single supervisor task owns the current worker, the pending-job table,
//! the lifecycle state and the restart timer. Callers reach it through a
//! command channel; each worker's reader task reaches it through an output
//! channel tagged with that worker's generation, so leftovers from a dead
//! worker can never touch its successor's jobs.
//!
//! Construction IS initialization: `start()` returns once the first worker
//! is running.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::error::JobError;
use crate::job::{JobOutcome, RequestJob};
use crate::process::{RunningWorker, WorkerOutput};
use crate::protocol::{self, JobEnvelope, Reply};
use crate::types::{ExitReason, SupervisorEvent, SupervisorState, WorkerConfig};

const COMMAND_CHANNEL_CAPACITY: usize = 256;
const OUTPUT_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub(crate) enum Command {
    Dispatch {
        kind: String,
        payload: Value,
        reply: oneshot::Sender<Result<(u64, oneshot::Receiver<JobOutcome>), JobError>>,
    },
    /// The caller gave up waiting; drop the pending entry.
    Forget { id: u64 },
    WorkerPid {
        reply: oneshot::Sender<Option<u32>>,
    },
    Stop {
        done: oneshot::Sender<()>,
    },
}

struct PendingJob {
    kind: String,
    reply: oneshot::Sender<JobOutcome>,
}

/// Handle to the supervised worker.
///
/// Cheap to clone; all clones talk to the same supervisor task. When the last
/// clone is dropped the task shuts the worker down.
#[derive(Clone, Debug)]
pub struct WorkerSupervisor {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SupervisorState>,
    events: broadcast::Sender<SupervisorEvent>,
    request_timeout: Option<Duration>,
}

impl WorkerSupervisor {
    /// Spawn the worker and start supervising it.
    ///
    /// Fails if the first worker cannot be spawned; later spawn failures are
    /// retried by the supervisor.
    pub async fn start(config: WorkerConfig) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SupervisorState::Starting);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let request_timeout = config.request_timeout();

        let mut task = SupervisorTask::new(config, state_tx, event_tx.clone(), command_rx);
        let pid = task.spawn_worker().await?;
        task.set_state(SupervisorState::Running);
        task.publish(SupervisorEvent::Started {
            generation: task.generation,
            pid,
        });
        tokio::spawn(task.run());

        Ok(Self {
            commands: command_tx,
            state: state_rx,
            events: event_tx,
            request_timeout,
        })
    }

    /// Dispatch a job and return its handle once the frame is queued for the worker.
    ///
    /// Handing the job to the supervisor task is bounded by the request
    /// deadline, like the wait for its reply.
    pub async fn submit(&self, kind: &str, payload: Value) -> Result<RequestJob, JobError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = Command::Dispatch {
            kind: kind.to_string(),
            payload,
            reply: reply_tx,
        };
        let handoff = async {
            self.commands
                .send(command)
                .await
                .map_err(|_| JobError::Stopped)?;
            reply_rx.await.map_err(|_| JobError::Stopped)?
        };

        let (id, rx) = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, handoff).await.map_err(|_| {
                tracing::warn!(kind, "supervisor did not accept job within {}ms", limit.as_millis());
                JobError::Timeout(limit)
            })??,
            None => handoff.await?,
        };
        Ok(RequestJob::new(
            id,
            kind.to_string(),
            rx,
            self.request_timeout,
            self.commands.clone(),
        ))
    }

    /// Dispatch a job and wait for its reply.
    pub async fn request(&self, kind: &str, payload: Value) -> Result<Value, JobError> {
        self.submit(kind, payload).await?.wait().await
    }

    /// Dispatch a job and deserialize its reply into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        kind: &str,
        payload: Value,
    ) -> Result<T, JobError> {
        self.submit(kind, payload).await?.wait_as().await
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Wait until the supervisor reaches `target`, or `limit` elapses.
    ///
    /// Returns whether the state was reached.
    pub async fn wait_for_state(&self, target: SupervisorState, limit: Duration) -> bool {
        let mut state = self.state.clone();
        let reached = matches!(
            tokio::time::timeout(limit, state.wait_for(|s| *s == target)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Subscribe to lifecycle events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    /// OS process id of the current worker, if one is running.
    pub async fn worker_pid(&self) -> Option<u32> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::WorkerPid { reply: tx })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Terminate the worker and stop supervising. Pending jobs fail with `Stopped`.
    ///
    /// Safe to call more than once.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Stop { done: tx }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

struct SupervisorTask {
    config: WorkerConfig,
    state: SupervisorState,
    state_tx: watch::Sender<SupervisorState>,
    events: broadcast::Sender<SupervisorEvent>,
    commands: mpsc::Receiver<Command>,
    output_tx: mpsc::Sender<WorkerOutput>,
    output_rx: mpsc::Receiver<WorkerOutput>,
    worker: Option<RunningWorker>,
    generation: u64,
    /// Never reset, so ids stay unique across restarts.
    next_id: u64,
    pending: HashMap<u64, PendingJob>,
    restart_at: Option<Instant>,
}

impl SupervisorTask {
    fn new(
        config: WorkerConfig,
        state_tx: watch::Sender<SupervisorState>,
        events: broadcast::Sender<SupervisorEvent>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        Self {
            config,
            state: SupervisorState::Starting,
            state_tx,
            events,
            commands,
            output_tx,
            output_rx,
            worker: None,
            generation: 0,
            next_id: 1,
            pending: HashMap::new(),
            restart_at: None,
        }
    }

    async fn run(mut self) {
        loop {
            let restart_at = self.restart_at;
            let restart_due = async move {
                match restart_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("all supervisor handles dropped, shutting down");
                        self.shutdown().await;
                        break;
                    }
                },
                Some(output) = self.output_rx.recv() => self.handle_output(output).await,
                () = restart_due => self.restart().await,
            }
        }
    }

    fn set_state(&mut self, state: SupervisorState) {
        tracing::debug!(from = %self.state, to = %state, "supervisor state change");
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn publish(&self, event: SupervisorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn spawn_worker(&mut self) -> Result<Option<u32>> {
        self.generation += 1;
        let worker =
            RunningWorker::spawn(self.generation, &self.config, self.output_tx.clone()).await?;
        let pid = worker.pid();
        self.worker = Some(worker);
        Ok(pid)
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Dispatch {
                kind,
                payload,
                reply,
            } => {
                let _ = reply.send(self.dispatch(kind, payload));
            }
            Command::Forget { id } => {
                if let Some(job) = self.pending.remove(&id) {
                    tracing::debug!(id, kind = %job.kind, "forgot abandoned job");
                }
            }
            Command::WorkerPid { reply } => {
                let _ = reply.send(self.worker.as_ref().and_then(RunningWorker::pid));
            }
            Command::Stop { done } => {
                self.shutdown().await;
                let _ = done.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Never waits on the worker: a worker that stops reading must not stall
    /// the task that would stop or replace it.
    fn dispatch(
        &mut self,
        kind: String,
        payload: Value,
    ) -> Result<(u64, oneshot::Receiver<JobOutcome>), JobError> {
        let worker = match (self.state, self.worker.as_ref()) {
            (SupervisorState::Running, Some(worker)) => worker,
            (SupervisorState::ShuttingDown | SupervisorState::Stopped, _) => {
                return Err(JobError::Stopped);
            }
            _ => return Err(JobError::WorkerUnavailable),
        };

        let id = self.next_id;
        self.next_id += 1;
        let frame = Value::from(JobEnvelope::new(id, kind.as_str(), payload));

        if let Err(e) = worker.send(frame) {
            tracing::warn!(id, kind = %kind, "failed to queue job for worker: {e:#}");
            return Err(JobError::WorkerUnavailable);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, PendingJob { kind, reply: tx });
        tracing::trace!(id, generation = self.generation, "job dispatched");
        Ok((id, rx))
    }

    async fn handle_output(&mut self, output: WorkerOutput) {
        match output {
            WorkerOutput::Frame { generation, frame } => self.route_reply(generation, &frame),
            WorkerOutput::Exited { generation, reason } => {
                self.handle_exit(generation, reason).await;
            }
        }
    }

    fn route_reply(&mut self, generation: u64, frame: &Value) {
        if generation != self.generation {
            tracing::debug!(generation, "ignoring frame from a previous worker");
            return;
        }

        let reply = match protocol::parse_reply(frame) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(generation, "dropping malformed worker reply: {e}");
                return;
            }
        };

        let Some(job) = self.pending.remove(&reply.id()) else {
            tracing::warn!(
                id = reply.id(),
                "dropping reply for unknown or already finished job"
            );
            return;
        };

        let outcome = match reply {
            Reply::Success { result, .. } => Ok(result),
            Reply::Failure { message, .. } => Err(JobError::Worker(message)),
        };
        tracing::trace!(kind = %job.kind, ok = outcome.is_ok(), "job resolved");
        // The caller may have stopped waiting.
        let _ = job.reply.send(outcome);
    }

    async fn handle_exit(&mut self, generation: u64, reason: ExitReason) {
        if generation != self.generation || self.state != SupervisorState::Running {
            tracing::debug!(generation, state = %self.state, "ignoring worker exit");
            return;
        }

        if let Some(worker) = self.worker.take() {
            worker.reap().await;
        }

        self.set_state(SupervisorState::Crashed);
        let rejected = self.reject_pending(&JobError::WorkerCrashed);
        tracing::warn!(
            generation,
            rejected,
            reason = %reason,
            "worker died unexpectedly, restarting in {}ms",
            self.config.restart_delay().as_millis()
        );
        self.publish(SupervisorEvent::Crashed {
            generation,
            reason,
            rejected,
        });
        self.schedule_restart();
    }

    fn schedule_restart(&mut self) {
        self.restart_at = Some(Instant::now() + self.config.restart_delay());
    }

    async fn restart(&mut self) {
        self.restart_at = None;
        self.set_state(SupervisorState::Restarting);

        match self.spawn_worker().await {
            Ok(pid) => {
                self.set_state(SupervisorState::Running);
                tracing::info!(generation = self.generation, pid = ?pid, "worker restarted");
                self.publish(SupervisorEvent::Restarted {
                    generation: self.generation,
                    pid,
                });
            }
            Err(e) => {
                tracing::error!("failed to respawn worker: {e:#}");
                self.set_state(SupervisorState::Crashed);
                self.publish(SupervisorEvent::RestartFailed {
                    error: format!("{e:#}"),
                });
                self.schedule_restart();
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.state == SupervisorState::Stopped {
            return;
        }
        self.set_state(SupervisorState::ShuttingDown);
        self.restart_at = None;

        if let Some(worker) = self.worker.take() {
            tracing::info!(generation = worker.generation(), "shutting down worker");
            worker.shutdown(self.config.shutdown_grace()).await;
        }

        let rejected = self.reject_pending(&JobError::Stopped);
        if rejected > 0 {
            tracing::debug!(rejected, "rejected pending jobs on shutdown");
        }
        self.set_state(SupervisorState::Stopped);
        self.publish(SupervisorEvent::Stopped);
    }

    fn reject_pending(&mut self, error: &JobError) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for (_, job) in pending {
            let _ = job.reply.send(Err(error.clone()));
        }
        count
    }
}
