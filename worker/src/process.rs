//! Worker handle: owns one child process and its stdio pump tasks.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec::{FrameReader, FrameWriter};
use crate::types::{ExitReason, WorkerConfig};

const WRITER_CHANNEL_CAPACITY: usize = 64;

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Output of a worker's reader task, tagged with the worker's generation.
#[derive(Debug)]
pub(crate) enum WorkerOutput {
    Frame {
        generation: u64,
        frame: serde_json::Value,
    },
    Exited {
        generation: u64,
        reason: ExitReason,
    },
}

/// Minimal glob matcher for env var denylist patterns.
/// Handles `*_SUFFIX`, `PREFIX_*`, `*_INFIX*`, and exact match.
/// Both pattern and key are compared in uppercase.
fn env_glob_matches(pattern: &str, key_upper: &str) -> bool {
    let pat = pattern.to_uppercase();
    match (pat.strip_prefix('*'), pat.strip_suffix('*')) {
        (Some(rest), Some(_)) => {
            let inner = rest.strip_suffix('*').unwrap_or(rest);
            key_upper.contains(inner)
        }
        (Some(suffix), None) => key_upper.ends_with(suffix),
        (None, Some(prefix)) => key_upper.starts_with(prefix),
        (None, None) => key_upper == pat,
    }
}

fn is_secret_env(key: &str) -> bool {
    let upper = key.to_uppercase();
    lintd_types::ENV_SECRET_DENYLIST
        .iter()
        .any(|pat| env_glob_matches(pat, &upper))
}

pub(crate) struct RunningWorker {
    generation: u64,
    pid: Option<u32>,
    child: Child,
    writer_tx: mpsc::Sender<WriterCommand>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl RunningWorker {
    pub async fn spawn(
        generation: u64,
        config: &WorkerConfig,
        output_tx: mpsc::Sender<WorkerOutput>,
    ) -> Result<Self> {
        let resolved = which::which(&config.command)
            .with_context(|| format!("{} not found in PATH", config.command))?;
        let mut cmd = Command::new(&resolved);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if config.inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        for (key, _) in std::env::vars_os() {
            if let Some(key) = key.to_str()
                && is_secret_env(key)
            {
                cmd.env_remove(key);
            }
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", resolved.display()))?;
        let pid = child.id();

        let Some(stdout) = child.stdout.take() else {
            bail!("no stdout from worker");
        };
        let Some(stdin) = child.stdin.take() else {
            bail!("no stdin from worker");
        };

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            let mut writer = FrameWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!(generation, "worker write error: {e:#}");
                            break;
                        }
                    }
                    // Dropping the writer closes the worker's stdin.
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let max_frame_bytes = config.max_frame_bytes;
        let reader_handle = tokio::spawn(async move {
            let mut reader = FrameReader::with_max_frame_bytes(stdout, max_frame_bytes);
            let reason = loop {
                match reader.read_frame_bytes().await {
                    Ok(Some(body)) => match serde_json::from_slice(&body) {
                        Ok(frame) => {
                            if output_tx
                                .send(WorkerOutput::Frame { generation, frame })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(generation, "dropping unparseable worker frame: {e}");
                        }
                    },
                    Ok(None) => {
                        tracing::info!(generation, "worker closed stdout");
                        break ExitReason::Exited;
                    }
                    Err(e) => {
                        tracing::warn!(generation, "worker reader error: {e:#}");
                        break ExitReason::Failed(format!("{e:#}"));
                    }
                }
            };
            let _ = output_tx
                .send(WorkerOutput::Exited { generation, reason })
                .await;
        });

        tracing::info!(generation, pid = ?pid, command = %resolved.display(), "worker spawned");

        Ok(Self {
            generation,
            pid,
            child,
            writer_tx,
            reader_handle,
            writer_handle,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Queue a frame for the writer task without waiting.
    ///
    /// Fails when the queue is full, which means the worker has stopped
    /// draining its stdin.
    pub fn send(&self, frame: serde_json::Value) -> Result<()> {
        match self.writer_tx.try_send(WriterCommand::Send(frame)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                bail!("worker input queue is full ({WRITER_CHANNEL_CAPACITY} frames)")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => bail!("worker writer channel closed"),
        }
    }

    /// Stop the writer task, closing the worker's stdin if it was still open.
    async fn close_writer(&mut self) {
        self.writer_handle.abort();
        let _ = (&mut self.writer_handle).await;
    }

    /// Collect the exit status of a worker whose stdout already closed.
    pub async fn reap(mut self) {
        self.reader_handle.abort();
        match tokio::time::timeout(Duration::from_millis(500), self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(generation = self.generation, %status, "worker exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(generation = self.generation, "waiting on worker failed: {e}");
            }
            Err(_) => {
                tracing::warn!(
                    generation = self.generation,
                    "worker closed stdout but is still running, killing"
                );
                let _ = self.child.kill().await;
            }
        }
        self.close_writer().await;
    }

    /// Close the worker's stdin and wait up to `grace` before killing it. Consumes self.
    pub async fn shutdown(mut self, grace: Duration) {
        // Reader exits are expected from here on; stop forwarding them.
        self.reader_handle.abort();
        // A writer stuck on a full pipe never reaches the Shutdown command;
        // aborting it drops stdin instead.
        let shutdown_queued = self.writer_tx.try_send(WriterCommand::Shutdown).is_ok();
        if !shutdown_queued {
            self.close_writer().await;
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(generation = self.generation, %status, "worker shut down");
            }
            Ok(Err(e)) => {
                tracing::warn!(generation = self.generation, "waiting on worker failed: {e}");
            }
            Err(_) => {
                tracing::debug!(
                    generation = self.generation,
                    "worker didn't exit in time, killing"
                );
                let _ = self.child.kill().await;
            }
        }
        if shutdown_queued {
            self.close_writer().await;
        }
    }
}
