//! Lint and fix commands on top of a job runner.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use lintd_types::{LintJobKind, LintMessage, Notification, WorkerDiagnostic};
use lintd_worker::{JobError, WorkerSupervisor};

use crate::buffer::TextBuffer;
use crate::document::Document;
use crate::error::LintError;
use crate::mapping::to_lint_message;
use crate::settings::LinterSettings;

pub const SAVE_BEFORE_FIXING: &str = "Please save before fixing";
const RETRY_DETAIL: &str = "The worker is restarting. Try again in a moment.";

/// Something that runs lint jobs, normally the worker supervisor.
pub trait JobRunner {
    fn run_job(
        &self,
        kind: LintJobKind,
        payload: Value,
    ) -> impl Future<Output = Result<Value, JobError>> + Send;
}

impl JobRunner for WorkerSupervisor {
    fn run_job(
        &self,
        kind: LintJobKind,
        payload: Value,
    ) -> impl Future<Output = Result<Value, JobError>> + Send {
        self.request(kind.as_str(), payload)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<&'a str>,
    #[serde(rename = "type")]
    kind: &'static str,
    config: &'a LinterSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<&'a str>,
}

pub struct Linter<R> {
    runner: R,
    settings: LinterSettings,
}

impl<R: JobRunner> Linter<R> {
    pub fn new(runner: R, settings: LinterSettings) -> Self {
        Self { runner, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &LinterSettings {
        &self.settings
    }

    #[must_use]
    pub fn handles(&self, document: &impl Document) -> bool {
        self.settings.handles_scope(document.scope())
    }

    /// Lint the document's current text.
    ///
    /// Resolves to `None` when the text changed while the worker was busy;
    /// the previous results should then be kept.
    pub async fn lint(&self, document: &impl Document) -> Result<Option<Vec<LintMessage>>, LintError> {
        let text = document.text();
        if text.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let path = document.path();
        let payload = self.payload(LintJobKind::Lint, Some(&text), path.and_then(|p| p.to_str()))?;
        let reply = self.runner.run_job(LintJobKind::Lint, payload).await?;

        if document.text() != text {
            tracing::debug!(path = ?path, "document changed during lint, discarding results");
            return Ok(None);
        }

        let diagnostics: Vec<WorkerDiagnostic> = serde_json::from_value(reply)
            .map_err(|e| JobError::MalformedResponse(e.to_string()))?;

        let buffer = TextBuffer::new(&text);
        let file_path = path.map(std::path::Path::to_path_buf).unwrap_or_default();
        let messages = diagnostics
            .iter()
            .map(|d| {
                to_lint_message(d, &buffer, &file_path, self.settings.show_rule_id_in_message)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(path = ?path, count = messages.len(), "lint finished");
        Ok(Some(messages))
    }

    /// Save hook: fix the file when it is in scope and `fix_on_save` is set.
    ///
    /// Only failures produce a notification.
    pub async fn on_did_save(&self, document: &impl Document) -> Option<Notification> {
        if !self.settings.fix_on_save || !self.handles(document) {
            return None;
        }
        let path = document.path()?.to_str()?;

        match self.fix(path).await {
            Ok(summary) => {
                tracing::debug!(path, summary = %summary, "fixed on save");
                None
            }
            Err(e) => Some(failure_notification(&e)),
        }
    }

    /// The fix-file command.
    pub async fn fix_file(&self, document: &impl Document) -> Notification {
        let path = match document.path().and_then(|p| p.to_str()) {
            Some(path) if !document.is_modified() => path,
            _ => return Notification::error(SAVE_BEFORE_FIXING),
        };

        match self.fix(path).await {
            Ok(summary) => Notification::success(summary),
            Err(e) => failure_notification(&e),
        }
    }

    async fn fix(&self, path: &str) -> Result<String, JobError> {
        let payload = self.payload(LintJobKind::Fix, None, Some(path))?;
        let reply = self.runner.run_job(LintJobKind::Fix, payload).await?;
        Ok(match reply {
            Value::String(summary) => summary,
            other => other.to_string(),
        })
    }

    fn payload(
        &self,
        kind: LintJobKind,
        contents: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Value, JobError> {
        let payload = JobPayload {
            contents,
            kind: kind.as_str(),
            config: &self.settings,
            file_path,
        };
        serde_json::to_value(payload).map_err(|e| JobError::InvalidPayload(e.to_string()))
    }
}

fn failure_notification(error: &JobError) -> Notification {
    let notification = Notification::warning(error.to_string());
    if error.is_transient() {
        notification.with_detail(RETRY_DETAIL)
    } else {
        notification
    }
}
