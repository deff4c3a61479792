//! Editor-facing side of lintd.
//!
//! [`Linter`] turns documents into `lint` and `fix` jobs, maps the worker's
//! diagnostics onto buffer ranges, and reports command outcomes as
//! [`lintd_types::Notification`]s.

mod buffer;
mod document;
mod error;
mod events;
mod linter;
mod mapping;
mod settings;

pub use buffer::{LocationError, TextBuffer};
pub use document::{Document, FileDocument, scope_for_path};
pub use error::LintError;
pub use events::{WORKER_DIED, WORKER_DIED_DETAIL, notification_for_event, spawn_crash_notifier};
pub use linter::{JobRunner, Linter, SAVE_BEFORE_FIXING};
pub use mapping::{FATAL_LABEL, to_lint_message};
pub use settings::{DEFAULT_SCOPES, EMBEDDED_HTML_SCOPE, LinterSettings};
