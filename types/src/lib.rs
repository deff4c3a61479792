//! Core domain types for lintd.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The worker supervisor, the linter bridge and the CLI all speak these types.

#![allow(clippy::missing_errors_doc)]

mod diagnostic;
mod message;
mod notification;

pub use diagnostic::{DiagnosticShapeError, FixEdit, WorkerDiagnostic, WorkerSeverity};
pub use message::{LintMessage, LinterFix, MessageKind, Position, Range};
pub use notification::{Notification, NotificationLevel};

/// Environment variable patterns that must never reach a spawned worker.
///
/// Patterns support a leading and/or trailing `*` wildcard and are matched
/// case-insensitively against variable names.
pub const ENV_SECRET_DENYLIST: &[&str] = &[
    "*_API_KEY",
    "*_TOKEN",
    "*_SECRET*",
    "*_PASSWORD",
    "*_CREDENTIAL*",
    "AWS_*",
];

/// Tag the worker uses to pick its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintJobKind {
    Lint,
    Fix,
}

impl LintJobKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::Fix => "fix",
        }
    }
}

impl std::fmt::Display for LintJobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_wire_names() {
        assert_eq!(LintJobKind::Lint.as_str(), "lint");
        assert_eq!(LintJobKind::Fix.to_string(), "fix");
    }
}
