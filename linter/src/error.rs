use lintd_worker::JobError;

use crate::buffer::LocationError;

/// Why a lint produced no messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LintError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(
        "Cannot mark location in editor for ({}) - ({message}) at line ({line}) column ({})",
        .rule_id.as_deref().unwrap_or("none"),
        .column.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    Unlocatable {
        rule_id: Option<String>,
        message: String,
        line: u32,
        column: Option<u32>,
        source: LocationError,
    },
}
