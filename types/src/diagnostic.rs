//! Diagnostic records as reported by the lint worker.
//!
//! The worker's JSON is loosely shaped: `column`, `ruleId` and `fix` may be
//! missing or `null`. [`WorkerDiagnostic`] is the validated boundary type;
//! deserialization goes through [`RawDiagnostic`] and rejects records that
//! cannot be placed in an editor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticShapeError {
    #[error("diagnostic is missing a message")]
    MissingMessage,
    #[error("diagnostic is missing a line")]
    MissingLine,
    #[error("line must be 1-indexed, got {0}")]
    ZeroLine(u64),
    #[error("column must be 1-indexed, got {0}")]
    ZeroColumn(u64),
    #[error("fix range [{start}, {end}] is inverted")]
    InvertedFixRange { start: usize, end: usize },
}

/// Severity on the wire: `1` is a warning, anything else an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerSeverity {
    Warning,
    Error,
}

impl WorkerSeverity {
    #[must_use]
    pub fn from_wire(value: Option<u64>) -> Self {
        match value {
            Some(1) => Self::Warning,
            _ => Self::Error,
        }
    }

    #[must_use]
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Warning => 1,
            Self::Error => 2,
        }
    }
}

/// Replacement of a character-index span of the linted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixEdit {
    start: usize,
    end: usize,
    text: String,
}

impl FixEdit {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Result<Self, DiagnosticShapeError> {
        if start > end {
            return Err(DiagnosticShapeError::InvertedFixRange { start, end });
        }
        Ok(Self {
            start,
            end,
            text: text.into(),
        })
    }

    /// Character index where the replaced span starts.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Character index one past the replaced span.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A single validated diagnostic from the worker.
///
/// `line` and `column` keep the worker's 1-indexed convention; conversion to
/// editor positions happens in the linter bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDiagnostic", into = "RawDiagnostic")]
pub struct WorkerDiagnostic {
    message: String,
    line: u32,
    column: Option<u32>,
    severity: WorkerSeverity,
    rule_id: Option<String>,
    fix: Option<FixEdit>,
}

impl WorkerDiagnostic {
    pub fn new(
        message: impl Into<String>,
        line: u32,
        column: Option<u32>,
        severity: WorkerSeverity,
    ) -> Result<Self, DiagnosticShapeError> {
        if line == 0 {
            return Err(DiagnosticShapeError::ZeroLine(0));
        }
        if column == Some(0) {
            return Err(DiagnosticShapeError::ZeroColumn(0));
        }
        Ok(Self {
            message: message.into(),
            line,
            column,
            severity,
            rule_id: None,
            fix: None,
        })
    }

    #[must_use]
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: FixEdit) -> Self {
        self.fix = Some(fix);
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-indexed line.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-indexed column, if the worker reported one.
    #[must_use]
    pub fn column(&self) -> Option<u32> {
        self.column
    }

    #[must_use]
    pub fn severity(&self) -> WorkerSeverity {
        self.severity
    }

    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    #[must_use]
    pub fn fix(&self) -> Option<&FixEdit> {
        self.fix.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFix {
    range: [usize; 2],
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiagnostic {
    message: Option<String>,
    line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<u64>,
    #[serde(default)]
    severity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fix: Option<RawFix>,
}

impl TryFrom<RawDiagnostic> for WorkerDiagnostic {
    type Error = DiagnosticShapeError;

    fn try_from(raw: RawDiagnostic) -> Result<Self, Self::Error> {
        let message = raw.message.ok_or(DiagnosticShapeError::MissingMessage)?;
        let line = match raw.line {
            None => return Err(DiagnosticShapeError::MissingLine),
            Some(0) => return Err(DiagnosticShapeError::ZeroLine(0)),
            Some(line) => u32::try_from(line).unwrap_or(u32::MAX),
        };
        let column = match raw.column {
            Some(0) => return Err(DiagnosticShapeError::ZeroColumn(0)),
            Some(column) => Some(u32::try_from(column).unwrap_or(u32::MAX)),
            None => None,
        };
        let fix = raw
            .fix
            .map(|fix| FixEdit::new(fix.range[0], fix.range[1], fix.text))
            .transpose()?;

        Ok(Self {
            message,
            line,
            column,
            severity: WorkerSeverity::from_wire(raw.severity),
            rule_id: raw.rule_id,
            fix,
        })
    }
}

impl From<WorkerDiagnostic> for RawDiagnostic {
    fn from(diag: WorkerDiagnostic) -> Self {
        Self {
            message: Some(diag.message),
            line: Some(u64::from(diag.line)),
            column: diag.column.map(u64::from),
            severity: Some(diag.severity.to_wire()),
            rule_id: diag.rule_id,
            fix: diag.fix.map(|fix| RawFix {
                range: [fix.start, fix.end],
                text: fix.text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record() {
        let json = serde_json::json!({
            "message": "Unexpected var, use let or const instead.",
            "line": 1,
            "column": 1,
            "severity": 2,
            "ruleId": "no-var",
            "fix": { "range": [0, 3], "text": "let" }
        });
        let diag: WorkerDiagnostic = serde_json::from_value(json).unwrap();
        assert_eq!(diag.message(), "Unexpected var, use let or const instead.");
        assert_eq!(diag.line(), 1);
        assert_eq!(diag.column(), Some(1));
        assert_eq!(diag.severity(), WorkerSeverity::Error);
        assert_eq!(diag.rule_id(), Some("no-var"));
        let fix = diag.fix().unwrap();
        assert_eq!((fix.start(), fix.end(), fix.text()), (0, 3, "let"));
    }

    #[test]
    fn null_optional_fields_are_absent() {
        let json = serde_json::json!({
            "message": "Parsing error: Unexpected token",
            "line": 3,
            "column": null,
            "severity": 2,
            "ruleId": null,
            "fix": null
        });
        let diag: WorkerDiagnostic = serde_json::from_value(json).unwrap();
        assert_eq!(diag.column(), None);
        assert_eq!(diag.rule_id(), None);
        assert!(diag.fix().is_none());
    }

    #[test]
    fn severity_one_is_warning_everything_else_error() {
        assert_eq!(WorkerSeverity::from_wire(Some(1)), WorkerSeverity::Warning);
        assert_eq!(WorkerSeverity::from_wire(Some(2)), WorkerSeverity::Error);
        assert_eq!(WorkerSeverity::from_wire(Some(7)), WorkerSeverity::Error);
        assert_eq!(WorkerSeverity::from_wire(None), WorkerSeverity::Error);
    }

    #[test]
    fn missing_message_rejected() {
        let json = serde_json::json!({ "line": 1, "severity": 1 });
        let err = serde_json::from_value::<WorkerDiagnostic>(json).unwrap_err();
        assert!(err.to_string().contains("missing a message"));
    }

    #[test]
    fn zero_line_rejected() {
        let json = serde_json::json!({ "message": "m", "line": 0 });
        assert!(serde_json::from_value::<WorkerDiagnostic>(json).is_err());
    }

    #[test]
    fn inverted_fix_range_rejected() {
        let json = serde_json::json!({
            "message": "m",
            "line": 1,
            "fix": { "range": [5, 2], "text": "" }
        });
        assert!(serde_json::from_value::<WorkerDiagnostic>(json).is_err());
    }

    #[test]
    fn serializes_in_wire_shape() {
        let diag = WorkerDiagnostic::new("m", 2, None, WorkerSeverity::Warning)
            .unwrap()
            .with_rule_id("semi");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["severity"], 1);
        assert_eq!(json["ruleId"], "semi");
        assert!(json.get("column").is_none());
        assert!(json.get("fix").is_none());
    }
}
