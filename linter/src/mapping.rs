//! Worker diagnostics to editor messages.

use std::path::Path;

use lintd_types::{LintMessage, LinterFix, MessageKind, Range, WorkerDiagnostic, WorkerSeverity};

use crate::buffer::TextBuffer;
use crate::error::LintError;

/// Label used in place of a rule id for diagnostics without one, such as parse errors.
pub const FATAL_LABEL: &str = "Fatal";

pub fn to_lint_message(
    diagnostic: &WorkerDiagnostic,
    buffer: &TextBuffer,
    file_path: &Path,
    show_rule_id: bool,
) -> Result<LintMessage, LintError> {
    // Worker lines and columns are 1-indexed.
    let row = diagnostic.line() - 1;
    let column = diagnostic.column().map(|c| c - 1);
    let range = buffer
        .range_from_line(row, column)
        .map_err(|source| LintError::Unlocatable {
            rule_id: diagnostic.rule_id().map(str::to_string),
            message: diagnostic.message().to_string(),
            line: diagnostic.line(),
            column: diagnostic.column(),
            source,
        })?;

    let kind = match diagnostic.severity() {
        WorkerSeverity::Warning => MessageKind::Warning,
        WorkerSeverity::Error => MessageKind::Error,
    };

    let text = if show_rule_id {
        format!(
            "[{}] {}",
            diagnostic.rule_id().unwrap_or(FATAL_LABEL),
            diagnostic.message()
        )
    } else {
        diagnostic.message().to_string()
    };

    let mut message = LintMessage::new(file_path.to_path_buf(), kind, range, text);
    if let Some(fix) = diagnostic.fix() {
        message = message.with_fix(LinterFix {
            range: Range::new(
                buffer.position_for_character_index(fix.start()),
                buffer.position_for_character_index(fix.end()),
            ),
            new_text: fix.text().to_string(),
        });
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintd_types::{FixEdit, Position};

    fn diagnostic(line: u32, column: Option<u32>, severity: WorkerSeverity) -> WorkerDiagnostic {
        WorkerDiagnostic::new("Unexpected var, use let or const instead.", line, column, severity)
            .unwrap()
    }

    #[test]
    fn test_maps_location_kind_and_fix() {
        let buffer = TextBuffer::new("const a = 1;\nvar x=1\n");
        let diag = diagnostic(2, Some(1), WorkerSeverity::Error)
            .with_rule_id("no-var")
            .with_fix(FixEdit::new(13, 16, "let").unwrap());

        let msg = to_lint_message(&diag, &buffer, Path::new("a.js"), false).unwrap();
        assert_eq!(msg.kind(), MessageKind::Error);
        assert_eq!(
            msg.range(),
            Range::new(Position::new(1, 0), Position::new(1, 3))
        );
        assert_eq!(msg.text(), "Unexpected var, use let or const instead.");
        assert_eq!(msg.file_path(), Path::new("a.js"));

        let fix = msg.fix().unwrap();
        assert_eq!(
            fix.range,
            Range::new(Position::new(1, 0), Position::new(1, 3))
        );
        assert_eq!(fix.new_text, "let");
    }

    #[test]
    fn test_warning_severity() {
        let buffer = TextBuffer::new("var x");
        let diag = diagnostic(1, Some(1), WorkerSeverity::Warning);
        let msg = to_lint_message(&diag, &buffer, Path::new("a.js"), false).unwrap();
        assert_eq!(msg.kind(), MessageKind::Warning);
        assert!(msg.fix().is_none());
    }

    #[test]
    fn test_rule_id_prefix() {
        let buffer = TextBuffer::new("var x");
        let with_rule = diagnostic(1, Some(1), WorkerSeverity::Error).with_rule_id("no-var");
        let msg = to_lint_message(&with_rule, &buffer, Path::new("a.js"), true).unwrap();
        assert_eq!(msg.text(), "[no-var] Unexpected var, use let or const instead.");

        let fatal = diagnostic(1, None, WorkerSeverity::Error);
        let msg = to_lint_message(&fatal, &buffer, Path::new("a.js"), true).unwrap();
        assert_eq!(msg.text(), "[Fatal] Unexpected var, use let or const instead.");
    }

    #[test]
    fn test_missing_column_covers_trimmed_line() {
        let buffer = TextBuffer::new("\t var x=1  ");
        let msg = to_lint_message(
            &diagnostic(1, None, WorkerSeverity::Error),
            &buffer,
            Path::new("a.js"),
            false,
        )
        .unwrap();
        assert_eq!(
            msg.range(),
            Range::new(Position::new(0, 2), Position::new(0, 9))
        );
    }

    #[test]
    fn test_unlocatable_diagnostic_error_text() {
        let buffer = TextBuffer::new("var x=1");
        let diag = diagnostic(4, Some(2), WorkerSeverity::Error).with_rule_id("no-var");

        let err = to_lint_message(&diag, &buffer, Path::new("a.js"), true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot mark location in editor for (no-var) - \
             (Unexpected var, use let or const instead.) at line (4) column (2)"
        );
    }

    #[test]
    fn test_unlocatable_column_without_rule_id() {
        let buffer = TextBuffer::new("var");
        let diag = diagnostic(1, Some(10), WorkerSeverity::Error);
        let err = to_lint_message(&diag, &buffer, Path::new("a.js"), false).unwrap_err();
        assert!(matches!(err, LintError::Unlocatable { rule_id: None, column: Some(10), .. }));
        assert!(err.to_string().starts_with("Cannot mark location in editor for (none)"));
    }
}
