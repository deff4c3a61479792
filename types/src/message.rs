//! Editor-facing lint messages.

use std::fmt;
use std::path::{Path, PathBuf};

/// A 0-indexed position in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub row: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Position {
    /// Formats as 1-indexed `row:column` for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Warning,
    Error,
}

impl MessageKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

/// An edit the editor can apply to resolve a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinterFix {
    pub range: Range,
    pub new_text: String,
}

/// A lint result mapped onto editor coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintMessage {
    file_path: PathBuf,
    kind: MessageKind,
    range: Range,
    text: String,
    fix: Option<LinterFix>,
}

impl LintMessage {
    #[must_use]
    pub fn new(file_path: PathBuf, kind: MessageKind, range: Range, text: String) -> Self {
        Self {
            file_path,
            kind,
            range,
            text,
            fix: None,
        }
    }

    #[must_use]
    pub fn with_fix(mut self, fix: LinterFix) -> Self {
        self.fix = Some(fix);
        self
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn fix(&self) -> Option<&LinterFix> {
        self.fix.as_ref()
    }
}

impl fmt::Display for LintMessage {
    /// Format as `path:line:col: kind: text` (1-indexed).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file_path.display(),
            self.range.start,
            self.kind.label(),
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_indexed() {
        let msg = LintMessage::new(
            PathBuf::from("src/app.js"),
            MessageKind::Error,
            Range::new(Position::new(0, 4), Position::new(0, 5)),
            "Missing semicolon.".to_string(),
        );
        assert_eq!(msg.to_string(), "src/app.js:1:5: Error: Missing semicolon.");
    }

    #[test]
    fn positions_order_by_row_then_column() {
        assert!(Position::new(0, 9) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
    }
}
