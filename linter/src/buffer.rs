//! Character-index and line lookups over a snapshot of document text.
//!
//! Rows and columns are 0-indexed and count characters, not bytes. A `\r`
//! before a line break belongs to the line ending, not the line.

use lintd_types::{Position, Range};

/// A diagnostic location that does not exist in the buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("row {row} is past the last row {last_row}")]
    RowOutOfRange { row: u32, last_row: u32 },
    #[error("column {column} is past the end of a {line_length}-character line")]
    ColumnOutOfRange { column: u32, line_length: u32 },
}

#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
    /// Character index at which each row starts.
    line_starts: Vec<usize>,
    char_count: usize,
}

impl TextBuffer {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut line_starts = Vec::new();
        let mut start = 0;

        for raw in text.split('\n') {
            line_starts.push(start);
            start += raw.chars().count() + 1;
            lines.push(raw.strip_suffix('\r').unwrap_or(raw).to_string());
        }

        Self {
            lines,
            line_starts,
            char_count: text.chars().count(),
        }
    }

    /// Always at least 1; an empty buffer has one empty row.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn last_row(&self) -> u32 {
        self.lines.len().saturating_sub(1) as u32
    }

    #[must_use]
    pub fn line_for_row(&self, row: u32) -> Option<&str> {
        self.lines.get(row as usize).map(String::as_str)
    }

    /// Position of the character at `index`, clamped to the end of the buffer.
    ///
    /// An index that falls inside a line ending maps to the end of that line.
    #[must_use]
    pub fn position_for_character_index(&self, index: usize) -> Position {
        let index = index.min(self.char_count);
        let row = self
            .line_starts
            .partition_point(|&start| start <= index)
            .saturating_sub(1);
        let line_length = self.lines[row].chars().count();
        let column = (index - self.line_starts[row]).min(line_length);
        Position::new(row as u32, column as u32)
    }

    /// Range to highlight for a diagnostic on `row`.
    ///
    /// With a column, the range covers the run of non-whitespace starting
    /// there, or a single character. Without one, it covers the line minus
    /// its leading and trailing whitespace.
    pub fn range_from_line(&self, row: u32, column: Option<u32>) -> Result<Range, LocationError> {
        let line = self.line_for_row(row).ok_or(LocationError::RowOutOfRange {
            row,
            last_row: self.last_row(),
        })?;
        let chars: Vec<char> = line.chars().collect();
        let line_length = chars.len() as u32;

        let (start, end) = match column {
            Some(column) => {
                if column > line_length {
                    return Err(LocationError::ColumnOutOfRange {
                        column,
                        line_length,
                    });
                }
                let word = chars[column as usize..]
                    .iter()
                    .take_while(|c| !c.is_whitespace())
                    .count() as u32;
                let end = if word > 0 {
                    column + word
                } else {
                    (column + 1).min(line_length)
                };
                (column, end)
            }
            None => {
                let leading = chars.iter().take_while(|c| c.is_whitespace()).count() as u32;
                let trailing = chars.iter().rev().take_while(|c| c.is_whitespace()).count() as u32;
                (leading, (line_length - trailing).max(leading))
            }
        };

        Ok(Range::new(Position::new(row, start), Position::new(row, end)))
    }
}
