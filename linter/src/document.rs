//! The document a lint or fix job runs against.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::settings::EMBEDDED_HTML_SCOPE;

/// An open document as the linter sees it.
///
/// `text()` is read once when a lint starts and again when the reply arrives,
/// so implementations backed by a live editor buffer must return its current
/// contents each time.
pub trait Document {
    fn text(&self) -> String;

    fn path(&self) -> Option<&Path>;

    /// Whether the document has unsaved changes.
    fn is_modified(&self) -> bool;

    /// Grammar scope name, such as `source.js`.
    fn scope(&self) -> &str;
}

/// A saved file read from disk.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
    text: String,
    scope: String,
}

impl FileDocument {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let scope = scope_for_path(&path).to_string();
        Ok(Self { path, text, scope })
    }
}

impl Document for FileDocument {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn is_modified(&self) -> bool {
        false
    }

    fn scope(&self) -> &str {
        &self.scope
    }
}

/// Grammar scope for a file, guessed from its extension.
#[must_use]
pub fn scope_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("js" | "mjs" | "cjs") => "source.js",
        Some("jsx") => "source.js.jsx",
        Some("es6" | "babel") => "source.babel",
        Some("html" | "htm") => EMBEDDED_HTML_SCOPE,
        _ => "text.plain",
    }
}
