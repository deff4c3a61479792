use serde::{Deserialize, Serialize};

/// Grammar scope of JavaScript embedded in HTML.
pub const EMBEDDED_HTML_SCOPE: &str = "source.js.embedded.html";

pub const DEFAULT_SCOPES: &[&str] = &[
    "source.js",
    "source.jsx",
    "source.js.jsx",
    "source.babel",
    "source.js-semantic",
];

/// `[linter]` section of the config file.
///
/// Also sent verbatim to the worker as the `config` of every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterSettings {
    pub scopes: Vec<String>,
    pub lint_html_files: bool,
    pub fix_on_save: bool,
    pub show_rule_id_in_message: bool,
}

impl Default for LinterSettings {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            lint_html_files: false,
            fix_on_save: false,
            show_rule_id_in_message: true,
        }
    }
}

impl LinterSettings {
    /// Scopes the linter handles.
    ///
    /// The embedded HTML scope is present exactly when `lint_html_files` is
    /// set, whether or not it appears in `scopes`.
    #[must_use]
    pub fn effective_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = Vec::with_capacity(self.scopes.len() + 1);
        for scope in &self.scopes {
            if scope != EMBEDDED_HTML_SCOPE && !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }
        if self.lint_html_files {
            scopes.push(EMBEDDED_HTML_SCOPE.to_string());
        }
        scopes
    }

    #[must_use]
    pub fn handles_scope(&self, scope: &str) -> bool {
        self.effective_scopes().iter().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LinterSettings::default();
        assert_eq!(settings.effective_scopes(), DEFAULT_SCOPES);
        assert!(settings.show_rule_id_in_message);
        assert!(!settings.fix_on_save);
        assert!(settings.handles_scope("source.js.jsx"));
        assert!(!settings.handles_scope(EMBEDDED_HTML_SCOPE));
    }

    #[test]
    fn test_html_scope_added_once() {
        let settings = LinterSettings {
            scopes: vec![
                "source.js".to_string(),
                EMBEDDED_HTML_SCOPE.to_string(),
                "source.js".to_string(),
            ],
            lint_html_files: true,
            ..LinterSettings::default()
        };
        assert_eq!(
            settings.effective_scopes(),
            vec!["source.js".to_string(), EMBEDDED_HTML_SCOPE.to_string()]
        );
        assert!(settings.handles_scope(EMBEDDED_HTML_SCOPE));
    }

    #[test]
    fn test_html_scope_removed_when_disabled() {
        let settings = LinterSettings {
            scopes: vec![EMBEDDED_HTML_SCOPE.to_string(), "source.babel".to_string()],
            lint_html_files: false,
            ..LinterSettings::default()
        };
        assert_eq!(settings.effective_scopes(), vec!["source.babel".to_string()]);
        assert!(!settings.handles_scope(EMBEDDED_HTML_SCOPE));
    }

    #[test]
    fn test_serializes_for_worker() {
        let value = serde_json::to_value(LinterSettings::default()).unwrap();
        assert_eq!(value["fix_on_save"], serde_json::json!(false));
        assert_eq!(value["scopes"][0], serde_json::json!("source.js"));
    }

    #[test]
    fn test_handles_scope_agrees_with_effective_scopes() {
        let candidates = [
            "source.js",
            "source.js.jsx",
            "source.babel",
            EMBEDDED_HTML_SCOPE,
            "text.plain",
        ];
        for lint_html_files in [false, true] {
            let settings = LinterSettings {
                scopes: vec![
                    "source.js".to_string(),
                    EMBEDDED_HTML_SCOPE.to_string(),
                    "source.js".to_string(),
                ],
                lint_html_files,
                ..LinterSettings::default()
            };
            let effective = settings.effective_scopes();
            for scope in candidates {
                assert_eq!(
                    settings.handles_scope(scope),
                    effective.iter().any(|s| s == scope),
                    "{scope} with lint_html_files={lint_html_files}"
                );
            }
            assert_eq!(settings.handles_scope(EMBEDDED_HTML_SCOPE), lint_html_files);
        }
    }
}
