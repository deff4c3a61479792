//! Configuration for lintd, read from `~/.lintd/config.toml`.
//!
//! `LINTD_CONFIG` points at a different file. Every section and key is
//! optional; anything left out takes its default.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use lintd_linter::LinterSettings;
use lintd_worker::WorkerConfig;

/// Worker launched when the config names none.
pub const DEFAULT_WORKER_COMMAND: &str = "lintd-stub-worker";

pub const CONFIG_PATH_ENV: &str = "LINTD_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct LintdConfig {
    /// Replaces the default worker entirely; `command` is required here.
    pub worker: Option<WorkerConfig>,
    #[serde(default)]
    pub linter: LinterSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Replace `${VAR}` with the variable's value, or nothing when it is unset.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &after[..close];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

impl LintdConfig {
    /// Load the config file. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Load the config, falling back to defaults when it is missing or broken.
    #[must_use]
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(path = %e.path().display(), "using default config: {e}");
                Self::default()
            }
        }
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Worker settings with `${VAR}` expanded in the command and its arguments.
    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        let mut worker = self
            .worker
            .clone()
            .unwrap_or_else(|| WorkerConfig::new(DEFAULT_WORKER_COMMAND));
        worker.command = expand_env_vars(&worker.command);
        worker.args = worker.args.iter().map(|a| expand_env_vars(a)).collect();
        worker
    }

    #[must_use]
    pub fn linter_settings(&self) -> &LinterSettings {
        &self.linter
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".lintd").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("eslint-worker --stdio"), "eslint-worker --stdio");
    }

    #[test]
    fn expand_env_vars_replaces_and_blanks() {
        unsafe {
            std::env::set_var("LINTD_TEST_NODE_HOME", "/opt/node");
            std::env::remove_var("LINTD_TEST_UNSET_VAR");
        }
        assert_eq!(
            expand_env_vars("${LINTD_TEST_NODE_HOME}/bin/node ${LINTD_TEST_UNSET_VAR}x"),
            "/opt/node/bin/node x"
        );
        unsafe {
            std::env::remove_var("LINTD_TEST_NODE_HOME");
        }
    }

    #[test]
    fn expand_env_vars_keeps_unterminated_and_empty() {
        assert_eq!(expand_env_vars("a ${} b"), "a  b");
        assert_eq!(expand_env_vars("cost ${oops"), "cost ${oops");
        assert_eq!(expand_env_vars("héllo ${"), "héllo ${");
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = LintdConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let (_dir, path) = write_config("");
        let config = LintdConfig::load_from(&path).unwrap().unwrap();

        let worker = config.worker_config();
        assert_eq!(worker.command, DEFAULT_WORKER_COMMAND);
        assert_eq!(worker.restart_delay(), Duration::from_millis(1000));
        assert_eq!(config.linter_settings(), &LinterSettings::default());
    }

    #[test]
    fn parses_full_config() {
        let (_dir, path) = write_config(
            r#"
[worker]
command = "node"
args = ["worker.js", "--max-old-space-size=4096"]
restart_delay_ms = 250
request_timeout_ms = 0
inherit_stderr = true

[linter]
lint_html_files = true
fix_on_save = true
show_rule_id_in_message = false
"#,
        );
        let config = LintdConfig::load_from(&path).unwrap().unwrap();

        let worker = config.worker_config();
        assert_eq!(worker.command, "node");
        assert_eq!(worker.args, vec!["worker.js", "--max-old-space-size=4096"]);
        assert_eq!(worker.restart_delay(), Duration::from_millis(250));
        assert_eq!(worker.request_timeout(), None);
        assert!(worker.inherit_stderr);

        let linter = config.linter_settings();
        assert!(linter.lint_html_files);
        assert!(linter.fix_on_save);
        assert!(!linter.show_rule_id_in_message);
        assert_eq!(linter.scopes, LinterSettings::default().scopes);
    }

    #[test]
    fn worker_command_and_args_are_expanded() {
        unsafe {
            std::env::set_var("LINTD_TEST_WORKER_DIR", "/srv/lint");
        }
        let (_dir, path) = write_config(
            r#"
[worker]
command = "${LINTD_TEST_WORKER_DIR}/worker"
args = ["--root=${LINTD_TEST_WORKER_DIR}"]
"#,
        );
        let worker = LintdConfig::load_from(&path)
            .unwrap()
            .unwrap()
            .worker_config();
        unsafe {
            std::env::remove_var("LINTD_TEST_WORKER_DIR");
        }

        assert_eq!(worker.command, "/srv/lint/worker");
        assert_eq!(worker.args, vec!["--root=/srv/lint"]);
    }

    #[test]
    fn worker_section_without_command_is_parse_error() {
        let (_dir, path) = write_config("[worker]\nrestart_delay_ms = 5\n");
        let err = LintdConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let (_dir, path) = write_config("[linter\nfix_on_save = ");
        let err = LintdConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config at"));
    }
}
