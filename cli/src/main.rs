//! lintd CLI - binary entry point.
//!
//! ```text
//! main() -> LintdConfig -> WorkerSupervisor::start() -> Linter
//!                                |                        |
//!                                v                        v
//!                       crash notifications       lint / fix per file
//! ```
//!
//! Stdout carries diagnostics and command output; notifications go to
//! stderr and logs go to `~/.lintd/logs/lintd.log`.

mod args;

use std::{
    env,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lintd_config::{DEFAULT_WORKER_COMMAND, LintdConfig};
use lintd_linter::{Document, FileDocument, Linter, spawn_crash_notifier};
use lintd_types::{LintMessage, Notification, NotificationLevel};
use lintd_worker::{WorkerConfig, WorkerSupervisor};

use crate::args::{Cli, Commands};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Stdout is reserved for diagnostics; no log file means no logs.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: next to the config file, normally ~/.lintd/logs/lintd.log
    if let Some(config_path) = LintdConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("lintd.log"));
    }

    // Fallback: ./.lintd/logs/lintd.log
    candidates.push(PathBuf::from(".lintd").join("logs").join("lintd.log"));

    candidates
}

/// Prefer a stub worker installed next to this binary over a `PATH` lookup.
fn locate_worker(mut config: WorkerConfig, exe: Option<&Path>) -> WorkerConfig {
    if config.command != DEFAULT_WORKER_COMMAND {
        return config;
    }
    if let Some(sibling) = exe
        .and_then(Path::parent)
        .map(|dir| dir.join(DEFAULT_WORKER_COMMAND))
        .filter(|path| path.is_file())
    {
        config.command = sibling.to_string_lossy().into_owned();
    }
    config
}

fn print_message(message: &LintMessage) {
    println!("{message}");
    if let Some(fix) = message.fix() {
        println!(
            "    fix: replace {}-{} with {:?}",
            fix.range.start, fix.range.end, fix.new_text
        );
    }
}

fn print_notification(notification: &Notification) {
    eprintln!(
        "{}: {}",
        notification.level().label(),
        notification.message()
    );
    if let Some(detail) = notification.detail() {
        eprintln!("    {detail}");
    }
}

/// Lint or fix one file. Returns whether it passed.
async fn run_file(linter: &Linter<WorkerSupervisor>, command: &Commands, path: &Path) -> bool {
    let document = match FileDocument::open(path) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("{e:#}");
            return false;
        }
    };

    match command {
        Commands::Lint { save, .. } => {
            if !linter.handles(&document) {
                tracing::info!(path = %path.display(), scope = document.scope(), "skipping file outside linted scopes");
                eprintln!(
                    "Skipping {}: scope {} is not linted",
                    path.display(),
                    document.scope()
                );
                return true;
            }

            let mut passed = match linter.lint(&document).await {
                Ok(Some(messages)) => {
                    messages.iter().for_each(print_message);
                    !messages.iter().any(|m| m.kind().is_error())
                }
                // A file read from disk does not change under us.
                Ok(None) => true,
                Err(e) => {
                    eprintln!("{}: {e}", path.display());
                    false
                }
            };

            if *save && let Some(notification) = linter.on_did_save(&document).await {
                print_notification(&notification);
                passed = false;
            }
            passed
        }
        Commands::Fix { .. } => {
            let notification = linter.fix_file(&document).await;
            print_notification(&notification);
            notification.level() == NotificationLevel::Success
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let command = Cli::parse().command;

    init_tracing();

    let config = LintdConfig::load_or_default();
    let worker_config = locate_worker(config.worker_config(), env::current_exe().ok().as_deref());
    tracing::info!(command = %worker_config.command, "starting lint worker");

    let supervisor = WorkerSupervisor::start(worker_config)
        .await
        .context("failed to start lint worker")?;

    let (notification_tx, mut notifications) = mpsc::unbounded_channel();
    let notifier = spawn_crash_notifier(supervisor.subscribe(), notification_tx);
    let linter = Linter::new(supervisor.clone(), config.linter_settings().clone());

    let mut failed = false;
    for path in command.files() {
        if !run_file(&linter, &command, path).await {
            failed = true;
        }
        while let Ok(notification) = notifications.try_recv() {
            print_notification(&notification);
        }
    }

    supervisor.stop().await;
    notifier.abort();
    while let Ok(notification) = notifications.try_recv() {
        print_notification(&notification);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
