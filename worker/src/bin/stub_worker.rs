//! Minimal worker speaking the lintd wire contract over stdio.
//!
//! Handles `lint` and `fix` for a single rule (`no-var`). A few extra job
//! types exist to exercise the supervisor:
//!
//! - `echo`: reply with `payload.value`
//! - `fail`: reply with `payload.message` as an error
//! - `exit`: terminate immediately with `payload.code` (default 1)
//! - `stray`: send replies for unknown ids and a reply with no outcome,
//!   then answer like `echo`
//!
//! Any job may carry `payload.delayMs` to postpone its reply. Jobs run
//! concurrently, so a delayed job does not hold up later ones.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::mpsc;

use lintd_types::{DiagnosticShapeError, FixEdit, WorkerDiagnostic, WorkerSeverity};
use lintd_worker::codec::{FrameReader, FrameWriter};
use lintd_worker::protocol::{self, JobEnvelope};

const NO_VAR_RULE: &str = "no-var";
const NO_VAR_MESSAGE: &str = "Unexpected var, use let or const instead.";

#[tokio::main]
async fn main() -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::channel::<Value>(64);
    let writer = tokio::spawn(async move {
        let mut writer = FrameWriter::new(tokio::io::stdout());
        while let Some(frame) = out_rx.recv().await {
            if writer.write_frame(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut reader = FrameReader::new(tokio::io::stdin());
    while let Some(frame) = reader.read_frame().await? {
        let job: JobEnvelope = match serde_json::from_value(frame) {
            Ok(job) => job,
            Err(e) => {
                eprintln!("stub worker: ignoring malformed job: {e}");
                continue;
            }
        };

        if job.kind == "exit" {
            let code = job.payload.get("code").and_then(Value::as_i64).unwrap_or(1);
            std::process::exit(code as i32);
        }

        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            for frame in handle(job).await {
                if out_tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
    }

    // Let in-flight jobs finish before stdout closes.
    drop(out_tx);
    let _ = writer.await;
    Ok(())
}

async fn handle(job: JobEnvelope) -> Vec<Value> {
    if let Some(ms) = job.payload.get("delayMs").and_then(Value::as_u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    let id = job.id;
    let echoed = || job.payload.get("value").cloned().unwrap_or(Value::Null);

    match job.kind.as_str() {
        "lint" => vec![match lint(&job.payload) {
            Ok(diagnostics) => protocol::result_frame(id, diagnostics),
            Err(message) => protocol::error_frame(id, &message),
        }],
        "fix" => vec![match fix(&job.payload) {
            Ok(summary) => protocol::result_frame(id, Value::String(summary)),
            Err(message) => protocol::error_frame(id, &message),
        }],
        "echo" => vec![protocol::result_frame(id, echoed())],
        "fail" => {
            let message = job
                .payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("job failed");
            vec![protocol::error_frame(id, message)]
        }
        "stray" => vec![
            protocol::result_frame(u64::MAX, Value::String("stray".to_string())),
            protocol::result_frame(id + 1000, Value::String("stray".to_string())),
            serde_json::json!({ "id": id }),
            serde_json::json!({ "result": "no id" }),
            protocol::result_frame(id, echoed()),
        ],
        other => vec![protocol::error_frame(
            id,
            &format!("Unknown job type: {other}"),
        )],
    }
}

fn lint(payload: &Value) -> Result<Value, String> {
    let Some(contents) = payload.get("contents").and_then(Value::as_str) else {
        return Err("No contents provided".to_string());
    };
    serde_json::to_value(no_var(contents)).map_err(|e| e.to_string())
}

fn fix(payload: &Value) -> Result<String, String> {
    let Some(path) = payload.get("filePath").and_then(Value::as_str) else {
        return Err("No file path provided".to_string());
    };
    let contents = std::fs::read_to_string(path).map_err(|e| format!("Cannot read {path}: {e}"))?;

    let diagnostics = no_var(&contents);
    if diagnostics.is_empty() {
        return Ok("Nothing to fix.".to_string());
    }

    let mut chars: Vec<char> = contents.chars().collect();
    for fix in diagnostics.iter().rev().filter_map(WorkerDiagnostic::fix) {
        let _replaced: Vec<char> = chars
            .splice(fix.start()..fix.end(), fix.text().chars())
            .collect();
    }
    let fixed: String = chars.into_iter().collect();
    std::fs::write(path, fixed).map_err(|e| format!("Cannot write {path}: {e}"))?;

    Ok(format!(
        "Fix complete: {} problem(s) fixed.",
        diagnostics.len()
    ))
}

fn no_var_at(
    line: u32,
    column: u32,
    start: usize,
) -> Result<WorkerDiagnostic, DiagnosticShapeError> {
    Ok(
        WorkerDiagnostic::new(NO_VAR_MESSAGE, line, Some(column), WorkerSeverity::Error)?
            .with_rule_id(NO_VAR_RULE)
            .with_fix(FixEdit::new(start, start + 3, "let")?),
    )
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Every `var` keyword, with a fix replacing it by `let`.
fn no_var(contents: &str) -> Vec<WorkerDiagnostic> {
    let mut found = Vec::new();
    let mut line_start = 0usize;

    for (row, line) in contents.split('\n').enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let mut col = 0;
        while col + 3 <= chars.len() {
            let is_keyword = chars[col..col + 3] == ['v', 'a', 'r']
                && (col == 0 || !is_ident(chars[col - 1]))
                && chars.get(col + 3).is_some_and(|c| c.is_whitespace());

            if is_keyword {
                let start = line_start + col;
                if let Ok(diagnostic) = no_var_at((row + 1) as u32, (col + 1) as u32, start) {
                    found.push(diagnostic);
                }
                col += 3;
            } else {
                col += 1;
            }
        }
        line_start += chars.len() + 1;
    }

    found
}
