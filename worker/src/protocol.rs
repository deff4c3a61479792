//! Wire envelopes exchanged with the worker.
//!
//! Requests are `{id, type, payload}`; replies are `{id, result}` or
//! `{id, error}`. The worker may report `error` either as a bare string or as
//! an object carrying a `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job as it travels to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl JobEnvelope {
    pub fn new(id: u64, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id,
            kind: kind.into(),
            payload,
        }
    }
}

impl From<JobEnvelope> for Value {
    /// Same shape as the `Serialize` impl, without a fallible round trip.
    fn from(job: JobEnvelope) -> Self {
        serde_json::json!({ "id": job.id, "type": job.kind, "payload": job.payload })
    }
}

/// Build a success reply frame.
#[must_use]
pub fn result_frame(id: u64, result: Value) -> Value {
    serde_json::json!({ "id": id, "result": result })
}

/// Build a failure reply frame.
#[must_use]
pub fn error_frame(id: u64, message: &str) -> Value {
    serde_json::json!({ "id": id, "error": message })
}

/// A reply that can be attributed to a job.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    Success { id: u64, result: Value },
    Failure { id: u64, message: String },
}

impl Reply {
    pub fn id(&self) -> u64 {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum MalformedReply {
    #[error("reply has no numeric id")]
    MissingId,
    #[error("reply for job {id} carries neither result nor error")]
    NoOutcome { id: u64 },
}

pub(crate) fn parse_reply(frame: &Value) -> Result<Reply, MalformedReply> {
    let id = frame
        .get("id")
        .and_then(Value::as_u64)
        .ok_or(MalformedReply::MissingId)?;

    if let Some(error) = frame.get("error").filter(|e| !e.is_null()) {
        return Ok(Reply::Failure {
            id,
            message: error_message(error),
        });
    }

    match frame.get("result") {
        Some(result) => Ok(Reply::Success {
            id,
            result: result.clone(),
        }),
        None => Err(MalformedReply::NoOutcome { id }),
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_envelope_wire_shape() {
        let job = JobEnvelope::new(3, "fix", serde_json::json!({"filePath": "/a.js"}));
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["type"], "fix");
        assert_eq!(json["payload"]["filePath"], "/a.js");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_job_envelope_into_value_matches_serialize() {
        let job = JobEnvelope::new(9, "lint", serde_json::json!({"contents": "var x=1"}));
        let serialized = serde_json::to_value(&job).unwrap();
        assert_eq!(Value::from(job), serialized);
    }

    #[test]
    fn test_job_envelope_payload_defaults_to_null() {
        let job: JobEnvelope = serde_json::from_str(r#"{"id":1,"type":"lint"}"#).unwrap();
        assert!(job.payload.is_null());
    }

    #[test]
    fn test_parse_result_reply() {
        let reply = parse_reply(&result_frame(1, serde_json::json!([]))).unwrap();
        assert_eq!(
            reply,
            Reply::Success {
                id: 1,
                result: serde_json::json!([])
            }
        );
    }

    #[test]
    fn test_parse_null_result_is_success() {
        let frame = serde_json::json!({"id": 4, "result": null});
        assert!(matches!(parse_reply(&frame), Ok(Reply::Success { id: 4, .. })));
    }

    #[test]
    fn test_parse_string_error() {
        let reply = parse_reply(&error_frame(2, "No .eslintrc found")).unwrap();
        assert_eq!(
            reply,
            Reply::Failure {
                id: 2,
                message: "No .eslintrc found".to_string()
            }
        );
    }

    #[test]
    fn test_parse_object_error_uses_message() {
        let frame = serde_json::json!({"id": 5, "error": {"message": "boom", "stack": "..."}});
        let reply = parse_reply(&frame).unwrap();
        assert_eq!(reply.id(), 5);
        assert!(matches!(reply, Reply::Failure { message, .. } if message == "boom"));
    }

    #[test]
    fn test_parse_object_error_without_message_is_stringified() {
        let frame = serde_json::json!({"id": 5, "error": {"code": 3}});
        assert!(matches!(
            parse_reply(&frame),
            Ok(Reply::Failure { message, .. }) if message == r#"{"code":3}"#
        ));
    }

    #[test]
    fn test_parse_missing_id() {
        let frame = serde_json::json!({"result": []});
        assert_eq!(parse_reply(&frame), Err(MalformedReply::MissingId));
    }

    #[test]
    fn test_parse_non_numeric_id() {
        let frame = serde_json::json!({"id": "1", "result": []});
        assert_eq!(parse_reply(&frame), Err(MalformedReply::MissingId));
    }

    #[test]
    fn test_parse_no_outcome() {
        let frame = serde_json::json!({"id": 9});
        assert_eq!(parse_reply(&frame), Err(MalformedReply::NoOutcome { id: 9 }));
    }
}
