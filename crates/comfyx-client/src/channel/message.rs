//! Decoding of job engine WebSocket messages.

use comfyx_core::{ExecutionEvent, Progress};
use serde::Deserialize;
use serde_json::Value;

/// Envelope of every text message: `{"type": ..., "data": {...}}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decodes a text message into an event.
///
/// Returns `None` for messages that are not envelopes and for envelope
/// types that carry no job progress (`status`, `executing`, ...).
pub(crate) fn parse_envelope(text: &str) -> Option<ExecutionEvent> {
    let Envelope { kind, data } = serde_json::from_str(text).ok()?;

    let event = match kind.as_str() {
        "progress" => ExecutionEvent::Progress(Progress {
            job_id: string_field(&data, "prompt_id"),
            node_id: string_field(&data, "node").unwrap_or_default(),
            value: count_field(&data, "value"),
            max: count_field(&data, "max"),
        }),
        "executed" => ExecutionEvent::Completed {
            job_id: string_field(&data, "prompt_id"),
            node_id: string_field(&data, "node"),
        },
        "execution_error" => ExecutionEvent::Failed {
            job_id: string_field(&data, "prompt_id"),
            message: string_field(&data, "exception_message").unwrap_or_else(|| data.to_string()),
        },
        _ => return None,
    };

    Some(event)
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn count_field(data: &Value, key: &str) -> u64 {
    data.get(key)
        .and_then(|value| {
            value
                .as_u64()
                .or_else(|| value.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
        })
        .unwrap_or_default()
}
