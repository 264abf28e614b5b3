use crate::domain::{LoginEvent, MessageOutcome, PersistableRecord, RawMessage, RejectReason};
use crate::error::{IngestError, Result};
use crate::pipeline::masking::mask;
use crate::pipeline::validate::{missing_fields, validate};
use serde_json::Value;
use tracing::{debug, warn};

/// Masks the PII fields and reduces `app_version` to its major number.
pub fn transform(event: &LoginEvent) -> Result<PersistableRecord> {
    Ok(PersistableRecord {
        user_id: event.user_id.clone(),
        device_type: event.device_type.clone(),
        masked_ip: mask(&event.ip),
        masked_device_id: mask(&event.device_id),
        locale: event.locale.clone(),
        app_version_major: major_version(&event.app_version)?,
    })
}

/// Builds a `LoginEvent` from an already validated document, then
/// transforms it.
///
/// `ip`, `device_id` and `app_version` must be strings. The pass-through
/// fields accept any scalar and are stored as its text.
pub fn transform_value(value: Value) -> Result<PersistableRecord> {
    let event = LoginEvent {
        user_id: scalar_text(&value, "user_id")?,
        device_type: scalar_text(&value, "device_type")?,
        ip: string_field(&value, "ip")?,
        device_id: string_field(&value, "device_id")?,
        app_version: string_field(&value, "app_version")?,
        locale: scalar_text(&value, "locale")?,
    };
    transform(&event)
}

fn string_field(value: &Value, field: &'static str) -> Result<String> {
    match value.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(IngestError::Transform {
            field,
            message: format!("expected a string, got {}", describe(other)),
        }),
    }
}

fn scalar_text(value: &Value, field: &'static str) -> Result<String> {
    match value.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        other => Err(IngestError::Transform {
            field,
            message: format!("expected a scalar, got {}", describe(other)),
        }),
    }
}

fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a bool",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}

/// "3.2.1" -> 3, "10" -> 10, "0.9" -> 0.
pub fn major_version(app_version: &str) -> Result<u32> {
    let head = app_version.split('.').next().unwrap_or(app_version).trim();
    head.parse::<u32>().map_err(|e| IngestError::Transform {
        field: "app_version",
        message: format!("'{app_version}': {e}"),
    })
}

/// Runs decode, validate and transform for one message.
///
/// Never fails: every problem becomes a rejection so sibling messages in
/// the batch are unaffected.
pub fn process_message(message: &RawMessage) -> MessageOutcome {
    let rejected = |reason: RejectReason| {
        warn!(
            message_id = %message.message_id,
            reason = reason.label(),
            "Skipping message: {:?}",
            reason
        );
        MessageOutcome::Rejected {
            message_id: message.message_id.clone(),
            reason,
        }
    };

    let value: Value = match serde_json::from_str(&message.body) {
        Ok(v) => v,
        Err(e) => return rejected(RejectReason::Decode(e.to_string())),
    };

    if !validate(&value) {
        return rejected(RejectReason::Validation {
            missing: missing_fields(&value),
        });
    }

    match transform_value(value) {
        Ok(record) => {
            debug!(message_id = %message.message_id, user_id = %record.user_id, "Transformed message");
            MessageOutcome::Accepted(record)
        }
        Err(e) => rejected(RejectReason::Transform(e.to_string())),
    }
}
