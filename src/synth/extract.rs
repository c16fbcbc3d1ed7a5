//! Lenient JSON extraction from noisy model output.
//!
//! The backend is asked for a bare JSON object but often wraps it in prose or
//! a markdown fence. Everything from the first `{` to the last `}` is taken as
//! the candidate object.

use serde_json::Value;

use super::SoftFailure;

pub const THREAD_FIELD: &str = "twitter_thread";

/// Parsed answer before the thread contract is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadPayload {
    Segments(Vec<String>),
    /// Valid object whose thread field is absent, null or an empty array.
    Missing,
}

/// Slice between the first `{` and the last `}` (inclusive).
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

pub fn parse_thread_payload(raw: &str) -> Result<ThreadPayload, SoftFailure> {
    let json = extract_json_object(raw).ok_or(SoftFailure::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| SoftFailure::InvalidJson(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(SoftFailure::WrongShape("top level is not an object"));
    };

    match map.get(THREAD_FIELD) {
        None | Some(Value::Null) => Ok(ThreadPayload::Missing),
        Some(Value::Array(items)) if items.is_empty() => Ok(ThreadPayload::Missing),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(ThreadPayload::Segments)
            .ok_or(SoftFailure::WrongShape("thread contains non-string entries")),
        Some(_) => Err(SoftFailure::WrongShape("thread field is not an array")),
    }
}
