//! Event normalizer
//!
//! Translates engine-specific shapes into the adapter's canonical event
//! vocabulary: numeric request-type codes into [`RequestType`], completed
//! responses into `requestCompleted` payloads, and engine error events
//! into `error` payloads with a resolved message.

use crate::collector::hostname_of;
use crate::player::EngineRuntime;
use crate::types::{
    EngineError, NetworkResponse, NormalizedErrorEvent, NormalizedRequestEvent, RequestType,
};

/// Normalize one completed network response
///
/// Returns `None` for cache hits and unrecognized request-type codes; both
/// are dropped silently, not errors. `now_ms` is the wall clock observed
/// at filter invocation and becomes the completion timestamp; the start
/// offset is derived from the engine-reported elapsed time when present.
pub fn normalize_response(
    type_code: u32,
    response: &NetworkResponse,
    now_ms: i64,
) -> Option<NormalizedRequestEvent> {
    if response.from_cache {
        return None;
    }
    let request_type = RequestType::from_code(type_code)?;

    Some(NormalizedRequestEvent {
        bytes_loaded: response.byte_length,
        hostname: hostname_of(&response.uri),
        url: response.uri.clone(),
        response_headers: response.headers.clone(),
        request_type,
        start_offset_ms: response.time_ms.map(|elapsed| now_ms - elapsed as i64),
        completion_time_ms: now_ms,
    })
}

/// Resolve the telemetry message for an engine error
///
/// Resolution order: symbolic name from the engine runtime's code table,
/// then the error's own message, then the stringified code, then empty.
fn resolve_message(err: &EngineError, engine: Option<&dyn EngineRuntime>) -> String {
    if let (Some(code), Some(engine)) = (err.code, engine) {
        if let Some(name) = engine.error_code_name(code) {
            return name;
        }
    }
    if let Some(message) = &err.message {
        return message.clone();
    }
    if let Some(code) = err.code {
        return code.to_string();
    }
    String::new()
}

/// Normalize one engine error into telemetry
///
/// Only fatal-class errors carrying a code are surfaced; lower-severity or
/// codeless errors return `None` and are dropped.
pub fn normalize_error(
    err: &EngineError,
    engine: Option<&dyn EngineRuntime>,
) -> Option<NormalizedErrorEvent> {
    if !err.severity.is_fatal() {
        return None;
    }
    let code = err.code?;

    Some(NormalizedErrorEvent {
        code,
        message: resolve_message(err, engine),
        context: err.data.as_ref().map(|data| match data {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
    })
}
