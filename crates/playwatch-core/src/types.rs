//! Telemetry data model
//!
//! The serialized field names are the adapter's wire vocabulary: whatever
//! the analytics collector receives uses these exact keys, so the serde
//! renames here are part of the public contract.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Payload handed to the collector with every dispatched event
pub type EventPayload = serde_json::Map<String, Value>;

/// Serialize any wire type into an event payload map
pub(crate) fn to_payload<T: Serialize>(value: &T) -> EventPayload {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => EventPayload::new(),
    }
}

/// Opaque session identity issued by the collector
///
/// Scopes all telemetry dispatched for one player instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap an existing token value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random token (the default collector strategy)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Token value as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version marker exposed by a recognizable playback engine
///
/// A player handle that cannot produce one is treated as an invalid host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    /// Engine software name (e.g. "Shaka Player")
    pub name: String,
    /// Engine software version string
    pub version: String,
}

/// Point-in-time playback statistics read from the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Intrinsic width of the active video source
    pub width: u32,
    /// Intrinsic height of the active video source
    pub height: u32,
    /// Frames dropped since playback began
    pub dropped_frames: u64,
}

/// One selectable quality/encoding option of the media source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantTrack {
    /// Whether the engine currently plays this track
    pub active: bool,
    /// Bandwidth in bits per second
    pub bandwidth: Option<u64>,
    /// Video codec string (e.g. "avc1")
    pub video_codec: Option<String>,
    /// Frames per second
    pub frame_rate: Option<f64>,
}

/// Last-emitted (bitrate, codec, frame rate) triple
///
/// Two snapshots are equal iff all three fields are equal; the dedup rule
/// is exact structural match, no tolerance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantSnapshot {
    #[serde(rename = "video_source_bitrate", skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(rename = "video_source_codec", skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(rename = "video_source_fps", skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

impl VariantSnapshot {
    /// The "unset" snapshot used before any variant has been observed
    pub fn unset() -> Self {
        Self::default()
    }

    /// Build a snapshot from a variant track's encoding triple
    pub fn from_track(track: &VariantTrack) -> Self {
        Self {
            bitrate: track.bandwidth,
            codec: track.video_codec.clone(),
            frame_rate: track.frame_rate,
        }
    }

    /// Event payload with unset fields omitted
    pub fn to_payload(&self) -> EventPayload {
        to_payload(self)
    }
}

/// Recognized network request categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Manifest,
    Media,
    Encryption,
}

impl RequestType {
    /// Map the engine's numeric request-type code
    ///
    /// Codes outside the table are not an error; the response is simply
    /// not observed.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(RequestType::Manifest),
            1 => Some(RequestType::Media),
            6 => Some(RequestType::Encryption),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Manifest => "manifest",
            RequestType::Media => "media",
            RequestType::Encryption => "encryption",
        }
    }
}

/// Completed network response as reported by the engine's response filter
#[derive(Debug, Clone, Default)]
pub struct NetworkResponse {
    /// Request URI
    pub uri: String,
    /// Whether the response was served from cache
    pub from_cache: bool,
    /// Response body length in bytes
    pub byte_length: u64,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Elapsed request time in milliseconds, when the engine reports one
    pub time_ms: Option<f64>,
}

/// Normalized `requestCompleted` event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRequestEvent {
    #[serde(rename = "request_bytes_loaded")]
    pub bytes_loaded: u64,
    #[serde(rename = "request_hostname", skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(rename = "request_url")]
    pub url: String,
    #[serde(rename = "request_response_headers")]
    pub response_headers: HashMap<String, String>,
    #[serde(rename = "request_type")]
    pub request_type: RequestType,
    /// Wall-clock start, present only when the engine reported elapsed time
    #[serde(rename = "request_start", skip_serializing_if = "Option::is_none")]
    pub start_offset_ms: Option<i64>,
    /// Wall-clock completion observed at filter invocation
    #[serde(rename = "request_response_end")]
    pub completion_time_ms: i64,
}

impl NormalizedRequestEvent {
    pub fn to_payload(&self) -> EventPayload {
        to_payload(self)
    }
}

/// Severity classes reported by the engine's error events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The engine will retry or continue; not surfaced as telemetry
    #[default]
    Recoverable,
    /// Fatal-class error; surfaced when a code is present
    Critical,
}

impl ErrorSeverity {
    /// Map the engine's numeric severity convention (1 = recoverable,
    /// 2 = critical)
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ErrorSeverity::Recoverable),
            2 => Some(ErrorSeverity::Critical),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorSeverity::Critical)
    }
}

/// Raw error surfaced by the engine (event stream or caller-driven load)
#[derive(Debug, Clone, Default)]
pub struct EngineError {
    pub severity: ErrorSeverity,
    /// Engine-specific numeric error code
    pub code: Option<u32>,
    /// Human-readable message, when the engine provides one
    pub message: Option<String>,
    /// Engine-specific error data, stringified into the event context
    pub data: Option<Value>,
}

impl EngineError {
    /// Fatal-class error with the given code
    pub fn critical(code: u32) -> Self {
        Self {
            severity: ErrorSeverity::Critical,
            code: Some(code),
            ..Self::default()
        }
    }
}

/// Normalized `error` event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedErrorEvent {
    #[serde(rename = "player_error_code")]
    pub code: u32,
    #[serde(rename = "player_error_message")]
    pub message: String,
    #[serde(rename = "player_error_context", skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl NormalizedErrorEvent {
    pub fn to_payload(&self) -> EventPayload {
        to_payload(self)
    }
}

/// Point-in-time read of observable player state
///
/// Produced fresh on every request, never cached. Numeric fields default
/// to 0 when the media element is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStateSnapshot {
    #[serde(rename = "player_is_paused")]
    pub is_paused: bool,
    #[serde(rename = "player_width")]
    pub rendered_width: u32,
    #[serde(rename = "player_height")]
    pub rendered_height: u32,
    #[serde(rename = "video_source_width")]
    pub source_width: u32,
    #[serde(rename = "video_source_height")]
    pub source_height: u32,
    #[serde(rename = "player_autoplay_on")]
    pub autoplay: bool,
    #[serde(rename = "player_preload_on")]
    pub preload_valid: bool,
    #[serde(rename = "player_is_fullscreen")]
    pub is_fullscreen: bool,
    #[serde(rename = "video_source_url", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(rename = "video_source_duration")]
    pub duration_ms: u64,
    #[serde(rename = "view_dropped_frame_count")]
    pub dropped_frames: u64,
    #[serde(rename = "video_poster_url", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(rename = "player_language_code", skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl PlayerStateSnapshot {
    pub fn to_payload(&self) -> EventPayload {
        to_payload(self)
    }
}

/// Low-level playback lifecycle events observed on the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    Pause,
    Play,
    Playing,
    Seeking,
    Seeked,
    TimeUpdate,
    Stalled,
    Waiting,
    Ended,
}

impl MediaEventKind {
    /// The fixed set of events the media-element binder installs
    pub const ALL: [MediaEventKind; 9] = [
        MediaEventKind::Pause,
        MediaEventKind::Play,
        MediaEventKind::Playing,
        MediaEventKind::Seeking,
        MediaEventKind::Seeked,
        MediaEventKind::TimeUpdate,
        MediaEventKind::Stalled,
        MediaEventKind::Waiting,
        MediaEventKind::Ended,
    ];

    /// Telemetry event name dispatched for this media event
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaEventKind::Pause => "pause",
            MediaEventKind::Play => "play",
            MediaEventKind::Playing => "playing",
            MediaEventKind::Seeking => "seeking",
            MediaEventKind::Seeked => "seeked",
            MediaEventKind::TimeUpdate => "timeupdate",
            MediaEventKind::Stalled => "stalled",
            MediaEventKind::Waiting => "waiting",
            MediaEventKind::Ended => "ended",
        }
    }
}

/// High-level events observed on the player itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerEventKind {
    StateChange,
    Adaptation,
    VariantChanged,
    Error,
}

impl PlayerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerEventKind::StateChange => "statechange",
            PlayerEventKind::Adaptation => "adaptation",
            PlayerEventKind::VariantChanged => "variantchanged",
            PlayerEventKind::Error => "error",
        }
    }
}

/// Payload delivered to high-level player listeners
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The engine's load state machine moved to a named state
    StateChange { state: String },
    /// The engine adapted to a different variant automatically
    Adaptation,
    /// The active variant changed (manual or automatic)
    VariantChanged,
    /// The engine surfaced an error
    Error(EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_table() {
        assert_eq!(RequestType::from_code(0), Some(RequestType::Manifest));
        assert_eq!(RequestType::from_code(1), Some(RequestType::Media));
        assert_eq!(RequestType::from_code(6), Some(RequestType::Encryption));
        assert_eq!(RequestType::from_code(2), None);
        assert_eq!(RequestType::from_code(7), None);
    }

    #[test]
    fn test_variant_snapshot_equality_is_structural() {
        let a = VariantSnapshot {
            bitrate: Some(500_000),
            codec: Some("avc1".to_string()),
            frame_rate: Some(30.0),
        };
        let b = a.clone();
        assert_eq!(a, b);

        let c = VariantSnapshot {
            bitrate: Some(800_000),
            ..a.clone()
        };
        assert_ne!(a, c);
        assert_ne!(VariantSnapshot::unset(), a);
        assert_eq!(VariantSnapshot::unset(), VariantSnapshot::default());
    }

    #[test]
    fn test_variant_snapshot_payload_omits_unset_fields() {
        let snapshot = VariantSnapshot {
            bitrate: Some(800_000),
            codec: None,
            frame_rate: Some(30.0),
        };
        let payload = snapshot.to_payload();

        assert_eq!(payload["video_source_bitrate"], 800_000);
        assert_eq!(payload["video_source_fps"], 30.0);
        assert!(!payload.contains_key("video_source_codec"));
    }

    #[test]
    fn test_severity_codes() {
        assert_eq!(ErrorSeverity::from_code(1), Some(ErrorSeverity::Recoverable));
        assert_eq!(ErrorSeverity::from_code(2), Some(ErrorSeverity::Critical));
        assert_eq!(ErrorSeverity::from_code(0), None);
        assert!(ErrorSeverity::Critical.is_fatal());
        assert!(!ErrorSeverity::Recoverable.is_fatal());
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_state_snapshot_payload_keys() {
        let snapshot = PlayerStateSnapshot {
            is_paused: true,
            rendered_width: 640,
            duration_ms: 120_000,
            source_url: Some("https://cdn.example/manifest.mpd".to_string()),
            ..PlayerStateSnapshot::default()
        };
        let payload = snapshot.to_payload();

        assert_eq!(payload["player_is_paused"], true);
        assert_eq!(payload["player_width"], 640);
        assert_eq!(payload["video_source_duration"], 120_000);
        assert_eq!(payload["video_source_url"], "https://cdn.example/manifest.mpd");
        // Unset optional fields stay off the wire.
        assert!(!payload.contains_key("video_poster_url"));
        assert!(!payload.contains_key("player_language_code"));
    }
}
