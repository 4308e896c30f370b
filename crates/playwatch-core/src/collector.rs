//! Analytics ingestion-core contract
//!
//! The collector is an external collaborator: it batches, transports, and
//! sessions telemetry. This module pins down the only surface the adapter
//! consumes: token generation, a one-time configure call, per-event
//! dispatch, and a wall clock.

use std::fmt;
use std::sync::Arc;

use crate::types::{EventPayload, SessionToken};

/// Computed accessor handed to the collector for on-demand state reads
pub type StateAccessor = Box<dyn Fn() -> EventPayload + Send + Sync>;

/// Computed accessor handed to the collector for on-demand playhead reads
pub type PlayheadAccessor = Box<dyn Fn() -> u64 + Send + Sync>;

/// Configuration payload handed to [`TelemetryCollector::configure`]
///
/// Carries the merged caller/default options, the static session metadata,
/// and the two computed accessors the collector polls while the session is
/// live.
pub struct ConfigureOptions {
    /// Whether engine errors are tracked automatically (default: true)
    pub automatic_error_tracking: bool,
    /// Caller metadata merged with the static engine/adapter identifiers
    pub metadata: EventPayload,
    /// Fresh player-state snapshot, read on every call
    pub fetch_state_data: StateAccessor,
    /// Current playhead position in whole milliseconds
    pub fetch_playhead_time: PlayheadAccessor,
}

impl fmt::Debug for ConfigureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigureOptions")
            .field("automatic_error_tracking", &self.automatic_error_tracking)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Contract of the analytics ingestion core
pub trait TelemetryCollector: Send + Sync {
    /// Issue a fresh opaque session token
    fn generate_session_token(&self) -> SessionToken;

    /// Hand over session configuration; called once per session, before
    /// any telemetry is dispatched under the token
    fn configure(&self, token: &SessionToken, options: ConfigureOptions);

    /// Deliver one telemetry event under the session token
    fn dispatch(&self, token: &SessionToken, event: &str, payload: EventPayload);

    /// Current wall-clock time in epoch milliseconds
    ///
    /// Request timing is stamped through the collector so tests can pin
    /// the clock.
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Collector bound to one session token
///
/// Every callback of a session dispatches through its own dispatcher, so
/// the token travels with the event without threading it everywhere.
#[derive(Clone)]
pub struct Dispatcher {
    collector: Arc<dyn TelemetryCollector>,
    token: SessionToken,
}

impl Dispatcher {
    pub fn new(collector: Arc<dyn TelemetryCollector>, token: SessionToken) -> Self {
        Self { collector, token }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn now_ms(&self) -> i64 {
        self.collector.now_ms()
    }

    pub fn dispatch(&self, event: &str, payload: EventPayload) {
        self.collector.dispatch(&self.token, event, payload);
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("token", &self.token).finish_non_exhaustive()
    }
}

/// Convert seconds to whole milliseconds, flooring
///
/// Non-finite and negative inputs (unset durations, pre-metadata reads)
/// clamp to 0.
pub fn sec_to_ms_floor(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).floor() as u64
}

/// Hostname of a request URL, when it parses as an absolute URL
pub fn hostname_of(uri: &str) -> Option<String> {
    url::Url::parse(uri).ok()?.host_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sec_to_ms_floors() {
        assert_eq!(sec_to_ms_floor(0.0), 0);
        assert_eq!(sec_to_ms_floor(1.0), 1000);
        assert_eq!(sec_to_ms_floor(12.3456), 12_345);
        assert_eq!(sec_to_ms_floor(0.0009), 0);
    }

    #[test]
    fn test_sec_to_ms_clamps_invalid_input() {
        assert_eq!(sec_to_ms_floor(f64::NAN), 0);
        assert_eq!(sec_to_ms_floor(f64::INFINITY), 0);
        assert_eq!(sec_to_ms_floor(-3.0), 0);
    }

    #[test]
    fn test_hostname_extraction() {
        assert_eq!(
            hostname_of("https://cdn.example/seg1.ts").as_deref(),
            Some("cdn.example")
        );
        assert_eq!(
            hostname_of("https://media.example.com:8443/live/index.m3u8").as_deref(),
            Some("media.example.com")
        );
        assert_eq!(hostname_of("not a url"), None);
        assert_eq!(hostname_of("/relative/seg1.ts"), None);
    }
}
