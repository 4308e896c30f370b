//! Playwatch Core - Playback telemetry adapter
//!
//! This crate instruments a third-party streaming video engine and emits
//! structured playback-quality telemetry to an analytics collector:
//! - Playback lifecycle events from the media element
//! - Variant/bitrate switches, deduplicated against the last emission
//! - Network request timing observed through the engine's response filter
//! - Normalized engine errors
//!
//! It is a monitoring adapter, not a player and not an analytics backend:
//! the engine is consumed through read-only capability traits, and the
//! collector through a `configure`/`dispatch` contract.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       Playwatch Core                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐         │
//! │  │  Attribute   │  │    Event     │  │   Variant    │         │
//! │  │  Extractors  │  │  Normalizer  │  │    Dedup     │         │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘         │
//! │         │                 │                 │                 │
//! │         └─────────────────┼─────────────────┘                 │
//! │                           │                                   │
//! │                    ┌──────┴──────┐     ┌──────────────┐       │
//! │                    │   Session   │─────│ Media-Element│       │
//! │                    │ Orchestrator│     │    Binder    │       │
//! │                    └──────┬──────┘     └──────────────┘       │
//! │                           │                                   │
//! │            PlayerHandle / TelemetryCollector                  │
//! │                 (host capability traits)                      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use playwatch_core::{attach, SessionOptions};
//! use playwatch_core::testing::{FakePlayer, RecordingCollector};
//!
//! let player = Arc::new(FakePlayer::new());
//! let collector = Arc::new(RecordingCollector::new());
//!
//! let session = attach(player.clone(), collector.clone(), SessionOptions::default());
//! assert!(session.is_enabled());
//!
//! // The host engine drives the session through its own callbacks;
//! // tear down when the player goes away.
//! session.destroy();
//! ```

pub mod error;
pub mod types;
pub mod player;
pub mod collector;
pub mod attributes;
pub mod normalize;
pub mod variant;
pub mod binder;
pub mod session;
pub mod testing;

pub use error::{Error, Result};
pub use types::*;
pub use player::{
    DocumentHost, EngineRuntime, FilterId, InstrumentationSlot, ListenerId, MediaElement,
    MediaListener, NetworkingCapability, PlayerHandle, PlayerListener, ResponseFilter,
};
pub use collector::{ConfigureOptions, Dispatcher, TelemetryCollector};
pub use binder::MediaBinding;
pub use session::{attach, SessionHandle, SessionOptions};

/// Adapter name reported in session metadata
pub const ADAPTER_NAME: &str = env!("CARGO_PKG_NAME");

/// Adapter version reported in session metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the adapter library
pub fn init() {
    tracing::info!(version = VERSION, "Playwatch Core initialized");
}
