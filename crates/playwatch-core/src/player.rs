//! Host capability traits
//!
//! The adapter never talks to a concrete engine or browser. Everything it
//! needs from the host is expressed as a capability trait: read-only state
//! accessors, event subscription by name, response-filter registration, and
//! the document/fullscreen lookup. Hosts implement these over the real
//! engine; tests implement them over the fakes in [`crate::testing`].

use std::sync::{Arc, Mutex};

use crate::session::SessionHandle;
use crate::types::{
    EngineEvent, EngineVersion, MediaEventKind, NetworkResponse, PlaybackStats, PlayerEventKind,
    VariantTrack,
};

/// Handle identifying one installed event listener
///
/// Returned by the subscription capabilities and required for removal, so
/// the session can uninstall exactly what it installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle identifying one registered response filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(pub u64);

/// Listener invoked for high-level player events
///
/// The host passes itself back on invocation, so listeners never have to
/// hold their own reference to the player.
pub type PlayerListener = Box<dyn Fn(&dyn PlayerHandle, &EngineEvent) + Send + Sync>;

/// Listener invoked for low-level media-element events
pub type MediaListener = Box<dyn Fn(&dyn MediaElement) + Send + Sync>;

/// Filter invoked for every completed network response, with the engine's
/// numeric request-type code
pub type ResponseFilter = Box<dyn Fn(u32, &NetworkResponse) + Send + Sync>;

/// The media element currently attached to the player
pub trait MediaElement: Send + Sync {
    /// Current playhead position in seconds
    fn current_time(&self) -> f64;
    /// Media duration in seconds (may be NaN or infinite before metadata)
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn autoplay(&self) -> bool;
    /// Raw preload attribute value, if set
    fn preload(&self) -> Option<String>;
    fn poster(&self) -> Option<String>;
    /// Language code of the element, if set
    fn language(&self) -> Option<String>;
    /// Rendered (layout) width in pixels
    fn rendered_width(&self) -> u32;
    /// Rendered (layout) height in pixels
    fn rendered_height(&self) -> u32;

    fn add_listener(&self, event: MediaEventKind, listener: MediaListener) -> ListenerId;
    fn remove_listener(&self, event: MediaEventKind, id: ListenerId);
}

/// Response-filter registration exposed by the engine's networking layer
pub trait NetworkingCapability: Send + Sync {
    fn register_response_filter(&self, filter: ResponseFilter) -> FilterId;
    fn unregister_response_filter(&self, id: FilterId);
}

/// Document-level state the adapter would otherwise read from globals
pub trait DocumentHost: Send + Sync {
    /// The element currently presented fullscreen, if any
    fn fullscreen_element(&self) -> Option<Arc<dyn MediaElement>>;
}

/// Engine-namespace lookups the adapter would otherwise read from globals
pub trait EngineRuntime: Send + Sync {
    /// Symbolic name for an engine error code, when the engine's code
    /// table resolves it
    fn error_code_name(&self, code: u32) -> Option<String>;
}

/// The minimal contract the session needs from a playback engine
pub trait PlayerHandle: Send + Sync {
    /// Version marker of the engine; `None` marks an unrecognizable host
    /// and disables instrumentation
    fn version(&self) -> Option<EngineVersion>;

    /// Currently attached media element, if any
    fn media_element(&self) -> Option<Arc<dyn MediaElement>>;

    /// Current playback statistics
    fn stats(&self) -> PlaybackStats;

    /// All variant tracks of the loaded source
    fn variant_tracks(&self) -> Vec<VariantTrack>;

    /// URI of the loaded asset, if any
    fn asset_uri(&self) -> Option<String>;

    fn add_listener(&self, event: PlayerEventKind, listener: PlayerListener) -> ListenerId;
    fn remove_listener(&self, event: PlayerEventKind, id: ListenerId);

    /// Networking capability for response-filter registration
    fn networking(&self) -> &dyn NetworkingCapability;

    /// Slot anchoring the at-most-one live session for this player
    fn instrumentation_slot(&self) -> &InstrumentationSlot;
}

/// Per-player anchor for the active instrumentation session
///
/// Hosts embed one slot per player instance. Attach installs the new
/// session here after tearing down any prior occupant; destroy clears it.
/// The slot keeps the session alive until teardown even if the caller
/// dropped its own handle.
#[derive(Default)]
pub struct InstrumentationSlot {
    current: Mutex<Option<SessionHandle>>,
}

impl InstrumentationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session, returning any prior occupant
    pub(crate) fn install(&self, handle: SessionHandle) -> Option<SessionHandle> {
        self.lock().replace(handle)
    }

    /// Remove and return the current occupant
    pub(crate) fn take(&self) -> Option<SessionHandle> {
        self.lock().take()
    }

    /// Whether a session currently occupies the slot
    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionHandle>> {
        // A poisoned slot still holds coherent data; recover rather than
        // propagate a panic into the host page.
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Thin-pointer identity check for media elements
///
/// Fullscreen detection compares the document's fullscreen element against
/// the player's media element by object identity, not by value.
pub(crate) fn same_element(a: &Arc<dyn MediaElement>, b: &Arc<dyn MediaElement>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
