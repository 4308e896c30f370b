//! Instrumentation session - the orchestrator
//!
//! Owns the per-player lifecycle: validates the host, obtains a session
//! token from the collector, registers the high-level listeners and the
//! network filter, hands the configure payload over, and guarantees that
//! teardown removes exactly what was installed, exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::attributes;
use crate::binder::{self, MediaBinding};
use crate::collector::{ConfigureOptions, Dispatcher, TelemetryCollector};
use crate::error::Error;
use crate::normalize;
use crate::player::{DocumentHost, EngineRuntime, FilterId, ListenerId, PlayerHandle};
use crate::types::{
    EngineError, EngineEvent, EventPayload, PlayerEventKind, SessionToken, VariantSnapshot,
};
use crate::variant;

/// Caller-facing session options
///
/// `custom_data` is merged into the configure payload; the static engine
/// and adapter identifiers win on key collisions. The engine runtime and
/// document host are the injected stand-ins for what a browser host would
/// read from globals.
pub struct SessionOptions {
    /// Track engine error events automatically (default: true)
    pub automatic_error_tracking: bool,
    /// Arbitrary caller metadata merged into every session
    pub custom_data: EventPayload,
    /// Engine-namespace lookups, used to resolve symbolic error names
    pub engine: Option<Arc<dyn EngineRuntime>>,
    /// Document-level state, used for fullscreen detection
    pub document: Option<Arc<dyn DocumentHost>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            automatic_error_tracking: true,
            custom_data: EventPayload::new(),
            engine: None,
            document: None,
        }
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("automatic_error_tracking", &self.automatic_error_tracking)
            .field("custom_data", &self.custom_data)
            .field("engine", &self.engine.is_some())
            .field("document", &self.document.is_some())
            .finish()
    }
}

/// State shared between the session and its registered callbacks
struct SessionShared {
    /// Installed once, on the first state change with a media element
    media_binding: Option<MediaBinding>,
    /// Last-emitted variant triple
    last_variant: VariantSnapshot,
}

/// Live session internals
struct ActiveSession {
    player: Arc<dyn PlayerHandle>,
    dispatcher: Dispatcher,
    shared: Arc<Mutex<SessionShared>>,
    /// Registry of the installed high-level listeners, for exact removal
    player_listeners: Mutex<HashMap<PlayerEventKind, ListenerId>>,
    filter_id: Mutex<Option<FilterId>>,
    automatic_error_tracking: bool,
    engine: Option<Arc<dyn EngineRuntime>>,
    destroyed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Callbacks never hold a guard across host calls into us, so a poisoned
    // mutex still holds coherent state; recover instead of panicking into
    // the host page.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ActiveSession {
    fn dispatch(&self, event: &str, payload: EventPayload) {
        if self.destroyed.load(Ordering::SeqCst) {
            warn!(
                event,
                code = Error::SessionDestroyed.error_code(),
                "Telemetry dispatched after session teardown; dropping"
            );
            return;
        }
        self.dispatcher.dispatch(event, payload);
    }

    fn handle_load_error(&self, err: &EngineError) {
        if !self.automatic_error_tracking {
            return;
        }
        if let Some(normalized) = normalize::normalize_error(err, self.engine.as_deref()) {
            self.dispatch("error", normalized.to_payload());
        }
    }

    /// Reverse every registration exactly once
    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug!("Session already destroyed; teardown is a no-op");
            return;
        }

        for (event, id) in lock(&self.player_listeners).drain() {
            self.player.remove_listener(event, id);
        }
        if let Some(binding) = lock(&self.shared).media_binding.take() {
            binding.unbind();
        }
        if let Some(filter) = lock(&self.filter_id).take() {
            self.player.networking().unregister_response_filter(filter);
        }

        self.dispatcher.dispatch("destroy", EventPayload::new());
        self.player.instrumentation_slot().take();
        info!(token = %self.dispatcher.token(), "Instrumentation session destroyed");
    }
}

/// Handle to one instrumentation session
///
/// Returned by [`attach`]. A disabled handle (invalid host) warns on every
/// call instead of reaching the collector; the host page is never
/// disrupted either way.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Option<Arc<ActiveSession>>,
}

impl SessionHandle {
    /// The no-op handle returned for unrecognizable players
    pub(crate) fn disabled() -> Self {
        Self { inner: None }
    }

    /// Whether this handle is backed by a live session
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Session token the telemetry is dispatched under, if enabled
    pub fn token(&self) -> Option<&SessionToken> {
        self.inner.as_ref().map(|session| session.dispatcher.token())
    }

    /// Forward a custom telemetry event to the collector
    pub fn dispatch(&self, event: &str, payload: EventPayload) {
        match &self.inner {
            Some(session) => session.dispatch(event, payload),
            None => warn!(
                event,
                "'dispatch' is unavailable: attach did not receive a valid player instance"
            ),
        }
    }

    /// Route an error surfaced outside the engine's event stream
    ///
    /// Caller-driven load failures land here. No-op unless automatic error
    /// tracking is enabled.
    pub fn handle_load_error(&self, err: &EngineError) {
        match &self.inner {
            Some(session) => session.handle_load_error(err),
            None => warn!(
                "'handle_load_error' is unavailable: attach did not receive a valid player instance"
            ),
        }
    }

    /// Tear the session down; safe to call repeatedly
    pub fn destroy(&self) {
        match &self.inner {
            Some(session) => session.destroy(),
            None => warn!("'destroy' is unavailable: attach did not receive a valid player instance"),
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Attach instrumentation to a player
///
/// Validates the host softly: a player without a version marker gets a
/// warning and a disabled handle, never a panic or an error. A prior
/// session on the same player is torn down synchronously before the new
/// one is installed.
pub fn attach(
    player: Arc<dyn PlayerHandle>,
    collector: Arc<dyn TelemetryCollector>,
    options: SessionOptions,
) -> SessionHandle {
    let Some(version) = player.version() else {
        warn!(
            code = Error::InvalidPlayer.error_code(),
            "A valid player instance is required to enable telemetry tracking; \
             returning a disabled session"
        );
        return SessionHandle::disabled();
    };

    // Re-init closes the one race this design has: eagerly tear down any
    // prior occupant before registering anything new.
    if let Some(prior) = player.instrumentation_slot().take() {
        debug!("Prior session found on player; destroying before re-attach");
        prior.destroy();
    }

    let token = collector.generate_session_token();
    let dispatcher = Dispatcher::new(Arc::clone(&collector), token.clone());
    let shared = Arc::new(Mutex::new(SessionShared {
        media_binding: None,
        last_variant: VariantSnapshot::unset(),
    }));
    let automatic_error_tracking = options.automatic_error_tracking;

    let mut listeners = HashMap::new();

    // State change: install the media binding on first availability, and
    // announce readiness whenever the engine reports the "load" state.
    let binding_shared = Arc::clone(&shared);
    let binding_dispatcher = dispatcher.clone();
    listeners.insert(
        PlayerEventKind::StateChange,
        player.add_listener(
            PlayerEventKind::StateChange,
            Box::new(move |player, event| {
                {
                    let mut session = lock(&binding_shared);
                    if session.media_binding.is_none() && player.media_element().is_some() {
                        session.media_binding = binder::bind(player, &binding_dispatcher);
                    }
                }
                if let EngineEvent::StateChange { state } = event {
                    if state == "load" {
                        binding_dispatcher.dispatch("playerReady", EventPayload::new());
                    }
                }
            }),
        ),
    );

    // Adaptation and manual variant switches run the same deduplicator.
    for kind in [PlayerEventKind::Adaptation, PlayerEventKind::VariantChanged] {
        let variant_shared = Arc::clone(&shared);
        let variant_dispatcher = dispatcher.clone();
        listeners.insert(
            kind,
            player.add_listener(
                kind,
                Box::new(move |player, _event| {
                    let tracks = player.variant_tracks();
                    let mut session = lock(&variant_shared);
                    session.last_variant =
                        variant::reconcile(&tracks, &session.last_variant, &variant_dispatcher);
                }),
            ),
        );
    }

    if automatic_error_tracking {
        let error_engine = options.engine.clone();
        let error_dispatcher = dispatcher.clone();
        listeners.insert(
            PlayerEventKind::Error,
            player.add_listener(
                PlayerEventKind::Error,
                Box::new(move |_player, event| {
                    if let EngineEvent::Error(err) = event {
                        if let Some(normalized) =
                            normalize::normalize_error(err, error_engine.as_deref())
                        {
                            error_dispatcher.dispatch("error", normalized.to_payload());
                        }
                    }
                }),
            ),
        );
    }

    let filter_dispatcher = dispatcher.clone();
    let filter_id = player.networking().register_response_filter(Box::new(
        move |type_code, response| {
            let now = filter_dispatcher.now_ms();
            if let Some(event) = normalize::normalize_response(type_code, response, now) {
                filter_dispatcher.dispatch("requestCompleted", event.to_payload());
            }
        },
    ));

    let session = Arc::new(ActiveSession {
        player: Arc::clone(&player),
        dispatcher,
        shared,
        player_listeners: Mutex::new(listeners),
        filter_id: Mutex::new(Some(filter_id)),
        automatic_error_tracking,
        engine: options.engine.clone(),
        destroyed: AtomicBool::new(false),
    });
    let handle = SessionHandle {
        inner: Some(session),
    };
    player.instrumentation_slot().install(handle.clone());

    // Static identifiers win over caller metadata on key collisions.
    let mut metadata = options.custom_data;
    metadata.insert("player_software_name".to_string(), Value::from(version.name.clone()));
    metadata.insert(
        "player_software_version".to_string(),
        Value::from(version.version.clone()),
    );
    metadata.insert("player_adapter_name".to_string(), Value::from(crate::ADAPTER_NAME));
    metadata.insert("player_adapter_version".to_string(), Value::from(crate::VERSION));

    let state_player = Arc::clone(&player);
    let state_document = options.document.clone();
    let playhead_player = Arc::clone(&player);
    collector.configure(
        &token,
        ConfigureOptions {
            automatic_error_tracking,
            metadata,
            fetch_state_data: Box::new(move || {
                attributes::snapshot(state_player.as_ref(), state_document.as_deref()).to_payload()
            }),
            fetch_playhead_time: Box::new(move || attributes::playhead_ms(playhead_player.as_ref())),
        },
    );

    info!(token = %token, engine = %version.name, "Instrumentation session attached");
    handle
}
