//! Fake hosts and collector for deterministic tests
//!
//! Hand-rolled fakes rather than a mocking crate: the capability traits
//! hand out boxed callbacks whose delivery order and re-registration
//! semantics are exactly what the tests exercise, so the fakes model a
//! small DOM-like host directly. Listeners are invoked outside the
//! registry locks, so a callback may add or remove listeners on the same
//! host without deadlocking; removals take effect for the next delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::collector::{ConfigureOptions, TelemetryCollector};
use crate::player::{
    DocumentHost, EngineRuntime, FilterId, InstrumentationSlot, ListenerId, MediaElement,
    MediaListener, NetworkingCapability, PlayerHandle, PlayerListener, ResponseFilter,
};
use crate::types::{
    EngineError, EngineEvent, EngineVersion, EventPayload, MediaEventKind, NetworkResponse,
    PlaybackStats, PlayerEventKind, SessionToken, VariantTrack,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mutable state of a fake media element
#[derive(Default)]
struct ElementState {
    current_time: f64,
    duration: f64,
    paused: bool,
    autoplay: bool,
    preload: Option<String>,
    poster: Option<String>,
    language: Option<String>,
    rendered_width: u32,
    rendered_height: u32,
}

/// In-memory media element with settable state and fireable events
#[derive(Default)]
pub struct FakeMediaElement {
    state: Mutex<ElementState>,
    listeners: Mutex<HashMap<MediaEventKind, Vec<(ListenerId, Arc<MediaListener>)>>>,
    next_id: AtomicU64,
}

impl FakeMediaElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_time(&self, seconds: f64) {
        lock(&self.state).current_time = seconds;
    }

    pub fn set_duration(&self, seconds: f64) {
        lock(&self.state).duration = seconds;
    }

    pub fn set_paused(&self, paused: bool) {
        lock(&self.state).paused = paused;
    }

    pub fn set_autoplay(&self, autoplay: bool) {
        lock(&self.state).autoplay = autoplay;
    }

    pub fn set_preload(&self, preload: Option<&str>) {
        lock(&self.state).preload = preload.map(str::to_owned);
    }

    pub fn set_poster(&self, poster: Option<&str>) {
        lock(&self.state).poster = poster.map(str::to_owned);
    }

    pub fn set_language(&self, language: Option<&str>) {
        lock(&self.state).language = language.map(str::to_owned);
    }

    pub fn set_rendered_size(&self, width: u32, height: u32) {
        let mut state = lock(&self.state);
        state.rendered_width = width;
        state.rendered_height = height;
    }

    /// Total number of installed listeners across all events
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).values().map(Vec::len).sum()
    }

    /// Deliver one media event to every installed listener
    pub fn fire(&self, event: MediaEventKind) {
        let targets: Vec<Arc<MediaListener>> = lock(&self.listeners)
            .get(&event)
            .map(|entries| entries.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();
        for listener in targets {
            (**listener)(self);
        }
    }
}

impl MediaElement for FakeMediaElement {
    fn current_time(&self) -> f64 {
        lock(&self.state).current_time
    }

    fn duration(&self) -> f64 {
        lock(&self.state).duration
    }

    fn paused(&self) -> bool {
        lock(&self.state).paused
    }

    fn autoplay(&self) -> bool {
        lock(&self.state).autoplay
    }

    fn preload(&self) -> Option<String> {
        lock(&self.state).preload.clone()
    }

    fn poster(&self) -> Option<String> {
        lock(&self.state).poster.clone()
    }

    fn language(&self) -> Option<String> {
        lock(&self.state).language.clone()
    }

    fn rendered_width(&self) -> u32 {
        lock(&self.state).rendered_width
    }

    fn rendered_height(&self) -> u32 {
        lock(&self.state).rendered_height
    }

    fn add_listener(&self, event: MediaEventKind, listener: MediaListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).entry(event).or_default().push((id, Arc::new(listener)));
        id
    }

    fn remove_listener(&self, event: MediaEventKind, id: ListenerId) {
        if let Some(entries) = lock(&self.listeners).get_mut(&event) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }
}

/// In-memory networking capability with fireable responses
#[derive(Default)]
pub struct FakeNetworking {
    filters: Mutex<Vec<(FilterId, Arc<ResponseFilter>)>>,
    next_id: AtomicU64,
}

impl FakeNetworking {
    pub fn filter_count(&self) -> usize {
        lock(&self.filters).len()
    }

    /// Deliver one completed response to every registered filter
    pub fn fire_response(&self, type_code: u32, response: &NetworkResponse) {
        let targets: Vec<Arc<ResponseFilter>> = lock(&self.filters)
            .iter()
            .map(|(_, filter)| Arc::clone(filter))
            .collect();
        for filter in targets {
            (**filter)(type_code, response);
        }
    }
}

impl NetworkingCapability for FakeNetworking {
    fn register_response_filter(&self, filter: ResponseFilter) -> FilterId {
        let id = FilterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.filters).push((id, Arc::new(filter)));
        id
    }

    fn unregister_response_filter(&self, id: FilterId) {
        lock(&self.filters).retain(|(entry_id, _)| *entry_id != id);
    }
}

/// In-memory player implementing the full capability contract
pub struct FakePlayer {
    version: Option<EngineVersion>,
    media: Mutex<Option<Arc<dyn MediaElement>>>,
    stats: Mutex<PlaybackStats>,
    tracks: Mutex<Vec<VariantTrack>>,
    asset_uri: Mutex<Option<String>>,
    listeners: Mutex<HashMap<PlayerEventKind, Vec<(ListenerId, Arc<PlayerListener>)>>>,
    networking: FakeNetworking,
    slot: InstrumentationSlot,
    next_id: AtomicU64,
}

impl FakePlayer {
    /// A recognizable player (carries a version marker)
    pub fn new() -> Self {
        Self::with_version(Some(EngineVersion {
            name: "Fake Engine".to_string(),
            version: "4.2.0".to_string(),
        }))
    }

    /// An unrecognizable host: no version marker, so attach must disable
    pub fn unversioned() -> Self {
        Self::with_version(None)
    }

    fn with_version(version: Option<EngineVersion>) -> Self {
        Self {
            version,
            media: Mutex::new(None),
            stats: Mutex::new(PlaybackStats::default()),
            tracks: Mutex::new(Vec::new()),
            asset_uri: Mutex::new(None),
            listeners: Mutex::new(HashMap::new()),
            networking: FakeNetworking::default(),
            slot: InstrumentationSlot::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn set_media_element(&self, element: Option<Arc<FakeMediaElement>>) {
        *lock(&self.media) = element.map(|element| element as Arc<dyn MediaElement>);
    }

    pub fn set_stats(&self, stats: PlaybackStats) {
        *lock(&self.stats) = stats;
    }

    pub fn set_variant_tracks(&self, tracks: Vec<VariantTrack>) {
        *lock(&self.tracks) = tracks;
    }

    pub fn set_asset_uri(&self, uri: Option<&str>) {
        *lock(&self.asset_uri) = uri.map(str::to_owned);
    }

    /// The concrete networking fake, for registration assertions
    pub fn networking_fake(&self) -> &FakeNetworking {
        &self.networking
    }

    pub fn listener_count(&self, event: PlayerEventKind) -> usize {
        lock(&self.listeners).get(&event).map_or(0, Vec::len)
    }

    pub fn total_listener_count(&self) -> usize {
        lock(&self.listeners).values().map(Vec::len).sum()
    }

    /// Deliver one player event to every installed listener
    pub fn fire(&self, kind: PlayerEventKind, event: &EngineEvent) {
        let targets: Vec<Arc<PlayerListener>> = lock(&self.listeners)
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();
        for listener in targets {
            (**listener)(self, event);
        }
    }

    pub fn fire_state_change(&self, state: &str) {
        self.fire(
            PlayerEventKind::StateChange,
            &EngineEvent::StateChange {
                state: state.to_string(),
            },
        );
    }

    pub fn fire_adaptation(&self) {
        self.fire(PlayerEventKind::Adaptation, &EngineEvent::Adaptation);
    }

    pub fn fire_variant_changed(&self) {
        self.fire(PlayerEventKind::VariantChanged, &EngineEvent::VariantChanged);
    }

    pub fn fire_error(&self, err: EngineError) {
        self.fire(PlayerEventKind::Error, &EngineEvent::Error(err));
    }

    pub fn fire_response(&self, type_code: u32, response: &NetworkResponse) {
        self.networking.fire_response(type_code, response);
    }
}

impl Default for FakePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerHandle for FakePlayer {
    fn version(&self) -> Option<EngineVersion> {
        self.version.clone()
    }

    fn media_element(&self) -> Option<Arc<dyn MediaElement>> {
        lock(&self.media).clone()
    }

    fn stats(&self) -> PlaybackStats {
        *lock(&self.stats)
    }

    fn variant_tracks(&self) -> Vec<VariantTrack> {
        lock(&self.tracks).clone()
    }

    fn asset_uri(&self) -> Option<String> {
        lock(&self.asset_uri).clone()
    }

    fn add_listener(&self, event: PlayerEventKind, listener: PlayerListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).entry(event).or_default().push((id, Arc::new(listener)));
        id
    }

    fn remove_listener(&self, event: PlayerEventKind, id: ListenerId) {
        if let Some(entries) = lock(&self.listeners).get_mut(&event) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    fn networking(&self) -> &dyn NetworkingCapability {
        &self.networking
    }

    fn instrumentation_slot(&self) -> &InstrumentationSlot {
        &self.slot
    }
}

/// Document host with a settable fullscreen element
#[derive(Default)]
pub struct FakeDocument {
    fullscreen: Mutex<Option<Arc<dyn MediaElement>>>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fullscreen_element(&self, element: Option<Arc<FakeMediaElement>>) {
        *lock(&self.fullscreen) = element.map(|element| element as Arc<dyn MediaElement>);
    }
}

impl DocumentHost for FakeDocument {
    fn fullscreen_element(&self) -> Option<Arc<dyn MediaElement>> {
        lock(&self.fullscreen).clone()
    }
}

/// Engine runtime with a configurable error-code table
#[derive(Default)]
pub struct FakeEngineRuntime {
    names: Mutex<HashMap<u32, String>>,
}

impl FakeEngineRuntime {
    pub fn with_code(code: u32, name: &str) -> Self {
        let runtime = Self::default();
        runtime.add_code(code, name);
        runtime
    }

    pub fn add_code(&self, code: u32, name: &str) {
        lock(&self.names).insert(code, name.to_string());
    }
}

impl EngineRuntime for FakeEngineRuntime {
    fn error_code_name(&self, code: u32) -> Option<String> {
        lock(&self.names).get(&code).cloned()
    }
}

/// Collector that records everything and runs on a pinned clock
pub struct RecordingCollector {
    now_ms: AtomicI64,
    events: Mutex<Vec<(SessionToken, String, EventPayload)>>,
    configured: Mutex<Vec<ConfigureOptions>>,
}

impl RecordingCollector {
    pub fn new() -> Self {
        Self {
            now_ms: AtomicI64::new(0),
            events: Mutex::new(Vec::new()),
            configured: Mutex::new(Vec::new()),
        }
    }

    pub fn set_now_ms(&self, now: i64) {
        self.now_ms.store(now, Ordering::SeqCst);
    }

    pub fn advance_now(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// All dispatched (event, payload) pairs, in order
    pub fn events(&self) -> Vec<(String, EventPayload)> {
        lock(&self.events)
            .iter()
            .map(|(_, name, payload)| (name.clone(), payload.clone()))
            .collect()
    }

    /// Payloads of every dispatched event with the given name, in order
    pub fn events_named(&self, name: &str) -> Vec<EventPayload> {
        lock(&self.events)
            .iter()
            .filter(|(_, event, _)| event == name)
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }

    /// Tokens the recorded events were dispatched under, in order
    pub fn event_tokens(&self) -> Vec<SessionToken> {
        lock(&self.events).iter().map(|(token, _, _)| token.clone()).collect()
    }

    pub fn configure_count(&self) -> usize {
        lock(&self.configured).len()
    }

    /// Remove and return the most recent configure payload
    pub fn take_configure_options(&self) -> Option<ConfigureOptions> {
        lock(&self.configured).pop()
    }
}

impl Default for RecordingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryCollector for RecordingCollector {
    fn generate_session_token(&self) -> SessionToken {
        SessionToken::generate()
    }

    fn configure(&self, _token: &SessionToken, options: ConfigureOptions) {
        lock(&self.configured).push(options);
    }

    fn dispatch(&self, token: &SessionToken, event: &str, payload: EventPayload) {
        lock(&self.events).push((token.clone(), event.to_string(), payload));
    }

    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
