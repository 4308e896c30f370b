//! Media-element binder
//!
//! Installs the low-level playback listeners on the currently attached
//! media element and records exactly what it installed, keyed by logical
//! event name, so teardown can remove the original listener set even if
//! the element was replaced later in the session.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::collector::{sec_to_ms_floor, Dispatcher};
use crate::error::Error;
use crate::player::{ListenerId, MediaElement, PlayerHandle};
use crate::types::{EventPayload, MediaEventKind};

/// The listener set installed on one media element
///
/// Holds the element it bound so removal targets the same object the
/// listeners were installed on.
pub struct MediaBinding {
    element: Arc<dyn MediaElement>,
    listeners: HashMap<MediaEventKind, ListenerId>,
}

impl MediaBinding {
    /// Number of installed listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Installed listener id for one event, if present
    pub fn listener_id(&self, event: MediaEventKind) -> Option<ListenerId> {
        self.listeners.get(&event).copied()
    }

    /// Remove every installed listener from the bound element
    pub fn unbind(mut self) {
        for (event, id) in self.listeners.drain() {
            self.element.remove_listener(event, id);
        }
        debug!("Media element listeners removed");
    }
}

/// Attach the playback lifecycle listeners to the player's media element
///
/// Each listener dispatches a telemetry event of the same name. The
/// `timeupdate` payload additionally carries the playhead position in
/// floored milliseconds; the other eight carry empty payloads. Returns
/// `None` (after a diagnostic warning) when no media element is attached;
/// that is non-fatal, the session simply stays unbound.
pub fn bind(player: &dyn PlayerHandle, dispatcher: &Dispatcher) -> Option<MediaBinding> {
    let Some(element) = player.media_element() else {
        warn!(
            code = Error::MediaElementUnavailable.error_code(),
            "Media element unavailable on the player; playback events will not be tracked"
        );
        return None;
    };

    let mut listeners = HashMap::with_capacity(MediaEventKind::ALL.len());
    for event in MediaEventKind::ALL {
        let dispatcher = dispatcher.clone();
        let id = element.add_listener(
            event,
            Box::new(move |element| {
                let mut payload = EventPayload::new();
                if event == MediaEventKind::TimeUpdate {
                    payload.insert(
                        "player_playhead_time".to_string(),
                        Value::from(sec_to_ms_floor(element.current_time())),
                    );
                }
                dispatcher.dispatch(event.as_str(), payload);
            }),
        );
        listeners.insert(event, id);
    }

    debug!(listeners = listeners.len(), "Media element listeners installed");
    Some(MediaBinding { element, listeners })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::TelemetryCollector;
    use crate::testing::{FakeMediaElement, FakePlayer, RecordingCollector};
    use crate::types::SessionToken;

    fn dispatcher(collector: &Arc<RecordingCollector>) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(collector) as Arc<dyn TelemetryCollector>,
            SessionToken::new("test-token"),
        )
    }

    #[test]
    fn test_bind_installs_all_nine_listeners() {
        let collector = Arc::new(RecordingCollector::new());
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        player.set_media_element(Some(Arc::clone(&element)));

        let binding = bind(&player, &dispatcher(&collector)).unwrap();

        assert_eq!(binding.len(), 9);
        assert_eq!(element.listener_count(), 9);
        for event in MediaEventKind::ALL {
            assert!(binding.listener_id(event).is_some());
        }
    }

    #[test]
    fn test_bind_without_element_is_non_fatal() {
        let collector = Arc::new(RecordingCollector::new());
        let player = FakePlayer::new();

        assert!(bind(&player, &dispatcher(&collector)).is_none());
        assert!(collector.events().is_empty());
    }

    #[test]
    fn test_listeners_dispatch_same_named_events() {
        let collector = Arc::new(RecordingCollector::new());
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        player.set_media_element(Some(Arc::clone(&element)));
        let _binding = bind(&player, &dispatcher(&collector)).unwrap();

        element.fire(MediaEventKind::Play);
        element.fire(MediaEventKind::Waiting);
        element.fire(MediaEventKind::Ended);

        let names: Vec<String> = collector.events().iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, vec!["play", "waiting", "ended"]);
        // Non-timeupdate payloads are empty.
        assert!(collector.events()[0].1.is_empty());
    }

    #[test]
    fn test_timeupdate_carries_playhead_ms() {
        let collector = Arc::new(RecordingCollector::new());
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        element.set_current_time(3.2109);
        player.set_media_element(Some(Arc::clone(&element)));
        let _binding = bind(&player, &dispatcher(&collector)).unwrap();

        element.fire(MediaEventKind::TimeUpdate);

        let events = collector.events_named("timeupdate");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["player_playhead_time"], 3210);
    }

    #[test]
    fn test_unbind_removes_exactly_what_was_installed() {
        let collector = Arc::new(RecordingCollector::new());
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        player.set_media_element(Some(Arc::clone(&element)));

        let binding = bind(&player, &dispatcher(&collector)).unwrap();
        assert_eq!(element.listener_count(), 9);

        binding.unbind();
        assert_eq!(element.listener_count(), 0);

        // Fired events after unbind reach no listener.
        element.fire(MediaEventKind::Play);
        assert!(collector.events().is_empty());
    }

    #[test]
    fn test_double_bind_tracks_each_set_separately() {
        let collector = Arc::new(RecordingCollector::new());
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        player.set_media_element(Some(Arc::clone(&element)));
        let dispatcher = dispatcher(&collector);

        let first = bind(&player, &dispatcher).unwrap();
        let second = bind(&player, &dispatcher).unwrap();
        assert_eq!(element.listener_count(), 18);

        // Removing each recorded set leaves nothing behind.
        first.unbind();
        assert_eq!(element.listener_count(), 9);
        second.unbind();
        assert_eq!(element.listener_count(), 0);
    }
}
