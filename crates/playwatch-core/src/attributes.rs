//! Attribute extractors
//!
//! Pure reads of current player/media state into normalized telemetry
//! fields. Every read is defensive: a missing player capability or media
//! element degrades to zero/unset defaults, never to a failure. Nothing
//! here is cached; the collector polls these on its own schedule and must
//! always see fresh values.

use crate::player::{same_element, DocumentHost, MediaElement, PlayerHandle};
use crate::collector::sec_to_ms_floor;
use crate::types::PlayerStateSnapshot;

/// Current playhead position in whole milliseconds
///
/// Returns 0 when no media element is attached.
pub fn playhead_ms(player: &dyn PlayerHandle) -> u64 {
    match player.media_element() {
        Some(element) => sec_to_ms_floor(element.current_time()),
        None => 0,
    }
}

/// Whether the element's preload attribute requests eager loading
///
/// True iff the attribute is exactly `auto` or `metadata`.
pub fn preload_is_valid(element: &dyn MediaElement) -> bool {
    matches!(element.preload().as_deref(), Some("auto") | Some("metadata"))
}

/// Whether the player's media element is the fullscreen element
pub fn is_fullscreen(player: &dyn PlayerHandle, document: Option<&dyn DocumentHost>) -> bool {
    let (Some(document), Some(element)) = (document, player.media_element()) else {
        return false;
    };
    match document.fullscreen_element() {
        Some(fullscreen) => same_element(&fullscreen, &element),
        None => false,
    }
}

/// Point-in-time snapshot of observable player state
pub fn snapshot(player: &dyn PlayerHandle, document: Option<&dyn DocumentHost>) -> PlayerStateSnapshot {
    let stats = player.stats();
    let element = player.media_element();

    let mut state = PlayerStateSnapshot {
        source_width: stats.width,
        source_height: stats.height,
        dropped_frames: stats.dropped_frames,
        source_url: player.asset_uri(),
        is_fullscreen: is_fullscreen(player, document),
        ..PlayerStateSnapshot::default()
    };

    if let Some(element) = element {
        state.is_paused = element.paused();
        state.rendered_width = element.rendered_width();
        state.rendered_height = element.rendered_height();
        state.autoplay = element.autoplay();
        state.preload_valid = preload_is_valid(element.as_ref());
        state.duration_ms = sec_to_ms_floor(element.duration());
        state.poster_url = element.poster();
        state.language_code = element.language();
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDocument, FakeMediaElement, FakePlayer};
    use crate::types::PlaybackStats;
    use std::sync::Arc;

    #[test]
    fn test_playhead_is_floored_milliseconds() {
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        element.set_current_time(12.3456);
        player.set_media_element(Some(element));

        assert_eq!(playhead_ms(&player), 12_345);
    }

    #[test]
    fn test_playhead_without_media_element_is_zero() {
        let player = FakePlayer::new();
        assert_eq!(playhead_ms(&player), 0);
    }

    #[test]
    fn test_preload_validity() {
        let element = FakeMediaElement::new();

        element.set_preload(Some("auto"));
        assert!(preload_is_valid(&element));

        element.set_preload(Some("metadata"));
        assert!(preload_is_valid(&element));

        element.set_preload(Some("none"));
        assert!(!preload_is_valid(&element));

        element.set_preload(None);
        assert!(!preload_is_valid(&element));
    }

    #[test]
    fn test_fullscreen_requires_identity_match() {
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        player.set_media_element(Some(Arc::clone(&element)));

        let document = FakeDocument::new();
        let host: &dyn DocumentHost = &document;
        assert!(!is_fullscreen(&player, Some(host)));

        // A different element fullscreen is not "our" fullscreen.
        document.set_fullscreen_element(Some(Arc::new(FakeMediaElement::new())));
        assert!(!is_fullscreen(&player, Some(host)));

        document.set_fullscreen_element(Some(element));
        assert!(is_fullscreen(&player, Some(host)));

        assert!(!is_fullscreen(&player, None));
    }

    #[test]
    fn test_snapshot_defaults_without_media_element() {
        let player = FakePlayer::new();
        player.set_stats(PlaybackStats {
            width: 1920,
            height: 1080,
            dropped_frames: 7,
        });

        let state = snapshot(&player, None);
        assert_eq!(state.source_width, 1920);
        assert_eq!(state.source_height, 1080);
        assert_eq!(state.dropped_frames, 7);
        // Element-derived fields stay at their defensive defaults.
        assert_eq!(state.rendered_width, 0);
        assert_eq!(state.duration_ms, 0);
        assert!(!state.is_paused);
        assert!(state.poster_url.is_none());
    }

    #[test]
    fn test_snapshot_reads_element_state() {
        let player = FakePlayer::new();
        let element = Arc::new(FakeMediaElement::new());
        element.set_paused(true);
        element.set_rendered_size(640, 360);
        element.set_duration(95.5009);
        element.set_preload(Some("metadata"));
        element.set_poster(Some("https://cdn.example/poster.jpg"));
        element.set_language(Some("en"));
        player.set_media_element(Some(element));
        player.set_asset_uri(Some("https://cdn.example/manifest.mpd"));

        let state = snapshot(&player, None);
        assert!(state.is_paused);
        assert_eq!(state.rendered_width, 640);
        assert_eq!(state.rendered_height, 360);
        assert_eq!(state.duration_ms, 95_500);
        assert!(state.preload_valid);
        assert_eq!(state.poster_url.as_deref(), Some("https://cdn.example/poster.jpg"));
        assert_eq!(state.language_code.as_deref(), Some("en"));
        assert_eq!(
            state.source_url.as_deref(),
            Some("https://cdn.example/manifest.mpd")
        );
    }
}
