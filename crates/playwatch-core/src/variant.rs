//! Variant-change deduplicator
//!
//! The engine fires adaptation and variant-changed events liberally; the
//! collector only wants to hear about actual switches. This module tracks
//! the last-emitted (bitrate, codec, frame rate) triple and emits a
//! `variantChanged` event only on a structural difference.

use tracing::debug;

use crate::collector::Dispatcher;
use crate::types::{VariantSnapshot, VariantTrack};

/// Reconcile the active variant track against the last-emitted snapshot
///
/// Locates the single track flagged active. No active track, or a
/// candidate identical to `previous`, returns `previous` unchanged with no
/// event. A differing candidate is dispatched as `variantChanged` and
/// becomes the new snapshot.
pub fn reconcile(
    tracks: &[VariantTrack],
    previous: &VariantSnapshot,
    dispatcher: &Dispatcher,
) -> VariantSnapshot {
    let Some(active) = tracks.iter().find(|track| track.active) else {
        return previous.clone();
    };

    let candidate = VariantSnapshot::from_track(active);
    if candidate == *previous {
        return previous.clone();
    }

    debug!(
        bitrate = ?candidate.bitrate,
        codec = ?candidate.codec,
        fps = ?candidate.frame_rate,
        "Variant changed"
    );
    dispatcher.dispatch("variantChanged", candidate.to_payload());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCollector;
    use std::sync::Arc;

    fn track(active: bool, bandwidth: u64, codec: &str, fps: f64) -> VariantTrack {
        VariantTrack {
            active,
            bandwidth: Some(bandwidth),
            video_codec: Some(codec.to_string()),
            frame_rate: Some(fps),
        }
    }

    fn dispatcher(collector: &Arc<RecordingCollector>) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(collector) as Arc<dyn crate::collector::TelemetryCollector>,
            crate::types::SessionToken::new("test-token"),
        )
    }

    #[test]
    fn test_first_active_track_emits() {
        let collector = Arc::new(RecordingCollector::new());
        let dispatcher = dispatcher(&collector);
        let tracks = vec![track(false, 250_000, "avc1", 30.0), track(true, 500_000, "avc1", 30.0)];

        let next = reconcile(&tracks, &VariantSnapshot::unset(), &dispatcher);

        assert_eq!(next.bitrate, Some(500_000));
        let events = collector.events_named("variantChanged");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["video_source_bitrate"], 500_000);
        assert_eq!(events[0]["video_source_codec"], "avc1");
        assert_eq!(events[0]["video_source_fps"], 30.0);
    }

    #[test]
    fn test_unchanged_active_track_is_silent() {
        let collector = Arc::new(RecordingCollector::new());
        let dispatcher = dispatcher(&collector);
        let tracks = vec![track(true, 500_000, "avc1", 30.0)];

        let first = reconcile(&tracks, &VariantSnapshot::unset(), &dispatcher);
        let second = reconcile(&tracks, &first, &dispatcher);
        let third = reconcile(&tracks, &second, &dispatcher);

        assert_eq!(second, first);
        assert_eq!(third, first);
        assert_eq!(collector.events_named("variantChanged").len(), 1);
    }

    #[test]
    fn test_no_active_track_retains_previous() {
        let collector = Arc::new(RecordingCollector::new());
        let dispatcher = dispatcher(&collector);
        let previous = VariantSnapshot {
            bitrate: Some(500_000),
            codec: Some("avc1".to_string()),
            frame_rate: Some(30.0),
        };

        let tracks = vec![track(false, 800_000, "avc1", 30.0)];
        let next = reconcile(&tracks, &previous, &dispatcher);

        assert_eq!(next, previous);
        assert!(collector.events_named("variantChanged").is_empty());

        // Empty track list behaves the same.
        let next = reconcile(&[], &previous, &dispatcher);
        assert_eq!(next, previous);
        assert!(collector.events_named("variantChanged").is_empty());
    }

    #[test]
    fn test_bitrate_switch_emits_exactly_once() {
        let collector = Arc::new(RecordingCollector::new());
        let dispatcher = dispatcher(&collector);

        let low = vec![track(true, 500_000, "avc1", 30.0)];
        let high = vec![track(true, 800_000, "avc1", 30.0)];

        let first = reconcile(&low, &VariantSnapshot::unset(), &dispatcher);
        let second = reconcile(&high, &first, &dispatcher);
        reconcile(&high, &second, &dispatcher);

        let events = collector.events_named("variantChanged");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["video_source_bitrate"], 800_000);
        assert_eq!(events[1]["video_source_codec"], "avc1");
        assert_eq!(events[1]["video_source_fps"], 30.0);
    }

    #[test]
    fn test_partially_unset_triples_compare_structurally() {
        let collector = Arc::new(RecordingCollector::new());
        let dispatcher = dispatcher(&collector);

        let no_fps = vec![VariantTrack {
            active: true,
            bandwidth: Some(500_000),
            video_codec: Some("avc1".to_string()),
            frame_rate: None,
        }];

        let first = reconcile(&no_fps, &VariantSnapshot::unset(), &dispatcher);
        assert_eq!(collector.events_named("variantChanged").len(), 1);
        assert!(!collector.events_named("variantChanged")[0].contains_key("video_source_fps"));

        // Same triple again, still one event.
        reconcile(&no_fps, &first, &dispatcher);
        assert_eq!(collector.events_named("variantChanged").len(), 1);
    }
}
