//! End-to-end instrumentation demo against the in-crate fakes
//!
//! Run with: cargo run --example instrument

use std::sync::Arc;

use playwatch_core::testing::{FakeMediaElement, FakePlayer, RecordingCollector};
use playwatch_core::{attach, MediaEventKind, NetworkResponse, SessionOptions, VariantTrack};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    playwatch_core::init();

    let collector = Arc::new(RecordingCollector::new());
    collector.set_now_ms(1_700_000_000_000);

    let player = Arc::new(FakePlayer::new());
    let element = Arc::new(FakeMediaElement::new());
    element.set_duration(634.5);
    player.set_media_element(Some(Arc::clone(&element)));
    player.set_asset_uri(Some("https://cdn.example/movie/manifest.mpd"));

    let session = attach(
        Arc::clone(&player) as Arc<dyn playwatch_core::PlayerHandle>,
        Arc::clone(&collector) as Arc<dyn playwatch_core::TelemetryCollector>,
        SessionOptions::default(),
    );

    // Simulate what a host engine would drive.
    player.fire_state_change("load");
    element.fire(MediaEventKind::Play);
    element.set_current_time(2.5);
    element.fire(MediaEventKind::TimeUpdate);

    player.set_variant_tracks(vec![VariantTrack {
        active: true,
        bandwidth: Some(2_500_000),
        video_codec: Some("avc1.640028".to_string()),
        frame_rate: Some(30.0),
    }]);
    player.fire_adaptation();

    player.fire_response(
        1,
        &NetworkResponse {
            uri: "https://cdn.example/movie/seg0001.m4s".to_string(),
            byte_length: 524_288,
            time_ms: Some(85.0),
            ..NetworkResponse::default()
        },
    );

    session.destroy();

    println!("\ncollected telemetry:");
    for (name, payload) in collector.events() {
        println!("  {name}: {}", serde_json::Value::Object(payload));
    }
}
