use std::sync::Arc;

use reeltrim::adapters::memory::{
    MemoryTrimStore, RecordingNotifier, RecordingSessionListener, SessionOutcome, StaticAssetLoader,
};
use reeltrim::adapters::simulated::{
    SimulatedBackendFactory, SimulatedCaptureDevice, SimulatedElement, SimulatedMedia, SimulatedStreamPlayer,
};
use reeltrim::adapters::toml_config::SourceConfig;
use reeltrim::adapters::EngineConfig;
use reeltrim::app::container::DefaultAppContainer;
use reeltrim::app::Recorder;
use reeltrim::ports::{BackendKind, CaptureConstraints};
use reeltrim::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ASSET: &str = "testimonial-9";

struct Rig {
    media: SimulatedMedia,
    store: Arc<MemoryTrimStore>,
    listener: Arc<RecordingSessionListener>,
    ports: TrimSessionPorts,
}

fn rig(config: &EngineConfig, asset: Asset, media: SimulatedMedia, store: MemoryTrimStore) -> Rig {
    let store = Arc::new(store);
    let listener = Arc::new(RecordingSessionListener::new());
    let resolver = DefaultAppContainer::http_resolver(config).unwrap();
    let ports = TrimSessionPorts {
        assets: Arc::new(StaticAssetLoader::new().with_asset(ASSET, asset)),
        store: store.clone(),
        backends: Arc::new(SimulatedBackendFactory::new(media.clone())),
        notifier: Arc::new(RecordingNotifier::new()),
        listener: listener.clone(),
        resolver: Arc::new(resolver),
    };
    Rig {
        media,
        store,
        listener,
        ports,
    }
}

fn run(rig: &Rig, session: &mut TrimSession, seconds: f64) {
    for _ in 0..(seconds / 0.25).round() as usize {
        rig.media.advance(0.25);
        session.pump();
    }
}

#[tokio::test]
async fn test_managed_session_resolved_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets/opaque-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "duration": "75.5" }
        })))
        .mount(&server)
        .await;

    let mut config = EngineConfig::default();
    config.resolver.sources.push(SourceConfig {
        name: "catalog".to_string(),
        url_template: format!("{}/assets/{{asset_id}}", server.uri()),
        duration_pointer: "/data/duration".to_string(),
        bearer_token: None,
        timeout_ms: None,
    });
    let media = SimulatedMedia {
        element: SimulatedElement::new(75.5),
        // The player never reports a usable duration within the test
        player: SimulatedStreamPlayer::new(75.5).duration_after(10_000.0),
    };
    let rig = rig(&config, Asset::managed("opaque-31"), media, MemoryTrimStore::new());

    let mut session = TrimSession::new(ASSET, SessionSettings::from_config(&config, SessionMode::Edit), rig.ports.clone());
    assert_eq!(session.load().await.unwrap(), SessionState::Ready);

    assert_eq!(session.backend_kind(), Some(BackendKind::ManagedStream));
    assert_eq!(session.duration(), 75.5);
    assert_eq!(session.range(), Some(Range::new(0.0, 75.5)));
}

#[tokio::test]
async fn test_recorded_take_is_trimmed_and_committed() {
    let device = SimulatedCaptureDevice::new();
    let mut recorder = Recorder::new(Arc::new(device.clone()), Arc::new(RecordingNotifier::new()), 300.0);
    recorder
        .open(CaptureConstraints {
            video: true,
            audio: true,
        })
        .await
        .unwrap();
    recorder.start().unwrap();
    device.advance(20.0);
    let take = recorder.stop().unwrap();
    assert!(device.tracks_stopped());

    let config = EngineConfig::default();
    let rig = rig(&config, take, SimulatedMedia::new(20.0), MemoryTrimStore::new());
    let mut session = TrimSession::new(ASSET, SessionSettings::default(), rig.ports.clone());
    session.load().await.unwrap();
    session.begin_editing().unwrap();
    session.set_start(2.0).unwrap();
    session.set_end(17.5).unwrap();

    session.play().unwrap();
    run(&rig, &mut session, 16.0);
    assert!(!session.is_playing());
    assert_eq!(session.playhead(), 2.0);

    let committed = session.commit().await.unwrap();
    assert_eq!(committed, Range::new(2.0, 17.5));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(
        rig.listener.outcomes(),
        vec![SessionOutcome::Committed { start: 2.0, end: 17.5 }]
    );
    let stored = rig.store.stored(ASSET).unwrap();
    assert_eq!((stored.start, stored.end), (2.0, 17.5));
}

#[tokio::test]
async fn test_view_session_plays_only_saved_range() {
    let config = EngineConfig::default();
    let rig = rig(
        &config,
        Asset::url("https://cdn.example.com/testimonial.mp4"),
        SimulatedMedia::new(120.0),
        MemoryTrimStore::with_trim(ASSET, 30.0, 90.0),
    );
    let mut session = TrimSession::new(ASSET, SessionSettings::from_config(&config, SessionMode::View), rig.ports.clone());
    session.load().await.unwrap();

    assert_eq!(session.displayed_duration(), 60.0);
    assert_eq!(session.displayed_time(), 0.0);
    assert!(matches!(session.begin_editing(), Err(DomainError::InvalidState(_))));

    session.play().unwrap();
    run(&rig, &mut session, 10.0);
    assert!(session.is_playing());
    assert_eq!(session.displayed_time(), 10.0);

    run(&rig, &mut session, 55.0);
    assert!(!session.is_playing());
    assert_eq!(session.playhead(), 30.0);
    assert_eq!(session.corrections(), 1);

    session.cancel().unwrap();
    assert_eq!(rig.listener.outcomes(), vec![SessionOutcome::Cancelled]);
    assert!(rig.media.element.is_revoked());
}
