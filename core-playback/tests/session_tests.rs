//! Integration tests for the playback session against a scripted engine and
//! a real in-memory track store.

use async_trait::async_trait;
use bridge_traits::engine::{AudioEngine, AudioSource, EngineHandle, EngineStatus};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::settings::SettingsStore;
use core_library::db::create_test_pool;
use core_library::models::TrackPatch;
use core_library::repositories::{SqliteTrackRepository, TrackRepository};
use core_playback::{PlaybackConfig, PlaybackError, PlaybackSession, PlayerState, QueueItem};
use core_runtime::events::EventBus;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
    Unload,
}

struct FakeHandle {
    source: AudioSource,
    tx: watch::Sender<EngineStatus>,
    commands: Mutex<Vec<Command>>,
}

impl FakeHandle {
    fn new(source: AudioSource, ready: bool, duration: f64) -> Arc<Self> {
        let (tx, _) = watch::channel(EngineStatus {
            ready,
            playing: false,
            buffering: false,
            position_secs: 0.0,
            duration_secs: duration,
        });
        Arc::new(Self {
            source,
            tx,
            commands: Mutex::new(Vec::new()),
        })
    }

    fn set_status(&self, update: impl FnOnce(&mut EngineStatus)) {
        self.tx.send_modify(update);
    }

    fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl EngineHandle for FakeHandle {
    fn status(&self) -> watch::Receiver<EngineStatus> {
        self.tx.subscribe()
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record(Command::Play);
        self.tx.send_modify(|s| s.playing = true);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(Command::Pause);
        self.tx.send_modify(|s| s.playing = false);
        Ok(())
    }

    async fn seek(&self, position_secs: f64) -> BridgeResult<()> {
        self.record(Command::Seek(position_secs));
        self.tx.send_modify(|s| s.position_secs = position_secs);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> BridgeResult<()> {
        self.record(Command::Volume(volume));
        Ok(())
    }

    async fn unload(&self) -> BridgeResult<()> {
        self.record(Command::Unload);
        Ok(())
    }
}

struct FakeEngine {
    ready_on_load: bool,
    duration: f64,
    handles: Mutex<Vec<Arc<FakeHandle>>>,
}

impl FakeEngine {
    fn new(ready_on_load: bool, duration: f64) -> Arc<Self> {
        Arc::new(Self {
            ready_on_load,
            duration,
            handles: Mutex::new(Vec::new()),
        })
    }

    fn handle(&self, index: usize) -> Arc<FakeHandle> {
        self.handles.lock().unwrap()[index].clone()
    }

    fn load_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    fn loaded_sources(&self) -> Vec<AudioSource> {
        self.handles
            .lock()
            .unwrap()
            .iter()
            .map(|h| h.source.clone())
            .collect()
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn load(&self, source: AudioSource) -> BridgeResult<Arc<dyn EngineHandle>> {
        let handle = FakeHandle::new(source, self.ready_on_load, self.duration);
        self.handles.lock().unwrap().push(handle.clone());
        Ok(handle as Arc<dyn EngineHandle>)
    }
}

struct FakeSettings {
    autoplay: Option<bool>,
}

#[async_trait]
impl SettingsStore for FakeSettings {
    async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.autoplay)
    }
    async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
        Ok(())
    }
    async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
        Ok(None)
    }
    async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
        Ok(())
    }
    async fn remove(&self, _key: &str) -> BridgeResult<()> {
        Ok(())
    }
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    session: Arc<PlaybackSession>,
    engine: Arc<FakeEngine>,
    tracks: Arc<SqliteTrackRepository>,
}

async fn fixture(autoplay: Option<bool>) -> Fixture {
    fixture_with(autoplay, true, PlaybackConfig::default()).await
}

async fn fixture_with(
    autoplay: Option<bool>,
    ready_on_load: bool,
    config: PlaybackConfig,
) -> Fixture {
    let pool = create_test_pool().await.expect("test pool");
    let tracks = Arc::new(SqliteTrackRepository::new(pool));
    let engine = FakeEngine::new(ready_on_load, 100.0);
    let settings = Arc::new(FakeSettings { autoplay });
    let events = Arc::new(EventBus::new(64));

    let session = PlaybackSession::new(
        engine.clone(),
        tracks.clone(),
        settings,
        events,
        config,
    );

    Fixture {
        session,
        engine,
        tracks,
    }
}

fn track_url(n: usize) -> String {
    format!("https://audio.example.org/files/Katha/{:02}--Track.mp3", n)
}

fn queue_items(count: usize) -> Vec<QueueItem> {
    (0..count)
        .map(|n| QueueItem {
            track_url: track_url(n),
            track_name: format!("{:02} - Track", n),
            folder_path: "/Katha".to_string(),
            folder_name: "Katha".to_string(),
        })
        .collect()
}

async fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

async fn wait_for_state(session: &PlaybackSession, want: PlayerState, timeout: Duration) -> bool {
    wait_for(|| session.current_state() == want, timeout).await
}

// ============================================================================
// Loading & source selection
// ============================================================================

#[tokio::test]
async fn play_enters_playing_and_stamps_history() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(2), 0).await.unwrap();

    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);
    assert_eq!(f.engine.load_count(), 1);

    let record = f.tracks.find_by_url(&track_url(0)).await.unwrap().unwrap();
    assert_eq!(record.track_name, "00 - Track");
    assert!(record.last_played_at.is_some());
}

#[tokio::test]
async fn downloaded_track_plays_from_local_file() {
    let f = fixture(Some(true)).await;

    f.tracks
        .upsert(
            TrackPatch::new(track_url(0))
                .is_downloaded(true)
                .local_file_path("/data/downloads/katha-00.mp3"),
        )
        .await
        .unwrap();

    f.session.play_queue(queue_items(1), 0).await.unwrap();

    let sources = f.engine.loaded_sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(
        sources[0],
        AudioSource::LocalFile {
            path: PathBuf::from("/data/downloads/katha-00.mp3")
        }
    );
}

#[tokio::test]
async fn undownloaded_track_streams_from_remote() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();

    assert_eq!(
        f.engine.loaded_sources()[0],
        AudioSource::RemoteStream { url: track_url(0) }
    );
}

#[tokio::test]
async fn play_resumes_from_stored_position() {
    let f = fixture(Some(true)).await;

    f.tracks.update_position(&track_url(0), 42.5, false).await.unwrap();

    f.session.play_queue(queue_items(1), 0).await.unwrap();

    let commands = f.engine.handle(0).commands();
    assert!(
        commands
            .iter()
            .any(|c| matches!(c, Command::Seek(p) if (p - 42.5).abs() < 1e-9)),
        "expected a resume seek, got {:?}",
        commands
    );
}

#[tokio::test]
async fn completed_track_restarts_from_zero() {
    let f = fixture(Some(true)).await;

    // Natural completion leaves the record completed with position 0
    f.tracks.update_position(&track_url(0), 0.0, true).await.unwrap();

    f.session.play_queue(queue_items(1), 0).await.unwrap();

    let commands = f.engine.handle(0).commands();
    assert!(
        !commands.iter().any(|c| matches!(c, Command::Seek(_))),
        "completed tracks must not resume-seek, got {:?}",
        commands
    );
}

#[tokio::test]
async fn engine_never_ready_times_out_into_error() {
    let config = PlaybackConfig {
        ready_timeout: Duration::from_millis(200),
        ..PlaybackConfig::default()
    };
    let f = fixture_with(Some(true), false, config).await;

    let result = f.session.play_queue(queue_items(1), 0).await;
    assert!(matches!(result, Err(PlaybackError::ReadyTimeout(_))));
    assert!(matches!(f.session.current_state(), PlayerState::Error(_)));

    // The failed handle was released
    assert!(f.engine.handle(0).commands().contains(&Command::Unload));
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test]
async fn natural_completion_persists_and_advances_with_autoplay() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(2), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    // The engine reaches the end of the track and stops
    f.engine.handle(0).set_status(|s| {
        s.playing = false;
        s.position_secs = 99.8;
    });

    // Autoplay loads the next queue item
    let engine = f.engine.clone();
    assert!(wait_for(|| engine.load_count() == 2, Duration::from_secs(2)).await);
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    // The finished track reads completed with position zero
    let record = f.tracks.find_by_url(&track_url(0)).await.unwrap().unwrap();
    assert!(record.is_completed);
    assert_eq!(record.playback_position, 0.0);

    let current = f.session.current_item().await.unwrap();
    assert_eq!(current.track_url, track_url(1));
}

#[tokio::test]
async fn completion_without_autoplay_settles_into_paused() {
    let f = fixture(Some(false)).await;

    f.session.play_queue(queue_items(2), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.engine.handle(0).set_status(|s| {
        s.playing = false;
        s.position_secs = 99.9;
    });

    assert!(wait_for_state(&f.session, PlayerState::Paused, Duration::from_secs(2)).await);

    // No advance happened
    assert_eq!(f.engine.load_count(), 1);
    let record = f.tracks.find_by_url(&track_url(0)).await.unwrap().unwrap();
    assert!(record.is_completed);
}

#[tokio::test]
async fn completion_at_queue_end_settles_into_paused() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.engine.handle(0).set_status(|s| {
        s.playing = false;
        s.position_secs = 100.0;
    });

    assert!(wait_for_state(&f.session, PlayerState::Paused, Duration::from_secs(2)).await);
    assert_eq!(f.engine.load_count(), 1);
}

// ============================================================================
// Navigation
// ============================================================================

#[tokio::test]
async fn play_previous_restarts_when_past_the_window() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(2), 1).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    // 10 seconds in: "previous" restarts instead of changing tracks
    f.engine.handle(0).set_status(|s| s.position_secs = 10.0);
    f.session.play_previous().await.unwrap();

    assert_eq!(f.engine.load_count(), 1, "no new load");
    let commands = f.engine.handle(0).commands();
    assert!(commands
        .iter()
        .any(|c| matches!(c, Command::Seek(p) if *p == 0.0)));

    let (_, position) = f.session.queue_snapshot().await;
    assert_eq!(position, Some(1), "queue pointer unchanged");
}

#[tokio::test]
async fn play_previous_goes_back_early_in_the_track() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(2), 1).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    // Under 3 seconds in: jump to the previous item
    f.engine.handle(0).set_status(|s| s.position_secs = 1.0);
    f.session.play_previous().await.unwrap();

    assert_eq!(f.engine.load_count(), 2);
    let current = f.session.current_item().await.unwrap();
    assert_eq!(current.track_url, track_url(0));
}

#[tokio::test]
async fn play_next_past_end_is_a_noop() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.session.play_next().await.unwrap();

    assert_eq!(f.engine.load_count(), 1);
    let current = f.session.current_item().await.unwrap();
    assert_eq!(current.track_url, track_url(0));
}

#[tokio::test]
async fn skip_forward_clamps_to_duration() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.engine.handle(0).set_status(|s| s.position_secs = 95.0);
    f.session.skip_forward(30.0).await.unwrap();

    let commands = f.engine.handle(0).commands();
    assert!(commands
        .iter()
        .any(|c| matches!(c, Command::Seek(p) if (*p - 100.0).abs() < 1e-9)));
}

#[tokio::test]
async fn skip_backward_clamps_to_zero() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.engine.handle(0).set_status(|s| s.position_secs = 4.0);
    f.session.skip_backward(10.0).await.unwrap();

    let commands = f.engine.handle(0).commands();
    assert!(commands
        .iter()
        .any(|c| matches!(c, Command::Seek(p) if *p == 0.0)));
}

// ============================================================================
// Pause / resume / stop
// ============================================================================

#[tokio::test]
async fn pause_and_resume_round_trip() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.session.pause().await.unwrap();
    assert_eq!(f.session.current_state(), PlayerState::Paused);

    f.session.resume().await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn toggle_dispatches_on_state() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.session.toggle_play_pause().await.unwrap();
    assert_eq!(f.session.current_state(), PlayerState::Paused);

    f.session.toggle_play_pause().await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn stop_flushes_position_and_returns_to_idle() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(2), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.engine.handle(0).set_status(|s| s.position_secs = 77.0);
    f.session.stop().await.unwrap();

    assert_eq!(f.session.current_state(), PlayerState::Idle);
    assert!(f.engine.handle(0).commands().contains(&Command::Unload));

    // The outgoing position survived the teardown
    let record = f.tracks.find_by_url(&track_url(0)).await.unwrap().unwrap();
    assert_eq!(record.playback_position, 77.0);
    assert!(!record.is_completed);

    let (items, position) = f.session.queue_snapshot().await;
    assert!(items.is_empty());
    assert_eq!(position, None);
}

#[tokio::test]
async fn switching_tracks_flushes_the_outgoing_position() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(2), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    f.engine.handle(0).set_status(|s| s.position_secs = 33.0);
    f.session.play_next().await.unwrap();

    // Old handle torn down, position persisted before the new load
    assert!(f.engine.handle(0).commands().contains(&Command::Unload));
    let record = f.tracks.find_by_url(&track_url(0)).await.unwrap().unwrap();
    assert_eq!(record.playback_position, 33.0);

    assert_eq!(f.engine.load_count(), 2);
}

#[tokio::test]
async fn volume_is_validated_and_forwarded() {
    let f = fixture(Some(true)).await;

    f.session.play_queue(queue_items(1), 0).await.unwrap();
    assert!(wait_for_state(&f.session, PlayerState::Playing, Duration::from_secs(2)).await);

    assert!(matches!(
        f.session.set_volume(1.5).await,
        Err(PlaybackError::InvalidVolume(_))
    ));

    f.session.set_volume(0.4).await.unwrap();
    let commands = f.engine.handle(0).commands();
    assert!(commands
        .iter()
        .any(|c| matches!(c, Command::Volume(v) if (*v - 0.4).abs() < 1e-6)));
}
