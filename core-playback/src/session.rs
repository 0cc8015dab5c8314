//! Playback session state machine
//!
//! One session per app lifetime. The session owns the single active engine
//! handle and its status subscription, the play queue, and the transition
//! protocol between them.
//!
//! ## Transition protocol
//!
//! All loads and unloads run under one transition lock. Loading a new track
//! always awaits the previous track's unload (including its final position
//! flush) before the new engine handle is created, so two handles never
//! coexist and a transition never loses the outgoing position. The
//! asynchronous paths that outlive a load (status watcher, autoplay advance)
//! carry the load's token and check it before touching shared state, so a
//! superseded load can never clobber a newer one.

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::position::spawn_position_saver;
use crate::queue::{PlayQueue, QueueItem};
use bridge_traits::engine::{AudioEngine, AudioSource, EngineHandle, EngineStatus};
use bridge_traits::settings::{SettingsStore, AUTOPLAY_KEY};
use core_library::models::{TrackPatch, TrackRecord};
use core_library::TrackRepository;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Observable state of the playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing loaded, queue empty.
    Idle,
    /// A track is loading or the engine is buffering.
    Loading,
    /// The engine is producing audio.
    Playing,
    /// Playback is suspended but resumable.
    Paused,
    /// The last load failed; another `play` call retries.
    Error(String),
}

/// The currently loaded track and the tasks attached to it.
struct ActiveTrack {
    token: Uuid,
    item: QueueItem,
    handle: Arc<dyn EngineHandle>,
    status_rx: watch::Receiver<EngineStatus>,
    watcher: JoinHandle<()>,
    saver: Option<JoinHandle<()>>,
}

struct SessionInner {
    queue: PlayQueue,
    active: Option<ActiveTrack>,
}

/// Playback session owning the engine handle and the queue.
pub struct PlaybackSession {
    engine: Arc<dyn AudioEngine>,
    tracks: Arc<dyn TrackRepository>,
    settings: Arc<dyn SettingsStore>,
    events: Arc<EventBus>,
    config: PlaybackConfig,
    inner: Mutex<SessionInner>,
    state_tx: watch::Sender<PlayerState>,
    /// Token of the load currently allowed to mutate session state.
    current_token: parking_lot::Mutex<Uuid>,
}

impl PlaybackSession {
    /// Create a new session. Constructed once and shared by reference.
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        tracks: Arc<dyn TrackRepository>,
        settings: Arc<dyn SettingsStore>,
        events: Arc<EventBus>,
        config: PlaybackConfig,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(PlayerState::Idle);
        Arc::new(Self {
            engine,
            tracks,
            settings,
            events,
            config,
            inner: Mutex::new(SessionInner {
                queue: PlayQueue::new(),
                active: None,
            }),
            state_tx,
            current_token: parking_lot::Mutex::new(Uuid::nil()),
        })
    }

    /// Subscribe to state changes.
    pub fn state(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> PlayerState {
        self.state_tx.borrow().clone()
    }

    /// Currently loaded queue item, if any.
    pub async fn current_item(&self) -> Option<QueueItem> {
        self.inner.lock().await.active.as_ref().map(|a| a.item.clone())
    }

    /// Snapshot of the queue contents and pointer.
    pub async fn queue_snapshot(&self) -> (Vec<QueueItem>, Option<usize>) {
        let inner = self.inner.lock().await;
        (inner.queue.items().to_vec(), inner.queue.position())
    }

    /// Replace the queue and start playback at `start_index`.
    ///
    /// Queues longer than the configured capacity are windowed around the
    /// start index rather than truncated from one end.
    pub async fn play_queue(
        self: &Arc<Self>,
        items: Vec<QueueItem>,
        start_index: usize,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.queue.set(items, start_index, self.config.queue_capacity);
        let Some(item) = inner.queue.current().cloned() else {
            return Err(PlaybackError::NoTrackLoaded);
        };
        self.load_and_play_locked(&mut inner, item).await
    }

    /// Play the queue item at `index`.
    pub async fn play_index(self: &Arc<Self>, index: usize) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Some(item) = inner.queue.item_at(index).cloned() else {
            return Err(PlaybackError::QueueIndexOutOfBounds(index));
        };
        inner.queue.set_current(index);
        self.load_and_play_locked(&mut inner, item).await
    }

    /// Pause playback.
    pub async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Some(active) = inner.active.as_mut() else {
            return Err(PlaybackError::NoTrackLoaded);
        };

        active.handle.pause().await?;
        if let Some(saver) = active.saver.take() {
            saver.abort();
        }

        let track_url = active.item.track_url.clone();
        self.set_state(PlayerState::Paused);
        self.emit(PlaybackEvent::Paused { track_url });
        Ok(())
    }

    /// Resume paused playback.
    pub async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Some(active) = inner.active.as_mut() else {
            return Err(PlaybackError::NoTrackLoaded);
        };

        active.handle.play().await?;
        if active.saver.is_none() {
            active.saver = Some(spawn_position_saver(
                Arc::clone(&self.tracks),
                active.handle.status(),
                active.item.track_url.clone(),
                self.config.position_save_interval,
                self.config.completion_threshold,
            ));
        }

        let track_url = active.item.track_url.clone();
        self.set_state(PlayerState::Playing);
        self.emit(PlaybackEvent::Resumed { track_url });
        Ok(())
    }

    /// Dispatch play or pause based on the current state. No-op while a
    /// track is loading.
    pub async fn toggle_play_pause(self: &Arc<Self>) -> Result<()> {
        match self.current_state() {
            PlayerState::Playing => self.pause().await,
            PlayerState::Paused => self.resume().await,
            PlayerState::Loading => Ok(()),
            PlayerState::Idle | PlayerState::Error(_) => {
                let index = { self.inner.lock().await.queue.position() };
                match index {
                    Some(index) => self.play_index(index).await,
                    None => Ok(()),
                }
            }
        }
    }

    /// Seek forward by the given amount, clamped into the track bounds.
    pub async fn skip_forward(&self, seconds: f64) -> Result<()> {
        self.seek_relative(seconds).await
    }

    /// Seek backward by the given amount, clamped into the track bounds.
    pub async fn skip_backward(&self, seconds: f64) -> Result<()> {
        self.seek_relative(-seconds).await
    }

    /// Seek forward by the configured default skip amount.
    pub async fn skip_forward_default(&self) -> Result<()> {
        self.seek_relative(self.config.skip_forward_secs).await
    }

    /// Seek backward by the configured default skip amount.
    pub async fn skip_backward_default(&self) -> Result<()> {
        self.seek_relative(-self.config.skip_backward_secs).await
    }

    /// Seek to an absolute position, clamped into the track bounds.
    pub async fn seek_to(&self, position_secs: f64) -> Result<()> {
        let inner = self.inner.lock().await;
        let Some(active) = inner.active.as_ref() else {
            return Err(PlaybackError::NoTrackLoaded);
        };
        let status = *active.status_rx.borrow();
        active
            .handle
            .seek(clamp_position(position_secs, status.duration_secs))
            .await?;
        Ok(())
    }

    async fn seek_relative(&self, delta_secs: f64) -> Result<()> {
        let inner = self.inner.lock().await;
        let Some(active) = inner.active.as_ref() else {
            return Err(PlaybackError::NoTrackLoaded);
        };
        let status = *active.status_rx.borrow();
        let target = clamp_position(status.position_secs + delta_secs, status.duration_secs);
        active.handle.seek(target).await?;
        Ok(())
    }

    /// Advance to the next queue item. Past the end this is a no-op and the
    /// current track keeps playing.
    pub async fn play_next(self: &Arc<Self>) -> Result<()> {
        let next_index = {
            let inner = self.inner.lock().await;
            match inner.queue.position() {
                Some(index) if index + 1 < inner.queue.len() => Some(index + 1),
                _ => None,
            }
        };
        match next_index {
            Some(index) => self.play_index(index).await,
            None => Ok(()),
        }
    }

    /// Go back one queue item, unless more than a few seconds into the
    /// current track, in which case restart it instead (guards against
    /// accidental skip-back).
    pub async fn play_previous(self: &Arc<Self>) -> Result<()> {
        enum Move {
            Restart,
            PlayIndex(usize),
        }

        let decision = {
            let inner = self.inner.lock().await;
            let position = inner
                .active
                .as_ref()
                .map(|a| a.status_rx.borrow().position_secs)
                .unwrap_or(0.0);

            if position > self.config.previous_restart_window_secs {
                Move::Restart
            } else {
                match inner.queue.position() {
                    Some(index) if index > 0 => Move::PlayIndex(index - 1),
                    _ => Move::Restart,
                }
            }
        };

        match decision {
            Move::PlayIndex(index) => self.play_index(index).await,
            Move::Restart => match self.seek_to(0.0).await {
                Err(PlaybackError::NoTrackLoaded) => Ok(()),
                other => other,
            },
        }
    }

    /// Stop playback, flush the final position, clear the queue and return
    /// to idle.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.unload_locked(&mut inner).await;
        inner.queue.clear();
        self.set_state(PlayerState::Idle);
        self.emit(PlaybackEvent::Stopped);
        Ok(())
    }

    /// Adjust the engine volume.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        let inner = self.inner.lock().await;
        let Some(active) = inner.active.as_ref() else {
            return Err(PlaybackError::NoTrackLoaded);
        };
        active.handle.set_volume(volume).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Load protocol
    // ------------------------------------------------------------------

    async fn load_and_play_locked(
        self: &Arc<Self>,
        inner: &mut SessionInner,
        item: QueueItem,
    ) -> Result<()> {
        // Unload first, including the outgoing position flush. This await
        // is the guarantee that two engine handles never coexist.
        self.unload_locked(inner).await;

        info!(track = %item.track_url, "Loading track");
        self.set_state(PlayerState::Loading);
        self.emit(PlaybackEvent::Loading {
            track_url: item.track_url.clone(),
        });

        // The record decides the source (downloaded file wins) and the
        // resume point. A failed lookup falls back to streaming from zero.
        let record = match self.tracks.find_by_url(&item.track_url).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Track record lookup failed");
                None
            }
        };

        let source = select_source(&item, record.as_ref());
        debug!(remote = source.is_remote(), "Selected audio source");

        let handle = match self.engine.load(source).await {
            Ok(handle) => handle,
            Err(e) => {
                let message = format!("Failed to load track: {}", e);
                self.fail(&message);
                return Err(PlaybackError::LoadFailed(message));
            }
        };

        if let Err(e) = self.wait_for_ready(&handle).await {
            handle.unload().await.ok();
            return Err(e);
        }

        // Resume where the listener left off, unless the track is done.
        if let Some(record) = &record {
            if !record.is_completed && record.playback_position > 0.0 {
                if let Err(e) = handle.seek(record.playback_position).await {
                    warn!(error = %e, "Resume seek failed");
                }
            }
        }

        if let Err(e) = handle.play().await {
            handle.unload().await.ok();
            let message = format!("Engine refused to start: {}", e);
            self.fail(&message);
            return Err(PlaybackError::LoadFailed(message));
        }

        // Stamp the playback attempt; failing to do so only costs history.
        let stamp = TrackPatch::new(&item.track_url)
            .track_name(&item.track_name)
            .last_played_at(chrono::Utc::now().timestamp());
        if let Err(e) = self.tracks.upsert(stamp).await {
            warn!(error = %e, "Failed to stamp playback attempt");
        }

        let token = Uuid::new_v4();
        *self.current_token.lock() = token;

        let watcher = tokio::spawn(Self::watch_status(
            Arc::clone(self),
            handle.status(),
            token,
            item.clone(),
        ));
        let saver = spawn_position_saver(
            Arc::clone(&self.tracks),
            handle.status(),
            item.track_url.clone(),
            self.config.position_save_interval,
            self.config.completion_threshold,
        );

        inner.active = Some(ActiveTrack {
            token,
            item: item.clone(),
            status_rx: handle.status(),
            handle,
            watcher,
            saver: Some(saver),
        });

        self.set_state(PlayerState::Playing);
        self.emit(PlaybackEvent::Started {
            track_url: item.track_url,
        });
        Ok(())
    }

    /// Bounded wait for the engine to report ready.
    async fn wait_for_ready(&self, handle: &Arc<dyn EngineHandle>) -> Result<()> {
        let mut status_rx = handle.status();

        let outcome = tokio::time::timeout(self.config.ready_timeout, async {
            loop {
                if status_rx.borrow().ready {
                    break true;
                }
                if status_rx.changed().await.is_err() {
                    break false;
                }
            }
        })
        .await;

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => {
                let message = "Engine closed while loading".to_string();
                self.fail(&message);
                Err(PlaybackError::LoadFailed(message))
            }
            Err(_) => {
                let secs = self.config.ready_timeout.as_secs();
                self.fail(&format!("Engine not ready within {}s", secs));
                Err(PlaybackError::ReadyTimeout(secs))
            }
        }
    }

    /// Tear down the active track, flushing its position first.
    async fn unload_locked(&self, inner: &mut SessionInner) {
        let Some(active) = inner.active.take() else {
            return;
        };

        // Persist before tearing anything down. Losing the outgoing
        // position on transition is the one visible bug this ordering
        // prevents.
        let status = *active.status_rx.borrow();
        if status.position_secs > 0.0 {
            let completed = status.duration_secs > 0.0
                && status.position_secs / status.duration_secs >= self.config.completion_threshold;
            let position = if completed { 0.0 } else { status.position_secs };
            if let Err(e) = self
                .tracks
                .update_position(&active.item.track_url, position, completed)
                .await
            {
                warn!(error = %e, "Failed to flush final position");
            }
        }

        active.watcher.abort();
        if let Some(saver) = active.saver {
            saver.abort();
        }
        *self.current_token.lock() = Uuid::nil();

        if let Err(e) = active.handle.unload().await {
            warn!(error = %e, "Engine unload failed");
        }
    }

    // ------------------------------------------------------------------
    // Status watching & completion
    // ------------------------------------------------------------------

    async fn watch_status(
        session: Arc<Self>,
        mut status_rx: watch::Receiver<EngineStatus>,
        token: Uuid,
        item: QueueItem,
    ) {
        loop {
            if status_rx.changed().await.is_err() {
                break;
            }
            let status = *status_rx.borrow();

            if !session.is_current(token) {
                break;
            }

            if is_natural_completion(&status, session.config.completion_window_secs) {
                session.handle_completion(token, &item).await;
                break;
            }

            // The engine's flags are not guaranteed mutually exclusive;
            // derive one state deterministically: playing wins, then
            // buffering, then paused.
            let derived = if status.playing {
                PlayerState::Playing
            } else if status.buffering {
                PlayerState::Loading
            } else {
                PlayerState::Paused
            };
            session.set_state_if_current(token, derived);
        }
    }

    async fn handle_completion(self: &Arc<Self>, token: Uuid, item: &QueueItem) {
        info!(track = %item.track_url, "Track completed");

        // Natural completion resets the resume point.
        if let Err(e) = self.tracks.update_position(&item.track_url, 0.0, true).await {
            warn!(error = %e, "Failed to persist completion");
        }
        self.emit(PlaybackEvent::Completed {
            track_url: item.track_url.clone(),
        });

        let autoplay = match self.settings.get_bool(AUTOPLAY_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, "Failed to read autoplay setting");
                true
            }
        };

        if autoplay {
            let session = Arc::clone(self);
            tokio::spawn(async move {
                session.advance_after_completion(token).await;
            });
        } else {
            self.settle_paused_after_completion(token).await;
        }
    }

    // Returns a concrete boxed future (rather than `async fn`) so its type
    // is not opaque. This breaks the `Send` auto-trait inference cycle formed
    // by load -> spawn(watcher) -> completion -> spawn(advance) -> load, which
    // otherwise leaves every future in the cycle uncheckable. Behavior is
    // unchanged.
    fn advance_after_completion(
        self: Arc<Self>,
        token: Uuid,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;

            // Only the load that actually finished may advance; a newer load
            // owns the session now.
            if !self.is_current(token) {
                debug!("Stale completion advance discarded");
                return;
            }

            match inner.queue.advance() {
                Some(next) => {
                    if let Err(e) = self.load_and_play_locked(&mut inner, next).await {
                        warn!(error = %e, "Autoplay advance failed");
                    }
                }
                None => {
                    debug!("Queue exhausted, settling into paused");
                    self.abort_saver_locked(&mut inner, token);
                    self.set_state_if_current(token, PlayerState::Paused);
                }
            }
        })
    }

    async fn settle_paused_after_completion(self: &Arc<Self>, token: Uuid) {
        let mut inner = self.inner.lock().await;
        self.abort_saver_locked(&mut inner, token);
        self.set_state_if_current(token, PlayerState::Paused);
    }

    fn abort_saver_locked(&self, inner: &mut SessionInner, token: Uuid) {
        if let Some(active) = inner.active.as_mut() {
            if active.token == token {
                if let Some(saver) = active.saver.take() {
                    saver.abort();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn is_current(&self, token: Uuid) -> bool {
        *self.current_token.lock() == token
    }

    fn set_state(&self, state: PlayerState) {
        self.state_tx.send_replace(state);
    }

    fn set_state_if_current(&self, token: Uuid, state: PlayerState) {
        if self.is_current(token) {
            self.set_state(state);
        }
    }

    fn fail(&self, message: &str) {
        warn!(message, "Playback failed");
        self.set_state(PlayerState::Error(message.to_string()));
        self.emit(PlaybackEvent::Error {
            message: message.to_string(),
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.emit(CoreEvent::Playback(event));
    }
}

/// Pick the audio source for a queue item: a completed download wins over
/// the remote URL.
fn select_source(item: &QueueItem, record: Option<&TrackRecord>) -> AudioSource {
    if let Some(record) = record {
        if record.is_downloaded {
            if let Some(path) = &record.local_file_path {
                return AudioSource::LocalFile {
                    path: PathBuf::from(path),
                };
            }
        }
    }
    AudioSource::RemoteStream {
        url: item.track_url.clone(),
    }
}

/// Natural completion: position has reached the end (within the window) and
/// the engine stopped playing.
fn is_natural_completion(status: &EngineStatus, window_secs: f64) -> bool {
    status.duration_secs > 0.0
        && !status.playing
        && (status.duration_secs - status.position_secs).abs() <= window_secs
}

fn clamp_position(target_secs: f64, duration_secs: f64) -> f64 {
    let upper = if duration_secs > 0.0 {
        duration_secs
    } else {
        f64::INFINITY
    };
    target_secs.clamp(0.0, upper)
}
