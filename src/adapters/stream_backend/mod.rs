// Managed-stream backend adapter - opaque asset id driven through a player handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::engine::duration::is_valid_duration;
use crate::engine::events::{ListenerRegistry, PlaybackEvent, PlaybackListener, Subscription};
use crate::ports::{BackendKind, MediaBackend, PlayerRuntime, StreamEvent, StreamPlayer};

/// Commands issued before the player reported ready
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Pending {
    seek: Option<f64>,
    play: bool,
}

struct StreamInner<P> {
    player: P,
    pending: Pending,
}

/// Managed-stream player behind the MediaBackend port.
///
/// `play` and `seek` issued before the player is ready are queued and
/// replayed, seek first, when the `Ready` event is pumped.
pub struct ManagedStreamBackend<P: StreamPlayer> {
    inner: Mutex<StreamInner<P>>,
    asset_id: String,
    listeners: ListenerRegistry,
    released: AtomicBool,
}

impl<P: StreamPlayer> ManagedStreamBackend<P> {
    pub fn open(mut player: P, asset_id: &str) -> Result<Self, DomainError> {
        player.load(asset_id).map_err(|e| {
            DomainError::AssetUnresolvable(format!("cannot load managed asset {}: {}", asset_id, e))
        })?;
        info!(asset = asset_id, "managed stream backend opened");

        Ok(Self {
            inner: Mutex::new(StreamInner {
                player,
                pending: Pending::default(),
            }),
            asset_id: asset_id.to_string(),
            listeners: ListenerRegistry::new(),
            released: AtomicBool::new(false),
        })
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    fn inner(&self) -> MutexGuard<'_, StreamInner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl<P: StreamPlayer + 'static> MediaBackend for ManagedStreamBackend<P> {
    fn kind(&self) -> BackendKind {
        BackendKind::ManagedStream
    }

    fn play(&self) {
        if self.is_released() {
            return;
        }
        let mut inner = self.inner();
        if inner.player.is_ready() {
            inner.player.play();
        } else {
            debug!(asset = %self.asset_id, "queueing play until ready");
            inner.pending.play = true;
        }
    }

    fn pause(&self) {
        if self.is_released() {
            return;
        }
        let mut inner = self.inner();
        if inner.player.is_ready() {
            inner.player.pause();
        } else {
            inner.pending.play = false;
        }
    }

    fn seek(&self, t: f64) {
        if self.is_released() || !t.is_finite() {
            return;
        }
        let t = t.max(0.0);
        let mut inner = self.inner();
        if inner.player.is_ready() {
            inner.player.seek_to(t);
        } else {
            inner.pending.seek = Some(t);
        }
    }

    fn current_time(&self) -> f64 {
        let inner = self.inner();
        if !inner.player.is_ready() {
            return inner.pending.seek.unwrap_or(0.0);
        }
        inner
            .player
            .position()
            .filter(|t| t.is_finite())
            .map(|t| t.max(0.0))
            .unwrap_or(0.0)
    }

    /// Known only once the player is ready and its runtime reports a duration
    fn duration_hint(&self) -> Option<f64> {
        let inner = self.inner();
        if !inner.player.is_ready() {
            return None;
        }
        inner.player.runtime_duration().filter(|d| is_valid_duration(*d))
    }

    fn subscribe(&self, listener: Arc<dyn PlaybackListener>) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn pump(&self) {
        if self.is_released() {
            return;
        }
        let translated: Vec<PlaybackEvent> = {
            let mut inner = self.inner();
            let events = inner.player.take_events();
            let mut out = Vec::with_capacity(events.len());
            for event in events {
                match event {
                    StreamEvent::Ready => {
                        let pending = std::mem::take(&mut inner.pending);
                        if let Some(t) = pending.seek {
                            inner.player.seek_to(t);
                        }
                        if pending.play {
                            inner.player.play();
                        }
                        let hint = inner.player.runtime_duration().filter(|d| is_valid_duration(*d));
                        out.push(PlaybackEvent::LoadedMetadata(hint));
                    }
                    StreamEvent::Progress { position } if position.is_finite() => {
                        out.push(PlaybackEvent::TimeUpdate(position.max(0.0)));
                    }
                    StreamEvent::Progress { .. } => {}
                    StreamEvent::Playing => out.push(PlaybackEvent::Play),
                    StreamEvent::Paused => out.push(PlaybackEvent::Pause),
                }
            }
            out
        };

        for event in translated {
            self.listeners.emit(event);
        }
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut inner = self.inner();
            inner.pending = Pending::default();
            inner.player.destroy();
        }
        self.listeners.clear();
        debug!(asset = %self.asset_id, "managed stream backend released");
    }
}

impl<P: StreamPlayer + 'static> PlayerRuntime for ManagedStreamBackend<P> {
    fn runtime_duration(&self) -> Option<f64> {
        if self.is_released() {
            return None;
        }
        self.inner().player.runtime_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::SimulatedStreamPlayer;

    #[derive(Default)]
    struct Log {
        events: Mutex<Vec<PlaybackEvent>>,
    }

    impl PlaybackListener for Log {
        fn on_time_update(&self, t: f64) {
            self.events.lock().unwrap().push(PlaybackEvent::TimeUpdate(t));
        }
        fn on_play(&self) {
            self.events.lock().unwrap().push(PlaybackEvent::Play);
        }
        fn on_pause(&self) {
            self.events.lock().unwrap().push(PlaybackEvent::Pause);
        }
        fn on_loaded_metadata(&self, hint: Option<f64>) {
            self.events.lock().unwrap().push(PlaybackEvent::LoadedMetadata(hint));
        }
    }

    #[test]
    fn test_commands_before_ready_are_replayed() {
        let player = SimulatedStreamPlayer::new(60.0).ready_after(1.0);
        let clock = player.clone();
        let backend = ManagedStreamBackend::open(player, "opaque-id").unwrap();
        let log = Arc::new(Log::default());
        let _sub = backend.subscribe(log.clone());

        backend.seek(12.0);
        backend.play();
        assert_eq!(backend.current_time(), 12.0);
        assert_eq!(backend.duration_hint(), None);
        assert!(!clock.is_playing());

        clock.advance(1.0);
        backend.pump();

        assert!(clock.is_playing());
        assert_eq!(clock.position(), 12.0);
        assert_eq!(backend.duration_hint(), Some(60.0));
        assert_eq!(
            log.events.lock().unwrap().first(),
            Some(&PlaybackEvent::LoadedMetadata(Some(60.0)))
        );
    }

    #[test]
    fn test_progress_normalized_to_time_update() {
        let player = SimulatedStreamPlayer::new(60.0);
        let clock = player.clone();
        let backend = ManagedStreamBackend::open(player, "opaque-id").unwrap();
        let log = Arc::new(Log::default());
        let _sub = backend.subscribe(log.clone());
        backend.pump();
        log.events.lock().unwrap().clear();

        backend.play();
        clock.advance(0.5);
        backend.pump();

        assert_eq!(
            *log.events.lock().unwrap(),
            vec![PlaybackEvent::Play, PlaybackEvent::TimeUpdate(0.5)]
        );
    }

    #[test]
    fn test_runtime_duration_and_release() {
        let player = SimulatedStreamPlayer::new(75.0).duration_after(2.0);
        let clock = player.clone();
        let backend = ManagedStreamBackend::open(player, "opaque-id").unwrap();

        assert_eq!(backend.runtime_duration(), None);
        clock.advance(2.0);
        assert_eq!(backend.runtime_duration(), Some(75.0));

        backend.release();
        assert!(clock.is_destroyed());
        assert_eq!(backend.runtime_duration(), None);
    }

    #[test]
    fn test_load_failure_is_asset_unresolvable() {
        let result = ManagedStreamBackend::open(SimulatedStreamPlayer::unloadable(), "missing");
        assert!(matches!(result, Err(DomainError::AssetUnresolvable(_))));
    }
}
