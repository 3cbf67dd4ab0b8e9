//! Normalized playback events and listener subscriptions
//!
//! Both backends translate their native event shapes into [`PlaybackEvent`]
//! and fan them out through a [`ListenerRegistry`]. Listeners are invoked with
//! no registry lock held, so a handler may call back into the backend or drop
//! its own subscription.

use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Uniform event shape emitted by every media backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    TimeUpdate(f64),
    Play,
    Pause,
    /// Metadata became available; carries the backend's duration hint
    LoadedMetadata(Option<f64>),
}

impl PlaybackEvent {
    fn dispatch(&self, listener: &dyn PlaybackListener) {
        match *self {
            PlaybackEvent::TimeUpdate(t) => listener.on_time_update(t),
            PlaybackEvent::Play => listener.on_play(),
            PlaybackEvent::Pause => listener.on_pause(),
            PlaybackEvent::LoadedMetadata(hint) => listener.on_loaded_metadata(hint),
        }
    }
}

/// Receiver of normalized playback events. Every method defaults to a no-op.
pub trait PlaybackListener: Send + Sync {
    fn on_time_update(&self, _t: f64) {}

    fn on_play(&self) {}

    fn on_pause(&self) {}

    fn on_loaded_metadata(&self, _duration_hint: Option<f64>) {}
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: Vec<(u64, Arc<dyn PlaybackListener>)>,
}

/// Set of listeners attached to one backend
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener; it stays attached until the returned handle is dropped
    pub fn subscribe(&self, listener: Arc<dyn PlaybackListener>) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every listener attached at the time of the call
    pub fn emit(&self, event: PlaybackEvent) {
        let snapshot: Vec<Arc<dyn PlaybackListener>> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            event.dispatch(listener.as_ref());
        }
    }

    /// Detach every listener
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.clear();
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by `subscribe`; dropping it unsubscribes
#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    /// Explicitly detach the listener
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = registry.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
