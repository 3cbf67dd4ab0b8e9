// Direct backend adapter - URL/blob media element behind the MediaBackend port

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::DirectLocator;
use crate::engine::duration::is_valid_duration;
use crate::engine::events::{ListenerRegistry, PlaybackEvent, PlaybackListener, Subscription};
use crate::ports::{BackendKind, ElementEvent, MediaBackend, MediaElement};

/// Media element addressed by URL or blob reference.
///
/// Element events carry no payload; the backend reads the element's state
/// when it translates them.
pub struct DirectBackend<E: MediaElement> {
    element: Mutex<E>,
    locator: DirectLocator,
    listeners: ListenerRegistry,
    released: AtomicBool,
}

impl<E: MediaElement> DirectBackend<E> {
    /// Point `element` at `locator`
    pub fn open(mut element: E, locator: DirectLocator) -> Result<Self, DomainError> {
        element.load(&locator).map_err(|e| {
            DomainError::AssetUnresolvable(format!("cannot load {}: {}", locator.as_str(), e))
        })?;
        info!(locator = locator.as_str(), blob = locator.is_blob(), "direct backend opened");

        Ok(Self {
            element: Mutex::new(element),
            locator,
            listeners: ListenerRegistry::new(),
            released: AtomicBool::new(false),
        })
    }

    pub fn locator(&self) -> &DirectLocator {
        &self.locator
    }

    fn element(&self) -> MutexGuard<'_, E> {
        self.element.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn read_time(element: &E) -> f64 {
        let t = element.current_time();
        if t.is_finite() {
            t.max(0.0)
        } else {
            0.0
        }
    }

    fn read_duration(element: &E) -> Option<f64> {
        let d = element.duration();
        is_valid_duration(d).then_some(d)
    }
}

impl<E: MediaElement + 'static> MediaBackend for DirectBackend<E> {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn play(&self) {
        if !self.is_released() {
            self.element().play();
        }
    }

    fn pause(&self) {
        if !self.is_released() {
            self.element().pause();
        }
    }

    fn seek(&self, t: f64) {
        if self.is_released() || !t.is_finite() {
            return;
        }
        self.element().set_current_time(t.max(0.0));
    }

    fn current_time(&self) -> f64 {
        Self::read_time(&self.element())
    }

    fn duration_hint(&self) -> Option<f64> {
        Self::read_duration(&self.element())
    }

    fn subscribe(&self, listener: Arc<dyn PlaybackListener>) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn pump(&self) {
        if self.is_released() {
            return;
        }
        // Translate under the lock, emit after releasing it
        let translated: Vec<PlaybackEvent> = {
            let mut element = self.element();
            let events = element.take_events();
            let now = Self::read_time(&element);
            let duration = Self::read_duration(&element);
            events
                .into_iter()
                .map(|event| match event {
                    ElementEvent::TimeUpdate => PlaybackEvent::TimeUpdate(now),
                    ElementEvent::Play => PlaybackEvent::Play,
                    ElementEvent::Pause => PlaybackEvent::Pause,
                    ElementEvent::LoadedMetadata => PlaybackEvent::LoadedMetadata(duration),
                })
                .collect()
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
            let mut element = self.element();
            element.pause();
            element.revoke();
        }
        self.listeners.clear();
        debug!(locator = self.locator.as_str(), "direct backend released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::SimulatedElement;

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
    fn test_metadata_is_normalized_with_duration() {
        let element = SimulatedElement::new(42.0);
        let backend = DirectBackend::open(element, DirectLocator::Url("https://x/v.mp4".into())).unwrap();
        let log = Arc::new(Log::default());
        let _sub = backend.subscribe(log.clone());

        backend.pump();

        assert_eq!(backend.duration_hint(), Some(42.0));
        assert_eq!(
            *log.events.lock().unwrap(),
            vec![PlaybackEvent::LoadedMetadata(Some(42.0))]
        );
    }

    #[test]
    fn test_time_updates_carry_element_time() {
        let element = SimulatedElement::new(10.0);
        let clock = element.clone();
        let backend = DirectBackend::open(element, DirectLocator::Blob("blob:1".into())).unwrap();
        let log = Arc::new(Log::default());
        let _sub = backend.subscribe(log.clone());
        backend.pump();
        log.events.lock().unwrap().clear();

        backend.play();
        clock.advance(0.25);
        backend.pump();

        assert_eq!(
            *log.events.lock().unwrap(),
            vec![PlaybackEvent::Play, PlaybackEvent::TimeUpdate(0.25)]
        );
        assert_eq!(backend.current_time(), 0.25);
    }

    #[test]
    fn test_load_failure_is_asset_unresolvable() {
        let result = DirectBackend::open(SimulatedElement::unloadable(), DirectLocator::Url("bad".into()));
        assert!(matches!(result, Err(DomainError::AssetUnresolvable(_))));
    }

    #[test]
    fn test_release_revokes_and_silences() {
        let element = SimulatedElement::new(10.0);
        let observer = element.clone();
        let backend = DirectBackend::open(element, DirectLocator::Blob("blob:2".into())).unwrap();
        let log = Arc::new(Log::default());
        let _sub = backend.subscribe(log.clone());

        backend.release();
        backend.release();
        backend.play();
        backend.pump();

        assert!(observer.is_revoked());
        assert!(!observer.is_playing());
        assert!(log.events.lock().unwrap().is_empty());
    }
}
