// In-memory collaborators - trim store, asset loader, notifier and listener

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{Asset, SavedTrim};
use crate::ports::{AssetLoader, DurationSource, Notice, Notifier, SessionListener, TrimStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A persisted trim with its write time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTrim {
    pub start: f64,
    pub end: f64,
    pub saved_at: DateTime<Utc>,
}

/// Trim store kept in process memory, with injectable write failures
#[derive(Debug, Default)]
pub struct MemoryTrimStore {
    trims: Mutex<HashMap<String, StoredTrim>>,
    failures_remaining: Mutex<u32>,
}

impl MemoryTrimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a saved trim for `asset_id`
    pub fn with_trim(asset_id: &str, start: f64, end: f64) -> Self {
        let store = Self::new();
        lock(&store.trims).insert(
            asset_id.to_string(),
            StoredTrim {
                start,
                end,
                saved_at: Utc::now(),
            },
        );
        store
    }

    /// Make the next `count` writes fail
    pub fn fail_next_writes(&self, count: u32) {
        *lock(&self.failures_remaining) = count;
    }

    pub fn stored(&self, asset_id: &str) -> Option<StoredTrim> {
        lock(&self.trims).get(asset_id).cloned()
    }
}

#[async_trait]
impl TrimStore for MemoryTrimStore {
    async fn persist_trim(&self, asset_id: &str, start: f64, end: f64) -> Result<(), DomainError> {
        {
            let mut failures = lock(&self.failures_remaining);
            if *failures > 0 {
                *failures -= 1;
                warn!(asset = asset_id, "trim store rejected write");
                return Err(DomainError::CommitFailure("storage unavailable".to_string()));
            }
        }

        lock(&self.trims).insert(
            asset_id.to_string(),
            StoredTrim {
                start,
                end,
                saved_at: Utc::now(),
            },
        );
        debug!(asset = asset_id, start, end, "trim persisted");
        Ok(())
    }

    async fn get_saved_trim(&self, asset_id: &str) -> Result<Option<SavedTrim>, DomainError> {
        Ok(lock(&self.trims).get(asset_id).map(|t| SavedTrim {
            start: t.start,
            end: t.end,
        }))
    }
}

/// Asset loader over a fixed id-to-asset table
#[derive(Debug, Default)]
pub struct StaticAssetLoader {
    assets: HashMap<String, Asset>,
}

impl StaticAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset_id: &str, asset: Asset) -> Self {
        self.assets.insert(asset_id.to_string(), asset);
        self
    }
}

#[async_trait]
impl AssetLoader for StaticAssetLoader {
    async fn load_asset(&self, asset_id: &str) -> Result<Asset, DomainError> {
        self.assets
            .get(asset_id)
            .cloned()
            .ok_or_else(|| DomainError::AssetUnresolvable(format!("unknown asset: {}", asset_id)))
    }
}

/// Notifier that keeps every notice, optionally passing each one on
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    forward: Option<Arc<dyn Notifier>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record notices and hand each one to `inner` as well
    pub fn forwarding_to(inner: Arc<dyn Notifier>) -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            forward: Some(inner),
        }
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }
}

impl std::fmt::Debug for RecordingNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingNotifier")
            .field("notices", &lock(&self.notices).len())
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Some(inner) = &self.forward {
            inner.notify(notice.clone());
        }
        lock(&self.notices).push(notice);
    }
}

/// Callback fired by a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionOutcome {
    Committed { start: f64, end: f64 },
    Cancelled,
}

/// Session listener that keeps every callback
#[derive(Debug, Default)]
pub struct RecordingSessionListener {
    outcomes: Mutex<Vec<SessionOutcome>>,
}

impl RecordingSessionListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<SessionOutcome> {
        lock(&self.outcomes).clone()
    }
}

impl SessionListener for RecordingSessionListener {
    fn on_commit(&self, start: f64, end: f64) {
        lock(&self.outcomes).push(SessionOutcome::Committed { start, end });
    }

    fn on_cancel(&self) {
        lock(&self.outcomes).push(SessionOutcome::Cancelled);
    }
}

/// Cascade step with a fixed answer
#[derive(Debug, Clone)]
pub struct StaticDurationSource {
    name: String,
    answer: Option<f64>,
}

impl StaticDurationSource {
    pub fn new(name: &str, answer: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            answer,
        }
    }
}

#[async_trait]
impl DurationSource for StaticDurationSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _asset_id: &str) -> Result<Option<f64>, DomainError> {
        Ok(self.answer)
    }
}
