//! Duration discovery for managed-stream assets
//!
//! [`DurationCell`] holds the single authoritative duration of a session.
//! [`DurationResolver`] runs the source cascade and the runtime poll
//! concurrently; both funnel into [`DurationCell::commit`], which keeps the
//! first valid value and discards every later one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::ports::{DurationSource, PlayerRuntime};

/// A finite, strictly positive number of seconds
pub fn is_valid_duration(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

/// First-writer-wins duration slot shared by every component of a session
#[derive(Clone)]
pub struct DurationCell {
    tx: Arc<watch::Sender<Option<f64>>>,
}

impl Default for DurationCell {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Option<f64> {
        *self.tx.borrow()
    }

    /// Committed duration, or `0.0` while unknown
    pub fn seconds(&self) -> f64 {
        self.get().unwrap_or(0.0)
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }

    /// Store `seconds` unless a duration was already committed.
    ///
    /// Returns `true` only for the call that set the value.
    pub fn commit(&self, seconds: f64, origin: &str) -> bool {
        if !is_valid_duration(seconds) {
            debug!(origin, seconds, "ignoring invalid duration");
            return false;
        }

        let committed = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(seconds);
                true
            } else {
                false
            }
        });

        if committed {
            info!(origin, duration = seconds, "duration committed");
        } else {
            debug!(
                origin,
                discarded = seconds,
                kept = self.seconds(),
                "duration already committed"
            );
        }
        committed
    }
}

/// Timing knobs for the resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    pub poll_interval: Duration,
    /// Upper bound on the runtime poll
    pub max_poll: Duration,
    /// Upper bound on a single cascade query
    pub source_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            max_poll: Duration::from_secs(30),
            source_timeout: Duration::from_secs(10),
        }
    }
}

/// Cascading duration lookup with a concurrent runtime poll
pub struct DurationResolver {
    sources: Vec<Arc<dyn DurationSource>>,
    settings: ResolverSettings,
}

impl DurationResolver {
    pub fn new(sources: Vec<Arc<dyn DurationSource>>, settings: ResolverSettings) -> Self {
        Self { sources, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Resolve the duration of a managed asset into `cell`.
    ///
    /// Returns the committed value, which may come from an earlier call or
    /// another writer. Fails only when every source and the poll gave up.
    pub async fn resolve(
        &self,
        asset_id: &str,
        runtime: Option<Arc<dyn PlayerRuntime>>,
        cell: &DurationCell,
    ) -> Result<f64, DomainError> {
        if let Some(existing) = cell.get() {
            return Ok(existing);
        }

        info!(
            asset = asset_id,
            sources = self.sources.len(),
            poll = runtime.is_some(),
            "resolving duration"
        );

        let cascade = self.run_cascade(asset_id, cell);
        let poll = self.run_poll(runtime.as_deref(), cell);
        tokio::pin!(cascade);
        tokio::pin!(poll);

        let mut cascade_done = false;
        let mut poll_done = false;
        while !(cascade_done && poll_done) {
            tokio::select! {
                found = &mut cascade, if !cascade_done => {
                    cascade_done = true;
                    if found {
                        break;
                    }
                }
                found = &mut poll, if !poll_done => {
                    poll_done = true;
                    if found {
                        break;
                    }
                }
            }
        }

        cell.get().ok_or_else(|| {
            warn!(asset = asset_id, "all duration sources exhausted");
            DomainError::DurationUnresolvable(format!(
                "no duration for asset {} after {} source(s) and {:?} of polling",
                asset_id,
                self.sources.len(),
                self.settings.max_poll
            ))
        })
    }

    /// Query each source in order until one yields a valid duration
    async fn run_cascade(&self, asset_id: &str, cell: &DurationCell) -> bool {
        for source in &self.sources {
            if cell.is_resolved() {
                return true;
            }

            let name = source.name();
            match timeout(self.settings.source_timeout, source.query(asset_id)).await {
                Ok(Ok(Some(seconds))) if is_valid_duration(seconds) => {
                    cell.commit(seconds, name);
                    return true;
                }
                Ok(Ok(Some(seconds))) => {
                    warn!(source = name, seconds, "source returned an invalid duration");
                }
                Ok(Ok(None)) => {
                    debug!(source = name, "source has no duration yet");
                }
                Ok(Err(e)) => {
                    warn!(source = name, error = %e, "duration source failed");
                }
                Err(_) => {
                    warn!(source = name, timeout = ?self.settings.source_timeout, "duration source timed out");
                }
            }
        }
        cell.is_resolved()
    }

    /// Poll the player runtime until it reports a duration or `max_poll` elapses
    async fn run_poll(&self, runtime: Option<&dyn PlayerRuntime>, cell: &DurationCell) -> bool {
        let Some(runtime) = runtime else {
            return false;
        };

        let deadline = Instant::now() + self.settings.max_poll;
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if cell.is_resolved() {
                return true;
            }
            if let Some(seconds) = runtime.runtime_duration() {
                if cell.commit(seconds, "player-runtime") {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                warn!(max_poll = ?self.settings.max_poll, "duration poll gave up");
                return cell.is_resolved();
            }
        }
    }
}
