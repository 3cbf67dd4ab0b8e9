use std::sync::Arc;

use crate::adapters::{EngineConfig, HttpDurationSource};
use crate::app::{resolve_interactor::ResolveInteractor, simulate_interactor::SimulateInteractor};
use crate::engine::duration::DurationResolver;
use crate::error::ReelTrimResult;
use crate::ports::DurationSource;

pub trait AppContainer: Send + Sync {
    fn config(&self) -> &EngineConfig;
    fn resolve_interactor(&self) -> Arc<ResolveInteractor>;
    fn simulate_interactor(&self) -> Arc<SimulateInteractor>;
}

pub struct DefaultAppContainer {
    config: EngineConfig,
    resolve_interactor: Arc<ResolveInteractor>,
    simulate_interactor: Arc<SimulateInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: EngineConfig) -> ReelTrimResult<Self> {
        let resolve_interactor = Arc::new(ResolveInteractor::new(Self::http_resolver(&config)?));
        let simulate_interactor = Arc::new(SimulateInteractor::new(config.clone()));

        Ok(Self {
            config,
            resolve_interactor,
            simulate_interactor,
        })
    }

    /// Resolver over the configured HTTP sources, in config order
    pub fn http_resolver(config: &EngineConfig) -> ReelTrimResult<DurationResolver> {
        let sources = HttpDurationSource::from_configs(&config.resolver)?
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn DurationSource>)
            .collect();
        Ok(DurationResolver::new(sources, config.resolver_settings()))
    }
}

impl AppContainer for DefaultAppContainer {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve_interactor(&self) -> Arc<ResolveInteractor> {
        Arc::clone(&self.resolve_interactor)
    }

    fn simulate_interactor(&self) -> Arc<SimulateInteractor> {
        Arc::clone(&self.simulate_interactor)
    }
}
