// Resolve interactor - Runs the configured duration cascade for one managed asset

use serde::Serialize;
use tracing::info;

use crate::domain::errors::DomainError;
use crate::engine::duration::{DurationCell, DurationResolver};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveResponse {
    pub asset_id: String,
    pub duration: f64,
    pub sources: Vec<String>,
}

/// Duration lookup without a live player, so only the cascade runs
pub struct ResolveInteractor {
    resolver: DurationResolver,
}

impl ResolveInteractor {
    pub fn new(resolver: DurationResolver) -> Self {
        Self { resolver }
    }

    pub async fn execute(&self, asset_id: &str) -> Result<ResolveResponse, DomainError> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty() {
            return Err(DomainError::BadArgs("asset id must not be empty".to_string()));
        }
        let sources = self.resolver.source_names();
        if sources.is_empty() {
            return Err(DomainError::BadArgs(
                "no duration sources configured; add [[resolver.sources]] to the config".to_string(),
            ));
        }

        let cell = DurationCell::new();
        let duration = self.resolver.resolve(asset_id, None, &cell).await?;
        info!(asset = asset_id, duration, "duration resolved");

        Ok(ResolveResponse {
            asset_id: asset_id.to_string(),
            duration,
            sources,
        })
    }
}
