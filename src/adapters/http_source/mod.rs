// HTTP duration source - one cascade step backed by a JSON metadata endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::adapters::toml_config::{ResolverConfig, SourceConfig};
use crate::domain::errors::DomainError;
use crate::engine::duration::is_valid_duration;
use crate::error::ReelTrimResult;
use crate::ports::DurationSource;

/// Queries `url_template` with the asset id substituted and reads the
/// duration at `duration_pointer`.
///
/// The field may be a number or a numeric string. A missing or non-positive
/// field is an answer without a duration; transport and status errors fail
/// the step.
pub struct HttpDurationSource {
    client: reqwest::Client,
    config: SourceConfig,
    timeout: Duration,
}

impl HttpDurationSource {
    /// `default_timeout` applies when the entry sets no `timeout_ms`
    pub fn new(config: SourceConfig, default_timeout: Duration) -> ReelTrimResult<Self> {
        let timeout = config.timeout_ms.map_or(default_timeout, Duration::from_millis);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    /// Build one source per configured entry
    pub fn from_configs(resolver: &ResolverConfig) -> ReelTrimResult<Vec<Self>> {
        let default_timeout = Duration::from_millis(resolver.source_timeout_ms);
        resolver
            .sources
            .iter()
            .cloned()
            .map(|config| Self::new(config, default_timeout))
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, asset_id: &str) -> String {
        self.config.url_template.replace("{asset_id}", asset_id)
    }
}

/// Duration at `pointer` in `body`; an empty pointer reads the root
pub fn extract_duration(body: &Value, pointer: &str) -> Option<f64> {
    let seconds = match body.pointer(pointer)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    is_valid_duration(seconds).then_some(seconds)
}

#[async_trait]
impl DurationSource for HttpDurationSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn query(&self, asset_id: &str) -> Result<Option<f64>, DomainError> {
        let url = self.url(asset_id);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let fail = |e: reqwest::Error| {
            DomainError::SourceFailed(format!("{}: {}", self.config.name, e))
        };
        let response = request.send().await.map_err(fail)?;
        let response = response.error_for_status().map_err(fail)?;
        let body: Value = response.json().await.map_err(fail)?;

        let duration = extract_duration(&body, &self.config.duration_pointer);
        debug!(
            source = %self.config.name,
            asset = asset_id,
            ?duration,
            "duration source answered"
        );
        Ok(duration)
    }
}
