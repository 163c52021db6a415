//! HTTP client for the feature Detail API.
//!
//! `GET {base}/api/features/{id}` answers `{ "properties": { ... } }`. Any
//! non-success status is a failure; nothing is retried here.

use std::future::Future;
use std::time::Duration;

use fruitfall_core::{AppConfig, FeatureId, Properties};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::DetailError;

const DEFAULT_USER_AGENT: &str = "fruitfall/0.1 (map-client)";

/// Detail payload for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDetail {
    #[serde(default)]
    pub properties: Properties,
}

/// Anything that can resolve a feature id into its detail payload.
///
/// Implemented by [`DetailClient`] for the real API and by in-memory fakes
/// in tests.
pub trait DetailSource: Send + Sync + 'static {
    fn fetch_detail(
        &self,
        feature_id: FeatureId,
    ) -> impl Future<Output = Result<FeatureDetail, DetailError>> + Send;
}

/// Client for the Detail API.
///
/// Only a connect timeout is applied: a request that stalls after connecting
/// is left to complete, or not, on its own.
#[derive(Debug, Clone)]
pub struct DetailClient {
    client: Client,
    base_url: Url,
}

impl DetailClient {
    /// Creates a client from the loaded application config.
    ///
    /// # Errors
    ///
    /// Returns [`DetailError::Http`] if the `reqwest::Client` cannot be built
    /// or [`DetailError::InvalidBaseUrl`] if the base URL does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, DetailError> {
        Self::build(
            &config.api_base_url,
            &config.user_agent,
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    /// Creates a client pointed at `base_url` with default settings (for
    /// testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`DetailClient::from_config`].
    pub fn with_base_url(base_url: &str) -> Result<Self, DetailError> {
        Self::build(base_url, DEFAULT_USER_AGENT, Duration::from_secs(10))
    }

    fn build(
        base_url: &str,
        user_agent: &str,
        connect_timeout: Duration,
    ) -> Result<Self, DetailError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| DetailError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DetailError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        Ok(Self { client, base_url })
    }

    fn detail_url(&self, feature_id: FeatureId) -> Result<Url, DetailError> {
        self.base_url
            .join(&format!("api/features/{feature_id}"))
            .map_err(|e| DetailError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Fetches the detail payload for one feature.
    ///
    /// # Errors
    ///
    /// - [`DetailError::Http`] on network failure.
    /// - [`DetailError::UnexpectedStatus`] on any non-2xx status, 404 included.
    /// - [`DetailError::Deserialize`] if the body is not `{ "properties": {..} }`.
    pub async fn get_feature_detail(
        &self,
        feature_id: FeatureId,
    ) -> Result<FeatureDetail, DetailError> {
        let url = self.detail_url(feature_id)?;
        tracing::debug!(%feature_id, %url, "fetching feature detail");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DetailError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| DetailError::Deserialize {
            context: format!("feature detail (id={feature_id})"),
            source,
        })
    }
}

impl DetailSource for DetailClient {
    fn fetch_detail(
        &self,
        feature_id: FeatureId,
    ) -> impl Future<Output = Result<FeatureDetail, DetailError>> + Send {
        self.get_feature_detail(feature_id)
    }
}
