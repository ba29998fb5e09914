use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use super::{EntityId, RelatedEntity, RelationSource};
use crate::config::Config;
use crate::error::{DigfyError, Result};

/// Page of artists as returned by both the search and related endpoints
#[derive(Deserialize)]
struct ArtistPage {
    #[serde(default)]
    data: Vec<ArtistRecord>,
    /// Deezer reports some failures in-band with a 200 status
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ArtistRecord {
    id: u64,
    name: String,
    #[serde(default)]
    nb_fan: Option<u64>,
}

/// Deezer relation API client
///
/// Every request carries the configured timeout. Failures of any kind are
/// logged and surface as `None` / an empty list; no call is retried.
pub struct DeezerClient {
    client: Client,
    base_url: String,
}

impl DeezerClient {
    /// Create a client for `base_url` (e.g. `https://api.deezer.com`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DigfyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Create a client from the [relations] config section
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.relations.base_url.clone(), config.request_timeout())
    }

    /// Send a request and decode an artist page. All failure modes become
    /// `UpstreamUnavailable`.
    async fn fetch_page(&self, request: RequestBuilder) -> Result<ArtistPage> {
        let response = request
            .send()
            .await
            .map_err(|e| DigfyError::UpstreamUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigfyError::UpstreamUnavailable(format!(
                "Relation API returned {}",
                status
            )));
        }

        let page: ArtistPage = response
            .json()
            .await
            .map_err(|e| DigfyError::UpstreamUnavailable(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = &page.error {
            return Err(DigfyError::UpstreamUnavailable(format!(
                "Relation API error: {}",
                error
            )));
        }

        Ok(page)
    }
}

#[async_trait]
impl RelationSource for DeezerClient {
    async fn resolve(&self, name: &str) -> Option<EntityId> {
        let request = self
            .client
            .get(format!("{}/search/artist", self.base_url))
            .query(&[("q", name)]);

        match self.fetch_page(request).await {
            Ok(page) => {
                let id = page.data.first().map(|artist| EntityId(artist.id));
                if id.is_none() {
                    log::debug!("No search results for '{}'", name);
                }
                id
            }
            Err(e) => {
                log::warn!("Resolve '{}' failed: {}", name, e);
                None
            }
        }
    }

    async fn related(&self, id: EntityId) -> Vec<RelatedEntity> {
        let request = self
            .client
            .get(format!("{}/artist/{}/related", self.base_url, id));

        let start = std::time::Instant::now();
        match self.fetch_page(request).await {
            Ok(page) => {
                log::debug!(
                    "Related lookup for {} returned {} entries in {:?}",
                    id,
                    page.data.len(),
                    start.elapsed()
                );
                page.data
                    .into_iter()
                    .map(|artist| RelatedEntity {
                        name: artist.name,
                        id: EntityId(artist.id),
                        popularity: artist.nb_fan,
                    })
                    .collect()
            }
            Err(e) => {
                log::warn!("Related lookup for {} failed: {}", id, e);
                Vec::new()
            }
        }
    }
}
