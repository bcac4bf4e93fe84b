//! Yandex Disk public-share resolution.
//!
//! Public shares expose a metadata endpoint that exchanges the share's
//! public key (the normalized share URL) for a short-lived download href.
//! Unlike the Drive flow there is nothing to scrape: the redirect is
//! machine-readable JSON.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::error::ResolveError;
use crate::link::ServiceKind;

/// Production metadata endpoint for public resources.
const API_ENDPOINT: &str = "https://cloud-api.yandex.net/v1/disk/public/resources/download";

/// Download-href payload returned by the metadata endpoint.
#[derive(Debug, Deserialize)]
struct DownloadHref {
    #[serde(default)]
    href: String,
}

/// Resolves public-disk shares to direct download URLs.
#[derive(Debug, Clone)]
pub struct DiskResolver {
    client: Client,
    endpoint: String,
}

impl DiskResolver {
    /// Creates a resolver on the production metadata endpoint.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: API_ENDPOINT.to_string(),
        }
    }

    /// Overrides the metadata endpoint. Integration tests point this at a
    /// local mock server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Exchanges a public-share URL (and optional sub-path) for the direct
    /// download href.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::PermissionDenied`] when the endpoint answers
    /// without a usable href, plus network/status errors.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        public_url: &str,
        subpath: Option<&str>,
    ) -> Result<String, ResolveError> {
        let mut query: Vec<(&str, String)> = vec![("public_key", public_url.to_string())];
        if let Some(subpath) = subpath {
            let path = if subpath.starts_with('/') {
                subpath.to_string()
            } else {
                format!("/{subpath}")
            };
            query.push(("path", path));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| ResolveError::network(public_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::http_status(public_url, status.as_u16()));
        }

        let payload: DownloadHref = response.json().await.map_err(|_| {
            ResolveError::PermissionDenied {
                service: ServiceKind::PublicDisk,
                url: public_url.to_string(),
                page_title: None,
                capture_path: None,
            }
        })?;
        if payload.href.is_empty() {
            return Err(ResolveError::PermissionDenied {
                service: ServiceKind::PublicDisk,
                url: public_url.to_string(),
                page_title: None,
                capture_path: None,
            });
        }
        debug!(href = %payload.href, "public share resolved to download href");
        Ok(payload.href)
    }
}
