//! Error types for interstitial resolution.

use std::path::PathBuf;

use thiserror::Error;

use crate::link::ServiceKind;

/// Errors that can occur while negotiating past a service's interstitial
/// page to reach the actual byte stream.
///
/// All variants are terminal for the current URL; nothing here is retried.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The interstitial indicates a login wall.
    #[error(
        "{service} requires sign-in for {url}. Make the share public (anyone with the link) and retry."
    )]
    AuthRequired {
        /// The service that demanded authentication.
        service: ServiceKind,
        /// The URL being resolved.
        url: String,
    },

    /// The service returned HTML with no clear auth marker: ambiguous
    /// sharing settings.
    #[error(
        "{service} returned HTML instead of a file for {url}. Check sharing permissions.{title_hint}{capture_hint}",
        title_hint = .page_title.as_deref().map(|t| format!(" (page: {t})")).unwrap_or_default(),
        capture_hint = .capture_path.as_deref().map(|p| format!(" HTML saved to {}", p.display())).unwrap_or_default()
    )]
    PermissionDenied {
        /// The service that returned the interstitial.
        service: ServiceKind,
        /// The URL being resolved.
        url: String,
        /// Title of the returned page, when one was present.
        page_title: Option<String>,
        /// Where the offending HTML was persisted, when capture is on.
        capture_path: Option<PathBuf>,
    },

    /// Network-level failure talking to the service.
    #[error("network error resolving {url}: {source}")]
    Network {
        /// The URL being resolved.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with an error status.
    #[error("HTTP {status} resolving {url}")]
    HttpStatus {
        /// The URL being resolved.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}

impl ResolveError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}
