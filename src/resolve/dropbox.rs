//! Dropbox direct-content fetch.
//!
//! No token flow exists here: the normalized `dl=1` URL either serves bytes
//! or an HTML preview/error page, and the HTML-without-content-disposition
//! rule alone decides failure.

use reqwest::{Client, Response};
use tracing::instrument;

use super::drive::is_html_without_disposition;
use super::error::ResolveError;
use crate::link::ServiceKind;

/// Fetches a normalized direct-content URL, rejecting interstitial HTML.
///
/// # Errors
///
/// Returns [`ResolveError::PermissionDenied`] when the response is HTML
/// with no content-disposition, plus network/status errors.
#[instrument(skip(client))]
pub async fn fetch(client: &Client, url: &str) -> Result<Response, ResolveError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ResolveError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::http_status(url, status.as_u16()));
    }

    if is_html_without_disposition(&response) {
        return Err(ResolveError::PermissionDenied {
            service: ServiceKind::Dropbox,
            url: url.to_string(),
            page_title: None,
            capture_path: None,
        });
    }
    Ok(response)
}
