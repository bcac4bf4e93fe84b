//! Google Drive interstitial negotiation.
//!
//! Drive answers the download endpoint with file bytes only for small,
//! scanned files. Everything else gets an interstitial: a warning page with
//! a confirm token (cookie, query, form field, or JS literal), a JSON
//! `downloadUrl` redirect, or a reconstructable download form. The exchange
//! is a short state machine so every failure path is explicit:
//!
//! ```text
//! Initial -(download_warning cookie)----------------> Confirmed
//! Initial -(HTML: downloadUrl)----------------------> FollowRedirect
//! Initial -(HTML: confirm token)--------------------> RetryWithToken
//! Initial -(HTML: download form)--------------------> SubmitForm
//! Initial -(HTML: none of the above)----------------> terminal failure
//! Confirmed/FollowRedirect/RetryWithToken/SubmitForm -> Fetched | terminal failure
//! ```

use std::path::PathBuf;

use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response};
use tracing::{debug, instrument};

use super::capture;
use super::error::ResolveError;
use super::html;
use crate::link::ServiceKind;

/// Download endpoint the id-based requests go through.
const DOWNLOAD_ENDPOINT: &str = "https://drive.google.com/uc?export=download";

/// Cookie-name prefix Drive uses for the large-file confirm token.
const WARNING_COOKIE_PREFIX: &str = "download_warning";

/// What the first response tells us to do next.
#[derive(Debug)]
enum Negotiation {
    /// The response is (or is about to be) the byte stream.
    Fetched(Response),
    /// Re-request the download endpoint with a confirm token.
    RetryWithToken(String),
    /// Follow a machine-readable redirect extracted from the HTML.
    FollowRedirect(String),
    /// Reconstruct the download form's GET request.
    SubmitForm {
        action: String,
        params: Vec<(String, String)>,
    },
    /// HTML with no known bypass affordance: terminal.
    Opaque(String),
}

/// Negotiates past Drive's interstitial pages to the real byte stream.
#[derive(Debug, Clone)]
pub struct DriveResolver {
    client: Client,
    endpoint: String,
    capture_dir: Option<PathBuf>,
}

impl DriveResolver {
    /// Creates a resolver on the production download endpoint.
    ///
    /// The client must have a cookie store: the confirm-cookie leg of the
    /// state machine depends on it.
    #[must_use]
    pub fn new(client: Client, capture_dir: Option<PathBuf>) -> Self {
        Self {
            client,
            endpoint: DOWNLOAD_ENDPOINT.to_string(),
            capture_dir,
        }
    }

    /// Overrides the download endpoint. Integration tests point this at a
    /// local mock server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Resolves a Drive file id to a response whose body is the file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::AuthRequired`] when the final page is a
    /// sign-in wall, [`ResolveError::PermissionDenied`] for any other
    /// terminal HTML, and network/status errors for transport failures.
    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn resolve(
        &self,
        file_id: &str,
        original_url: &str,
    ) -> Result<Response, ResolveError> {
        let initial = self
            .get(&self.endpoint, &[("id", file_id)], original_url)
            .await?;

        let response = match self.plan(initial).await? {
            Negotiation::Fetched(response) => response,
            Negotiation::RetryWithToken(token) => {
                debug!("re-requesting with confirm token");
                self.get(
                    &self.endpoint,
                    &[("id", file_id), ("confirm", &token)],
                    original_url,
                )
                .await?
            }
            Negotiation::FollowRedirect(url) => {
                debug!(url = %url, "following extracted download url");
                self.get(&url, &[], original_url).await?
            }
            Negotiation::SubmitForm { action, params } => {
                debug!(action = %action, "reconstructing download form request");
                let mut merged: Vec<(String, String)> =
                    vec![("id".to_string(), file_id.to_string())];
                for (key, value) in params {
                    upsert(&mut merged, key, value);
                }
                let target = if action.is_empty() {
                    self.endpoint.clone()
                } else {
                    action
                };
                let pairs: Vec<(&str, &str)> = merged
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                self.get(&target, &pairs, original_url).await?
            }
            Negotiation::Opaque(page) => {
                return Err(self.terminal_failure(page, file_id, original_url));
            }
        };

        // Whatever leg we took, a response that is still HTML with no
        // content-disposition never carries file bytes.
        if is_html_without_disposition(&response) {
            let page = response
                .text()
                .await
                .map_err(|e| ResolveError::network(original_url, e))?;
            return Err(self.terminal_failure(page, file_id, original_url));
        }
        Ok(response)
    }

    /// Classifies the initial response into the next state.
    async fn plan(&self, response: Response) -> Result<Negotiation, ResolveError> {
        let url = response.url().to_string();

        if let Some(token) = warning_cookie_token(&response) {
            debug!("confirm token found in cookie");
            return Ok(Negotiation::RetryWithToken(token));
        }

        if !is_html(&response) {
            return Ok(Negotiation::Fetched(response));
        }

        let page = response
            .text()
            .await
            .map_err(|e| ResolveError::network(&url, e))?;

        if let Some(download_url) = html::download_url(&page) {
            return Ok(Negotiation::FollowRedirect(download_url));
        }
        if let Some(token) = html::confirm_token(&page) {
            return Ok(Negotiation::RetryWithToken(token));
        }

        let form_action = html::form_action(&page);
        let mut params = html::action_params(&page);
        let form_fields = html::form_params(&page);
        if form_action.is_some() || !params.is_empty() || !form_fields.is_empty() {
            // Form fields win over query-string action parameters on conflict.
            for (key, value) in form_fields {
                upsert(&mut params, key, value);
            }
            return Ok(Negotiation::SubmitForm {
                action: form_action.unwrap_or_default(),
                params,
            });
        }

        Ok(Negotiation::Opaque(page))
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        original_url: &str,
    ) -> Result<Response, ResolveError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::network(original_url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::http_status(original_url, status.as_u16()));
        }
        Ok(response)
    }

    /// Classifies terminal HTML as a login wall or ambiguous sharing
    /// settings, persisting the page when capture is configured.
    fn terminal_failure(&self, page: String, file_id: &str, original_url: &str) -> ResolveError {
        let capture_path = self.capture_dir.as_deref().and_then(|dir| {
            capture::save_debug_html(&page, dir, &format!("gdrive_{file_id}")).ok()
        });
        if html::has_signin_marker(&page) {
            return ResolveError::AuthRequired {
                service: ServiceKind::Drive,
                url: original_url.to_string(),
            };
        }
        ResolveError::PermissionDenied {
            service: ServiceKind::Drive,
            url: original_url.to_string(),
            page_title: html::page_title(&page),
            capture_path,
        }
    }
}

/// Replaces an existing key or appends, preserving first-seen order.
fn upsert(params: &mut Vec<(String, String)>, key: String, value: String) {
    if let Some(slot) = params.iter_mut().find(|(k, _)| *k == key) {
        slot.1 = value;
    } else {
        params.push((key, value));
    }
}

fn warning_cookie_token(response: &Response) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name().starts_with(WARNING_COOKIE_PREFIX))
        .map(|cookie| cookie.value().to_string())
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"))
}

/// The rule that decides failure for both Drive and Dropbox: HTML bodies
/// without a content-disposition header are interstitials, not files.
pub(crate) fn is_html_without_disposition(response: &Response) -> bool {
    is_html(response) && !response.headers().contains_key(CONTENT_DISPOSITION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_and_appends() {
        let mut params = vec![("id".to_string(), "original".to_string())];
        upsert(&mut params, "id".to_string(), "override".to_string());
        upsert(&mut params, "confirm".to_string(), "t".to_string());
        assert_eq!(
            params,
            vec![
                ("id".to_string(), "override".to_string()),
                ("confirm".to_string(), "t".to_string()),
            ]
        );
    }
}
