//! Dropbox link normalization.

use url::Url;

use super::ResolvedLink;
use super::error::LinkError;

/// Service name used in error messages.
pub(crate) const SERVICE: &str = "Dropbox";

/// Host suffix that already serves raw file content.
const DIRECT_CONTENT_HOST: &str = "dropboxusercontent.com";

/// Normalizes a Dropbox URL into a [`ResolvedLink::SyncShare`].
///
/// URLs on the direct-content host pass through unchanged. Share-page URLs
/// get `dl=1` forced into the query string so the server returns file bytes
/// instead of the preview page; all other query parameters are preserved.
///
/// # Errors
///
/// Returns [`LinkError::Malformed`] if the URL cannot be parsed at all.
pub fn normalize(url: &str) -> Result<ResolvedLink, LinkError> {
    let mut parsed =
        Url::parse(url).map_err(|e| LinkError::malformed(SERVICE, url, e.to_string()))?;

    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if host == DIRECT_CONTENT_HOST || host.ends_with(&format!(".{DIRECT_CONTENT_HOST}")) {
        return Ok(ResolvedLink::SyncShare {
            url: url.to_string(),
        });
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "dl")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("dl", "1");
    }

    Ok(ResolvedLink::SyncShare {
        url: parsed.to_string(),
    })
}
