//! Google Drive link normalization.
//!
//! Drive exposes the same file id through several URL shapes that have
//! accumulated over the years: an `id` query parameter (`open?id=`,
//! `uc?export=download&id=`) and a `/file/d/<id>` path segment. All of them
//! reduce to the single file id the download endpoint needs. Folder links
//! have no single-file download endpoint and are rejected.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::ResolvedLink;
use super::error::LinkError;

/// Service name used in error messages.
pub(crate) const SERVICE: &str = "Google Drive";

#[allow(clippy::expect_used)]
static FILE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("drive file path regex is valid")
});

#[allow(clippy::expect_used)]
static UC_DOWNLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/uc\?export=download&id=([a-zA-Z0-9_-]+)").expect("drive uc regex is valid")
});

/// Extracts a Drive file id from any supported URL shape.
///
/// Tried in order: `id` query parameter, `/file/d/<id>` path segment,
/// `uc?export=download&id=<id>` download-endpoint form.
#[must_use]
pub fn extract_file_id(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "id")
            && !id.is_empty()
        {
            return Some(id.into_owned());
        }
        if let Some(caps) = FILE_PATH_RE.captures(parsed.path()) {
            return Some(caps[1].to_string());
        }
    }
    UC_DOWNLOAD_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Normalizes a Drive URL into a [`ResolvedLink::DriveFile`].
///
/// # Errors
///
/// Returns [`LinkError::Malformed`] when no file id can be extracted,
/// including for folder links, which are explicitly unsupported.
pub fn normalize(url: &str) -> Result<ResolvedLink, LinkError> {
    match extract_file_id(url) {
        Some(file_id) => Ok(ResolvedLink::DriveFile { file_id }),
        None => Err(LinkError::malformed(
            SERVICE,
            url,
            "no file id found (folder links are not supported)",
        )),
    }
}
