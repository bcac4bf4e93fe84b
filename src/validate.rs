//! Post-receipt validation: rejecting HTML error pages disguised as files.
//!
//! Hosting services answer some failure modes with `200 OK` and an HTML
//! body, which would otherwise land on disk pretending to be the requested
//! archive. Detection order matters: known binary magic numbers win over
//! everything (a real zip named `.html` is still a zip), then the
//! `.htm`/`.html` extension, then a permissive sniff of the first bytes.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::link::ServiceKind;
use crate::transfer::RetrievedItem;

/// How many leading bytes the sniff reads.
const SNIFF_BYTES: usize = 512;

/// Magic numbers that short-circuit to "not HTML".
const BINARY_MAGICS: [&[u8]; 9] = [
    b"PK\x03\x04",             // zip local file header
    b"PK\x05\x06",             // zip empty archive
    b"PK\x07\x08",             // zip spanned archive
    b"\x1f\x8b",               // gzip
    b"7z\xbc\xaf\x27\x1c",     // 7-zip
    b"Rar!\x1a\x07",           // rar
    b"%PDF",                   // pdf
    b"\x89PNG",                // png
    b"\xff\xd8\xff",           // jpeg
];

/// Errors from post-receipt validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// The downloaded "file" is actually an HTML page.
    #[error(
        "{service} returned an HTML page disguised as a file for {url} (received {path}). Check sharing permissions."
    )]
    HtmlMasquerade {
        /// The service that produced the artifact.
        service: ServiceKind,
        /// The original URL, so the operator can fix sharing settings.
        url: String,
        /// Where the offending artifact landed.
        path: PathBuf,
    },

    /// The artifact could not be read for inspection.
    #[error("IO error inspecting {path}: {source}")]
    Io {
        /// The artifact path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Returns true if the file at `path` looks like an HTML document.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be opened or read.
pub fn looks_like_html(path: &Path) -> std::io::Result<bool> {
    let mut head = [0u8; SNIFF_BYTES];
    let mut file = std::fs::File::open(path)?;
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let head = &head[..filled];

    if BINARY_MAGICS.iter().any(|magic| head.starts_with(magic)) {
        return Ok(false);
    }

    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("htm") || ext.eq_ignore_ascii_case("html"));
    if by_extension {
        return Ok(true);
    }

    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    Ok(text.contains("<!doctype") || text.contains("<html"))
}

/// Rejects a retrieved file that is actually an HTML error page.
///
/// Directories pass through untouched; only plain files are sniffed.
///
/// # Errors
///
/// Returns [`ValidateError::HtmlMasquerade`] on positive detection, naming
/// the source service and original URL.
pub fn ensure_not_html(
    item: &RetrievedItem,
    service: ServiceKind,
    url: &str,
) -> Result<(), ValidateError> {
    if item.is_dir() {
        return Ok(());
    }
    let is_html = looks_like_html(&item.path).map_err(|source| ValidateError::Io {
        path: item.path.clone(),
        source,
    })?;
    if is_html {
        return Err(ValidateError::HtmlMasquerade {
            service,
            url: url.to_string(),
            path: item.path.clone(),
        });
    }
    debug!(path = %item.path.display(), "artifact passed HTML check");
    Ok(())
}
