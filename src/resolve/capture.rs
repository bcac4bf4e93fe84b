//! Debug capture of interstitial HTML for offline diagnosis.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

#[allow(clippy::expect_used)]
static UNSAFE_STEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("stem regex is valid"));

/// Persists interstitial HTML under a sanitized name in the capture dir.
///
/// The stem is reduced to `[a-zA-Z0-9_-]` runs; an empty result falls back
/// to `page`. The directory is created if absent.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory or file cannot be
/// written.
pub fn save_debug_html(html: &str, capture_dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(capture_dir)?;
    let safe = UNSAFE_STEM_RE.replace_all(stem, "_");
    let safe = safe.trim_matches('_');
    let stem = if safe.is_empty() { "page" } else { safe };
    let path = capture_dir.join(format!("{stem}.html"));
    std::fs::write(&path, html)?;
    debug!(path = %path.display(), "saved interstitial HTML capture");
    Ok(path)
}
