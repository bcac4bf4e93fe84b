//! HTTP streaming: writing a resolved response body to the scratch area.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use reqwest::Response;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

use super::RetrievedItem;
use super::error::TransferError;
use super::filename::{filename_from_disposition, filename_from_url, sanitize_filename};

/// Connection timeout for all requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout; generous because module archives can be large.
const READ_TIMEOUT_SECS: u64 = 300;

/// Upper bound on a single file write.
const WRITE_CHUNK_BYTES: usize = 256 * 1024;

/// Browser-like User-Agent; the interstitial pages served to unknown
/// clients differ from the ones this code knows how to parse.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Builds the shared HTTP client.
///
/// The cookie store is required: the Drive confirm-cookie flow depends on
/// cookies persisting across the negotiation requests.
///
/// # Panics
///
/// Panics if the client builder fails with this static configuration,
/// which does not happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn build_http_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .gzip(true)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .expect("failed to build HTTP client with static configuration")
}

/// Streams a resolved response body to a file in `dest_dir`.
///
/// The filename comes from the Content-Disposition header, then the final
/// (post-redirect) URL, then `fallback_name`. Total size comes from
/// Content-Length when present; its absence just means indeterminate
/// progress.
///
/// # Errors
///
/// Returns [`TransferError`] on network or write failure, and
/// [`TransferError::Empty`] for a zero-byte body: an empty download is
/// never a usable artifact.
#[instrument(skip(response), fields(url = %response.url()))]
pub async fn save_response(
    response: Response,
    dest_dir: &Path,
    fallback_name: &str,
    desc: &'static str,
    progress: bool,
) -> Result<RetrievedItem, TransferError> {
    let url = response.url().clone();

    let name = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_disposition)
        .or_else(|| filename_from_url(&url))
        .unwrap_or_else(|| fallback_name.to_string());
    let name = sanitize_filename(&name);
    let path = dest_dir.join(&name);
    debug!(path = %path.display(), "writing download");

    let total = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&len| len > 0);
    let bar = progress_bar(total, desc, progress);

    let file = File::create(&path)
        .await
        .map_err(|e| TransferError::io(&path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransferError::network(url.as_str(), e))?;
        for part in chunk.chunks(WRITE_CHUNK_BYTES) {
            writer
                .write_all(part)
                .await
                .map_err(|e| TransferError::io(&path, e))?;
        }
        bytes_written += chunk.len() as u64;
        bar.inc(chunk.len() as u64);
    }
    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(&path, e))?;
    bar.finish_and_clear();

    if bytes_written == 0 {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(TransferError::empty(desc, url.as_str()));
    }

    info!(path = %path.display(), bytes = bytes_written, "download complete");
    Ok(RetrievedItem { path })
}

fn progress_bar(total: Option<u64>, desc: &'static str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = match total {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    let template = if total.is_some() {
        "{msg} {bytes}/{total_bytes} [{bar:30}] {bytes_per_sec}"
    } else {
        "{msg} {bytes} {bytes_per_sec}"
    };
    bar.set_style(
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(desc);
    bar
}
