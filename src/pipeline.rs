//! Per-URL orchestration: classify, normalize, resolve, transfer, validate,
//! extract, place.
//!
//! URLs process strictly sequentially, one at a time; the first
//! unrecoverable failure stops the batch. Every download happens inside a
//! scoped scratch directory whose removal is guaranteed on all exit paths,
//! so nothing partial ever survives outside the destination tree.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use crate::archive::{self, ArchiveError};
use crate::config::TelegramConfig;
use crate::link::{self, LinkError, ResolvedLink, ServiceKind};
use crate::place::{self, PlaceError, PlacementResult};
use crate::resolve::{DiskResolver, DriveResolver, ResolveError, dropbox};
use crate::tools::{ToolError, ToolRunner};
use crate::transfer::{self, RetrievedItem, TransferError, filename};
use crate::validate::{self, ValidateError};

/// Where results land: the destination tree plus the optional capture dir
/// for failed interstitial HTML.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    /// Destination directory; created if absent.
    pub dest_dir: PathBuf,
    /// Where failed interstitial HTML is persisted for diagnosis.
    pub debug_html_dir: Option<PathBuf>,
}

/// Errors surfaced by the pipeline. Each wraps the failing stage's error;
/// all are terminal for the current URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Classification or link-grammar failure.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Interstitial negotiation failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Byte-transfer failure.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A disguised HTML error page was detected after download.
    #[error(transparent)]
    Validate(#[from] ValidateError),

    /// Archive detection/extraction failure.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Destination merge/move failure.
    #[error(transparent)]
    Place(#[from] PlaceError),

    /// A chat-platform URL showed up but no credentials were configured.
    #[error(
        "chat-platform URL detected but API credentials are missing for {url}: provide --tg-api-id and --tg-api-hash (or TG_API_ID/TG_API_HASH)"
    )]
    CredentialsMissing {
        /// The chat-platform URL.
        url: String,
    },

    /// The scratch directory could not be created.
    #[error("cannot create scratch directory: {source}")]
    Scratch {
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The post-placement ownership change failed.
    #[error("ownership change failed for {path}: {source}")]
    Chown {
        /// The placed path whose ownership change failed.
        path: PathBuf,
        /// The underlying tool error.
        #[source]
        source: ToolError,
    },

    /// `chown` itself is unavailable.
    #[error("cannot change ownership: chown not found on PATH")]
    ChownMissing,
}

/// One-shot fetch pipeline. Holds the shared HTTP client and the injected
/// tool capability; carries no state across URLs beyond configuration.
pub struct Fetcher<'a> {
    client: Client,
    tools: &'a dyn ToolRunner,
    target: DownloadTarget,
    work_dir: Option<PathBuf>,
    overwrite: bool,
    progress: bool,
    telegram: Option<TelegramConfig>,
}

impl<'a> Fetcher<'a> {
    /// Creates a pipeline over the given target and capability set.
    #[must_use]
    pub fn new(
        client: Client,
        tools: &'a dyn ToolRunner,
        target: DownloadTarget,
        work_dir: Option<PathBuf>,
        overwrite: bool,
        progress: bool,
        telegram: Option<TelegramConfig>,
    ) -> Self {
        Self {
            client,
            tools,
            target,
            work_dir,
            overwrite,
            progress,
            telegram,
        }
    }

    /// Fetches one URL end to end and returns the final placements.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; nothing is retried and the scratch
    /// area is removed regardless of outcome.
    #[instrument(skip(self))]
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<PlacementResult>, FetchError> {
        let link = link::parse_link(url)?;
        let service = link.service();
        info!(%service, "link normalized");

        let scratch = self.scratch_dir("modfetch_download_")?;
        let items = self.transfer(url, &link, scratch.path()).await?;

        for item in &items {
            validate::ensure_not_html(item, service, url)?;
        }

        let mut placed = Vec::new();
        for item in items {
            self.expand_and_place(&item, &mut placed).await?;
        }
        // `scratch` drops here; partial artifacts never outlive the run.
        drop(scratch);
        Ok(placed)
    }

    /// Runs the service-appropriate transfer into the scratch dir.
    async fn transfer(
        &self,
        url: &str,
        link: &ResolvedLink,
        scratch: &Path,
    ) -> Result<Vec<RetrievedItem>, FetchError> {
        match link {
            ResolvedLink::DriveFile { file_id } => {
                let resolver = DriveResolver::new(
                    self.client.clone(),
                    self.target.debug_html_dir.clone(),
                );
                let response = resolver.resolve(file_id, url).await?;
                let item = transfer::save_response(
                    response,
                    scratch,
                    file_id,
                    ServiceKind::Drive.name(),
                    self.progress,
                )
                .await?;
                Ok(vec![item])
            }
            ResolvedLink::SyncShare { url: direct } => {
                let response = dropbox::fetch(&self.client, direct).await?;
                let fallback = fallback_from_url(direct);
                let item = transfer::save_response(
                    response,
                    scratch,
                    &fallback,
                    ServiceKind::Dropbox.name(),
                    self.progress,
                )
                .await?;
                Ok(vec![item])
            }
            ResolvedLink::EncryptedFile { .. }
            | ResolvedLink::EncryptedFolder { .. }
            | ResolvedLink::EncryptedFolderFile { .. } => {
                Ok(transfer::external::download_mega(self.tools, url, link, scratch).await?)
            }
            ResolvedLink::PublicDiskItem {
                public_url,
                subpath,
            } => {
                let resolver = DiskResolver::new(self.client.clone());
                let href = resolver.resolve(public_url, subpath.as_deref()).await?;
                let response = self
                    .client
                    .get(&href)
                    .send()
                    .await
                    .map_err(|e| ResolveError::network(public_url, e))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ResolveError::http_status(public_url, status.as_u16()).into());
                }
                let fallback = subpath
                    .as_deref()
                    .map(fallback_from_path)
                    .unwrap_or_else(|| fallback_from_url(&href));
                let item = transfer::save_response(
                    response,
                    scratch,
                    &fallback,
                    ServiceKind::PublicDisk.name(),
                    self.progress,
                )
                .await?;
                Ok(vec![item])
            }
            ResolvedLink::ChatMessage { peer, message_id } => {
                let Some(telegram) = &self.telegram else {
                    return Err(FetchError::CredentialsMissing {
                        url: url.to_string(),
                    });
                };
                Ok(transfer::external::download_telegram(
                    self.tools,
                    url,
                    peer,
                    *message_id,
                    telegram,
                    scratch,
                )
                .await?)
            }
        }
    }

    /// Expands archives and merges everything into the destination tree.
    async fn expand_and_place(
        &self,
        item: &RetrievedItem,
        placed: &mut Vec<PlacementResult>,
    ) -> Result<(), FetchError> {
        if item.is_dir() || archive::detect(&item.path).is_none() {
            placed.push(place::place_entry(
                &item.path,
                &self.target.dest_dir,
                self.overwrite,
            )?);
            return Ok(());
        }

        let extract_dir = self.scratch_dir("modfetch_extract_")?;
        archive::extract(self.tools, &item.path, extract_dir.path()).await?;
        let entries = std::fs::read_dir(extract_dir.path())
            .map_err(|source| FetchError::Scratch { source })?;
        for entry in entries {
            let entry = entry.map_err(|source| FetchError::Scratch { source })?;
            placed.push(place::place_entry(
                &entry.path(),
                &self.target.dest_dir,
                self.overwrite,
            )?);
        }
        Ok(())
    }

    fn scratch_dir(&self, prefix: &str) -> Result<TempDir, FetchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.work_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|source| FetchError::Scratch { source })
    }
}

/// Recursively applies `user:group` ownership to each placed path.
///
/// Runs after all placement: a failure here is fatal and reported, but the
/// files are already in place.
///
/// # Errors
///
/// Returns [`FetchError::ChownMissing`] when `chown` is not on `PATH` and
/// [`FetchError::Chown`] when it fails for a path.
pub async fn apply_ownership(
    tools: &dyn ToolRunner,
    paths: &[PathBuf],
    owner: &str,
) -> Result<(), FetchError> {
    let chown = tools.locate("chown").ok_or(FetchError::ChownMissing)?;
    for path in paths {
        tools
            .run(
                &chown,
                &[
                    "-R".to_string(),
                    owner.to_string(),
                    path.display().to_string(),
                ],
                &[0],
                &[],
            )
            .await
            .map_err(|source| FetchError::Chown {
                path: path.clone(),
                source,
            })?;
    }
    Ok(())
}

fn fallback_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .as_ref()
        .and_then(filename::filename_from_url)
        .map(|name| filename::sanitize_filename(&name))
        .unwrap_or_else(|| "download.bin".to_string())
}

fn fallback_from_path(path: &str) -> String {
    path.rsplit('/')
        .find(|part| !part.is_empty())
        .map(filename::sanitize_filename)
        .unwrap_or_else(|| "download.bin".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::test_support::FakeTools;

    #[test]
    fn test_fallback_from_url_uses_last_segment() {
        assert_eq!(
            fallback_from_url("https://example.com/files/module.zip?x=1"),
            "module.zip"
        );
    }

    #[test]
    fn test_fallback_from_url_degrades_to_download_bin() {
        assert_eq!(fallback_from_url("https://example.com/"), "download.bin");
    }

    #[test]
    fn test_fallback_from_path() {
        assert_eq!(fallback_from_path("/modules/core.zip"), "core.zip");
        assert_eq!(fallback_from_path(""), "download.bin");
    }

    #[tokio::test]
    async fn test_apply_ownership_runs_chown_per_path() {
        let tools = FakeTools::installed(&["chown"]);
        let paths = vec![PathBuf::from("/dest/a"), PathBuf::from("/dest/b")];
        apply_ownership(&tools, &paths, "games:games").await.unwrap();
        let calls = tools.recorded_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, vec!["-R", "games:games", "/dest/a"]);
    }

    #[tokio::test]
    async fn test_apply_ownership_missing_chown() {
        let tools = FakeTools::installed(&[]);
        let err = apply_ownership(&tools, &[PathBuf::from("/dest/a")], "g:g")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ChownMissing));
    }
}
