//! Archive detection and extraction.
//!
//! Detection is by filename suffix only; extraction shells out to the
//! environment's extractors through the injected [`ToolRunner`]. `unzip`
//! returns 1 for warning-level problems (filename encoding and the like),
//! which counts as success as long as files were produced; a hard failure
//! falls back to `7z`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::tools::{ToolError, ToolRunner};

/// Tar-family suffixes, compressed variants included.
const TAR_SUFFIXES: [&str; 8] = [
    ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz", ".tbz2", ".tar.xz", ".txz",
];

/// Suffixes handled by the 7-zip-compatible extractor.
const SEVENZIP_SUFFIXES: [&str; 2] = [".7z", ".rar"];

/// Archive families this stage can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`, extracted with `unzip` (falling back to `7z`).
    Zip,
    /// The tar family, extracted with `tar -xf`.
    Tar,
    /// `.7z` and `.rar`, extracted with `7z x`.
    SevenZip,
}

/// Errors from archive extraction.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file's suffix is not a supported archive type.
    #[error("unsupported archive type: {path}")]
    Unsupported {
        /// The offending file.
        path: PathBuf,
    },

    /// No capable extractor is installed.
    #[error("cannot extract {path}: install {wanted}")]
    MissingTool {
        /// The archive that needed extracting.
        path: PathBuf,
        /// Acceptable extractors.
        wanted: &'static str,
    },

    /// Every applicable extractor failed.
    #[error("extraction failed for {path}: {source}")]
    Extraction {
        /// The archive that failed.
        path: PathBuf,
        /// The last tool failure.
        #[source]
        source: ToolError,
    },

    /// Extraction succeeded but produced nothing.
    #[error("archive extraction produced no files: {path}")]
    Empty {
        /// The archive that came up empty.
        path: PathBuf,
    },

    /// File system error preparing or inspecting the extraction dir.
    #[error("IO error extracting {path}: {source}")]
    Io {
        /// The archive being extracted.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Detects the archive family from the filename suffix alone.
#[must_use]
pub fn detect(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".zip") {
        return Some(ArchiveKind::Zip);
    }
    if TAR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return Some(ArchiveKind::Tar);
    }
    if SEVENZIP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return Some(ArchiveKind::SevenZip);
    }
    None
}

/// Extracts `archive` into `dest_dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`ArchiveError::Unsupported`] for unknown suffixes,
/// [`ArchiveError::MissingTool`] when no capable extractor is installed,
/// [`ArchiveError::Extraction`] when every applicable extractor failed, and
/// [`ArchiveError::Empty`] when extraction yielded zero entries.
#[instrument(skip(tools))]
pub async fn extract(
    tools: &dyn ToolRunner,
    archive: &Path,
    dest_dir: &Path,
) -> Result<(), ArchiveError> {
    let kind = detect(archive).ok_or_else(|| ArchiveError::Unsupported {
        path: archive.to_path_buf(),
    })?;
    std::fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::Io {
        path: archive.to_path_buf(),
        source: e,
    })?;

    let archive_arg = archive.display().to_string();
    let dest_arg = dest_dir.display().to_string();

    match kind {
        ArchiveKind::Zip => {
            let unzip_result = match tools.locate("unzip") {
                Some(unzip) => Some(
                    tools
                        .run(
                            &unzip,
                            &[
                                "-qq".to_string(),
                                "-o".to_string(),
                                archive_arg.clone(),
                                "-d".to_string(),
                                dest_arg.clone(),
                            ],
                            // unzip exits 1 for warnings; still a success if
                            // files came out.
                            &[0, 1],
                            &[],
                        )
                        .await,
                ),
                None => None,
            };
            match unzip_result {
                Some(Ok(())) => {}
                other => {
                    if let Some(Err(ref err)) = other {
                        warn!(error = %err, "unzip failed hard, falling back to 7z");
                    }
                    run_sevenzip(tools, archive, &archive_arg, &dest_arg)
                        .await
                        .map_err(|source| match source {
                            FallbackFailure::Missing => ArchiveError::MissingTool {
                                path: archive.to_path_buf(),
                                wanted: "unzip or 7z",
                            },
                            FallbackFailure::Failed(source) => ArchiveError::Extraction {
                                path: archive.to_path_buf(),
                                source,
                            },
                        })?;
                }
            }
        }
        ArchiveKind::Tar => {
            let tar = tools.locate("tar").ok_or(ArchiveError::MissingTool {
                path: archive.to_path_buf(),
                wanted: "tar",
            })?;
            tools
                .run(
                    &tar,
                    &[
                        "-xf".to_string(),
                        archive_arg.clone(),
                        "-C".to_string(),
                        dest_arg.clone(),
                    ],
                    &[0],
                    &[],
                )
                .await
                .map_err(|source| ArchiveError::Extraction {
                    path: archive.to_path_buf(),
                    source,
                })?;
        }
        ArchiveKind::SevenZip => {
            run_sevenzip(tools, archive, &archive_arg, &dest_arg)
                .await
                .map_err(|source| match source {
                    FallbackFailure::Missing => ArchiveError::MissingTool {
                        path: archive.to_path_buf(),
                        wanted: "7z",
                    },
                    FallbackFailure::Failed(source) => ArchiveError::Extraction {
                        path: archive.to_path_buf(),
                        source,
                    },
                })?;
        }
    }

    let produced = std::fs::read_dir(dest_dir)
        .map_err(|e| ArchiveError::Io {
            path: archive.to_path_buf(),
            source: e,
        })?
        .next()
        .is_some();
    if !produced {
        return Err(ArchiveError::Empty {
            path: archive.to_path_buf(),
        });
    }
    debug!(archive = %archive.display(), "extraction complete");
    Ok(())
}

enum FallbackFailure {
    Missing,
    Failed(ToolError),
}

async fn run_sevenzip(
    tools: &dyn ToolRunner,
    _archive: &Path,
    archive_arg: &str,
    dest_arg: &str,
) -> Result<(), FallbackFailure> {
    let sevenzip = tools.locate("7z").ok_or(FallbackFailure::Missing)?;
    tools
        .run(
            &sevenzip,
            &[
                "x".to_string(),
                "-y".to_string(),
                format!("-o{dest_arg}"),
                archive_arg.to_string(),
            ],
            &[0],
            &[],
        )
        .await
        .map_err(FallbackFailure::Failed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::test_support::FakeTools;
    use tempfile::TempDir;

    #[test]
    fn test_detect_zip() {
        assert_eq!(detect(Path::new("module.zip")), Some(ArchiveKind::Zip));
        assert_eq!(detect(Path::new("MODULE.ZIP")), Some(ArchiveKind::Zip));
    }

    #[test]
    fn test_detect_tar_family() {
        for name in [
            "a.tar", "a.tar.gz", "a.tgz", "a.tar.bz2", "a.tbz", "a.tbz2", "a.tar.xz", "a.txz",
        ] {
            assert_eq!(detect(Path::new(name)), Some(ArchiveKind::Tar), "{name}");
        }
    }

    #[test]
    fn test_detect_sevenzip_family() {
        assert_eq!(detect(Path::new("a.7z")), Some(ArchiveKind::SevenZip));
        assert_eq!(detect(Path::new("a.rar")), Some(ArchiveKind::SevenZip));
    }

    #[test]
    fn test_detect_non_archive() {
        assert_eq!(detect(Path::new("module.json")), None);
        assert_eq!(detect(Path::new("gzip")), None);
    }

    fn seeded_dest() -> TempDir {
        TempDir::new().unwrap()
    }

    /// FakeTools does not create files, so pre-seed the destination to make
    /// the produced-entries check pass where extraction is expected to
    /// succeed.
    fn seed(dir: &TempDir) {
        std::fs::write(dir.path().join("module.json"), b"{}").unwrap();
    }

    #[tokio::test]
    async fn test_extract_zip_uses_unzip_with_warning_codes() {
        let tools = FakeTools::installed(&["unzip", "7z"]).with_exit_codes("unzip", vec![1]);
        let dest = seeded_dest();
        seed(&dest);
        extract(&tools, Path::new("/tmp/a.zip"), dest.path())
            .await
            .unwrap();
        let calls = tools.recorded_calls();
        assert_eq!(calls.len(), 1, "warning exit must not trigger 7z fallback");
        assert_eq!(calls[0].0, "unzip");
    }

    #[tokio::test]
    async fn test_extract_zip_falls_back_to_sevenzip_on_hard_failure() {
        let tools = FakeTools::installed(&["unzip", "7z"]).with_exit_codes("unzip", vec![2]);
        let dest = seeded_dest();
        seed(&dest);
        extract(&tools, Path::new("/tmp/a.zip"), dest.path())
            .await
            .unwrap();
        let calls = tools.recorded_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "7z");
    }

    #[tokio::test]
    async fn test_extract_zip_without_unzip_uses_sevenzip() {
        let tools = FakeTools::installed(&["7z"]);
        let dest = seeded_dest();
        seed(&dest);
        extract(&tools, Path::new("/tmp/a.zip"), dest.path())
            .await
            .unwrap();
        assert_eq!(tools.recorded_calls()[0].0, "7z");
    }

    #[tokio::test]
    async fn test_extract_zip_no_tools_is_missing_tool() {
        let tools = FakeTools::installed(&[]);
        let dest = seeded_dest();
        let err = extract(&tools, Path::new("/tmp/a.zip"), dest.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::MissingTool { .. }));
    }

    #[tokio::test]
    async fn test_extract_tar_invocation() {
        let tools = FakeTools::installed(&["tar"]);
        let dest = seeded_dest();
        seed(&dest);
        extract(&tools, Path::new("/tmp/a.tar.gz"), dest.path())
            .await
            .unwrap();
        let calls = tools.recorded_calls();
        assert_eq!(calls[0].0, "tar");
        assert_eq!(calls[0].1[0], "-xf");
    }

    #[tokio::test]
    async fn test_extract_empty_result_is_failure() {
        let tools = FakeTools::installed(&["tar"]);
        let dest = seeded_dest(); // nothing seeded
        let err = extract(&tools, Path::new("/tmp/a.tar"), dest.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_extract_unsupported_suffix() {
        let tools = FakeTools::installed(&["tar", "unzip", "7z"]);
        let dest = seeded_dest();
        let err = extract(&tools, Path::new("/tmp/a.iso"), dest.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported { .. }));
    }
}
