//! Placement: merging retrieved entries into the destination tree.
//!
//! Placement is the last step of the pipeline, so a failed run never leaves
//! a partially placed entry — with one accepted exception: directory merge
//! is not atomic and can leave a partially merged directory if interrupted
//! mid-merge.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

/// The conflict policy actually applied while placing one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedPolicy {
    /// No conflict: the entry moved straight in.
    Moved,
    /// Both sides were directories; contents merged recursively.
    Merged,
    /// Both sides were plain files; the destination was replaced.
    Replaced,
    /// Types differed and the overwrite flag removed the destination first.
    Overwrote,
}

/// Final absolute path of a placed entry plus how the name collision (if
/// any) was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementResult {
    /// Final path inside the destination tree.
    pub path: PathBuf,
    /// The conflict policy that was applied.
    pub policy: AppliedPolicy,
}

/// Errors from the placement stage.
#[derive(Debug, Error)]
pub enum PlaceError {
    /// Destination name exists with an incompatible type and no overwrite
    /// flag is in effect.
    #[error("destination exists with different type: {dest}. Use --force to override.")]
    Conflict {
        /// The conflicting destination path.
        dest: PathBuf,
    },

    /// File system error while moving or deleting.
    #[error("IO error placing {path}: {source}")]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Recursive copy/move failure.
    #[error("copy error placing {path}: {source}")]
    Copy {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: fs_extra::error::Error,
    },
}

/// Moves or merges `src` into `dest_root`, resolving name collisions.
///
/// - destination name absent: plain move;
/// - directory onto directory: recursive merge, then the source is removed;
/// - file onto file: replace;
/// - type mismatch: refused unless `overwrite`, which removes the
///   destination first regardless of type.
///
/// # Errors
///
/// Returns [`PlaceError::Conflict`] on a refused type mismatch and I/O or
/// copy errors otherwise.
#[instrument(skip_all, fields(src = %src.display(), dest_root = %dest_root.display()))]
pub fn place_entry(
    src: &Path,
    dest_root: &Path,
    overwrite: bool,
) -> Result<PlacementResult, PlaceError> {
    let name = src.file_name().ok_or_else(|| PlaceError::Io {
        path: src.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"),
    })?;
    let dest = dest_root.join(name);

    if !dest.exists() {
        move_entry(src, &dest)?;
        debug!(dest = %dest.display(), "placed (moved)");
        return Ok(PlacementResult {
            path: dest,
            policy: AppliedPolicy::Moved,
        });
    }

    if src.is_dir() && dest.is_dir() {
        merge_dirs(src, &dest)?;
        std::fs::remove_dir_all(src).map_err(|e| PlaceError::Io {
            path: src.to_path_buf(),
            source: e,
        })?;
        debug!(dest = %dest.display(), "placed (merged)");
        return Ok(PlacementResult {
            path: dest,
            policy: AppliedPolicy::Merged,
        });
    }

    if src.is_file() && dest.is_file() {
        std::fs::remove_file(&dest).map_err(|e| PlaceError::Io {
            path: dest.clone(),
            source: e,
        })?;
        move_entry(src, &dest)?;
        debug!(dest = %dest.display(), "placed (replaced)");
        return Ok(PlacementResult {
            path: dest,
            policy: AppliedPolicy::Replaced,
        });
    }

    if overwrite {
        if dest.is_dir() {
            std::fs::remove_dir_all(&dest).map_err(|e| PlaceError::Io {
                path: dest.clone(),
                source: e,
            })?;
        } else {
            std::fs::remove_file(&dest).map_err(|e| PlaceError::Io {
                path: dest.clone(),
                source: e,
            })?;
        }
        move_entry(src, &dest)?;
        debug!(dest = %dest.display(), "placed (overwrote)");
        return Ok(PlacementResult {
            path: dest,
            policy: AppliedPolicy::Overwrote,
        });
    }

    Err(PlaceError::Conflict { dest })
}

/// Plain move with a copy fallback for cross-device boundaries (the scratch
/// area commonly sits on a different filesystem than the destination).
fn move_entry(src: &Path, dest: &Path) -> Result<(), PlaceError> {
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    if src.is_dir() {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::move_dir(src, dest, &options).map_err(|e| PlaceError::Copy {
            path: src.to_path_buf(),
            source: e,
        })?;
    } else {
        let options = fs_extra::file::CopyOptions::new();
        fs_extra::file::move_file(src, dest, &options).map_err(|e| PlaceError::Copy {
            path: src.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Recursively copies the contents of `src` into the existing `dest`.
fn merge_dirs(src: &Path, dest: &Path) -> Result<(), PlaceError> {
    let mut options = fs_extra::dir::CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;
    fs_extra::dir::copy(src, dest, &options).map_err(|e| PlaceError::Copy {
        path: src.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
