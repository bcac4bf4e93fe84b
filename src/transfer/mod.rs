//! Transfer execution: moving resolved byte sources onto disk.
//!
//! HTTP-resolved sources stream through [`client::save_response`];
//! encrypted-storage and chat-platform sources delegate to external clients
//! in [`external`]. Either way the output is a set of [`RetrievedItem`]s
//! inside the caller's scratch directory, exclusively owned by the pipeline
//! until placement.

pub mod client;
mod error;
pub mod external;
pub mod filename;

pub use client::{build_http_client, save_response};
pub use error::TransferError;

use std::path::PathBuf;

/// One filesystem entry (file or directory) produced by a transfer, before
/// archive expansion. Lives only inside the scoped scratch area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedItem {
    /// Absolute path inside the scratch directory.
    pub path: PathBuf,
}

impl RetrievedItem {
    /// Returns true if this item is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }
}
