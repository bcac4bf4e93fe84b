//! Error types for the transfer stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::tools::ToolError;

/// Errors that can occur while moving bytes from a resolved source to disk.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level error mid-stream.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL being downloaded.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while writing the download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transfer completed but produced nothing usable.
    #[error("{source_desc} download produced no files: {url}")]
    Empty {
        /// What was downloading (service or tool name).
        source_desc: &'static str,
        /// The URL that produced nothing.
        url: String,
    },

    /// None of the acceptable external clients are installed.
    #[error("no usable client for {url}: install {wanted}")]
    MissingTool {
        /// The URL that needed the client.
        url: String,
        /// Human-readable list of acceptable tools.
        wanted: &'static str,
    },

    /// An external client ran and failed.
    #[error("external client failed for {url}: {source}")]
    ToolFailed {
        /// The URL being downloaded.
        url: String,
        /// The underlying tool error.
        #[source]
        source: ToolError,
    },
}

impl TransferError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an empty-result error.
    pub fn empty(source_desc: &'static str, url: impl Into<String>) -> Self {
        Self::Empty {
            source_desc,
            url: url.into(),
        }
    }

    /// Creates a missing-tool error.
    pub fn missing_tool(url: impl Into<String>, wanted: &'static str) -> Self {
        Self::MissingTool {
            url: url.into(),
            wanted,
        }
    }

    /// Creates a tool-failure error.
    pub fn tool_failed(url: impl Into<String>, source: ToolError) -> Self {
        Self::ToolFailed {
            url: url.into(),
            source,
        }
    }
}
