//! modfetch core library.
//!
//! Fetches a remote archive or file from a consumer file-hosting share link
//! (Google Drive, Dropbox, Mega, Yandex Disk public shares, or a Telegram
//! message), bypasses the service's interstitial pages, unpacks archives,
//! and merges the contents into a destination directory.
//!
//! # Architecture
//!
//! The pipeline is a straight line, one URL at a time:
//!
//! - [`link`] - classify the URL and parse the service's link grammar
//! - [`resolve`] - negotiate past interstitial pages to the byte stream
//! - [`transfer`] - stream bytes to the scratch area, or delegate to an
//!   external client for encrypted storage and chat messages
//! - [`validate`] - reject HTML error pages disguised as files
//! - [`archive`] - detect and extract archives
//! - [`place`] - merge results into the destination tree
//! - [`pipeline`] - orchestration and the ownership collaborator

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod config;
pub mod link;
pub mod pipeline;
pub mod place;
pub mod resolve;
pub mod tools;
pub mod transfer;
pub mod validate;

// Re-export commonly used types
pub use config::{ConfigError, EnvFile, TelegramConfig, resolve_telegram_config};
pub use link::{LinkError, ResolvedLink, ServiceKind, classify, parse_link};
pub use pipeline::{DownloadTarget, FetchError, Fetcher, apply_ownership};
pub use place::{AppliedPolicy, PlacementResult};
pub use tools::{SystemTools, ToolRunner};
pub use transfer::build_http_client;
