//! Configuration: `KEY=VALUE` env files and chat-platform credentials.
//!
//! The env file is deliberately simple: one `KEY=VALUE` per line, `#`
//! comments, an `export ` prefix tolerated, matching single or double
//! quotes stripped. File values never shadow the live process environment
//! unless the caller forces it, so the file lookup is a merge, not a
//! mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Environment variable names for the chat-platform credentials.
pub const API_ID_VAR: &str = "TG_API_ID";
/// See [`API_ID_VAR`].
pub const API_HASH_VAR: &str = "TG_API_HASH";
/// See [`API_ID_VAR`].
pub const SESSION_VAR: &str = "TG_SESSION";

/// Default reusable session identifier.
const DEFAULT_SESSION: &str = "modfetch";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Only one half of the id/hash credential pair was provided.
    #[error(
        "chat-platform credentials are incomplete: provide both --tg-api-id and --tg-api-hash (or set {API_ID_VAR} and {API_HASH_VAR})"
    )]
    CredentialsIncomplete,

    /// The app id is not numeric.
    #[error("--tg-api-id must be a number, got '{value}'")]
    InvalidApiId {
        /// The offending value.
        value: String,
    },

    /// The env file exists but could not be read.
    #[error("cannot read env file {path}: {source}")]
    Io {
        /// The env file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Credentials for the chat-platform client. Complete by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Numeric application id.
    pub api_id: i64,
    /// Application secret hash.
    pub api_hash: String,
    /// Reusable session identifier.
    pub session: String,
}

/// A parsed env file merged against the process environment.
#[derive(Debug, Default)]
pub struct EnvFile {
    values: HashMap<String, String>,
    force: bool,
}

impl EnvFile {
    /// An empty lookup: only the process environment answers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads an env file. Returns `Ok(None)` when `path` is not a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file exists but cannot be read.
    pub fn load(path: &Path, force: bool) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded env file");
        Ok(Some(Self {
            values: parse_env_content(&content),
            force,
        }))
    }

    /// Loads the first env file found in the default search locations:
    /// `./.env`, then the per-user config directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when a candidate exists but cannot be
    /// read.
    pub fn load_default(force: bool) -> Result<Self, ConfigError> {
        for candidate in default_candidates() {
            if let Some(loaded) = Self::load(&candidate, force)? {
                return Ok(loaded);
            }
        }
        Ok(Self::empty())
    }

    /// Looks a key up: process environment first, file values second,
    /// reversed when the file was loaded with force.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<String> {
        let process = std::env::var(key).ok().filter(|v| !v.is_empty());
        let file = self.values.get(key).cloned().filter(|v| !v.is_empty());
        if self.force {
            file.or(process)
        } else {
            process.or(file)
        }
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("modfetch").join(".env"));
    }
    candidates
}

fn parse_env_content(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for raw_line in content.lines() {
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("export ") {
            line = rest.trim_start();
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        values.insert(key.to_string(), value.to_string());
    }
    values
}

/// Resolves chat-platform credentials from flags and the environment.
///
/// Flags win over the environment lookup. Returns `Ok(None)` when neither
/// the id nor the hash was provided anywhere: credentials are only required
/// when a chat-platform URL actually shows up.
///
/// # Errors
///
/// Returns [`ConfigError::CredentialsIncomplete`] when exactly one of the
/// pair is present and [`ConfigError::InvalidApiId`] for a non-numeric id.
pub fn resolve_telegram_config(
    api_id_flag: Option<&str>,
    api_hash_flag: Option<&str>,
    session_flag: Option<&str>,
    env: &EnvFile,
) -> Result<Option<TelegramConfig>, ConfigError> {
    let api_id = api_id_flag
        .map(str::to_string)
        .or_else(|| env.lookup(API_ID_VAR));
    let api_hash = api_hash_flag
        .map(str::to_string)
        .or_else(|| env.lookup(API_HASH_VAR));
    let session = session_flag
        .map(str::to_string)
        .or_else(|| env.lookup(SESSION_VAR))
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    match (api_id, api_hash) {
        (None, None) => Ok(None),
        (Some(api_id), Some(api_hash)) => {
            let api_id = api_id
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidApiId { value: api_id })?;
            Ok(Some(TelegramConfig {
                api_id,
                api_hash,
                session,
            }))
        }
        _ => Err(ConfigError::CredentialsIncomplete),
    }
}
