//! External tool execution behind an injected capability trait.
//!
//! Archive extractors and the specialized download clients are
//! environment-installed binaries. Modeling lookup and execution as a trait
//! keeps the preference-order logic (which tool, which fallback, what
//! counts as success) testable without any of the real binaries present.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from launching or running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool could not be launched at all.
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        /// Tool name.
        tool: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited with a status outside the accepted set.
    #[error("{tool} exited with status {code}")]
    Exited {
        /// Tool name.
        tool: String,
        /// Exit code, or -1 when terminated by signal.
        code: i32,
    },
}

/// Lookup and execution capability for environment-installed binaries.
///
/// `async_trait` keeps the trait object-safe for `&dyn ToolRunner`
/// injection.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Locates a program on `PATH`, returning its absolute path.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Runs a program to completion with the given arguments and extra
    /// environment, treating any exit code in `ok_codes` as success.
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        ok_codes: &[i32],
        envs: &[(String, String)],
    ) -> Result<(), ToolError>;
}

/// The real thing: `which`-based lookup and `tokio::process` execution with
/// stdout/stderr suppressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTools;

#[async_trait]
impl ToolRunner for SystemTools {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    #[instrument(skip(self, envs), fields(program = %program.display()))]
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        ok_codes: &[i32],
        envs: &[(String, String)],
    ) -> Result<(), ToolError> {
        let tool = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in envs {
            command.env(key, value);
        }

        let status = command.status().await.map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?;
        let code = status.code().unwrap_or(-1);
        if !ok_codes.contains(&code) {
            return Err(ToolError::Exited { tool, code });
        }
        debug!(code, "tool completed");
        Ok(())
    }
}
