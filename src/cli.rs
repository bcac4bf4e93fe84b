//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch module archives from file-hosting share links, extract them, and
/// install the contents into a destination directory.
///
/// Supported links: Google Drive files, Dropbox shares, Mega files and
/// folders, Yandex Disk public shares, and Telegram message links.
#[derive(Parser, Debug)]
#[command(name = "modfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Share link URLs to fetch, processed sequentially (first failure
    /// stops the batch)
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Destination directory (created if absent)
    #[arg(short, long)]
    pub dest: PathBuf,

    /// Directory to save interstitial HTML responses on failure
    #[arg(long)]
    pub debug_html: Option<PathBuf>,

    /// Apply "user:group" ownership recursively after installation
    #[arg(long)]
    pub owner: Option<String>,

    /// Overwrite destination entries whose type conflicts with new content
    #[arg(short, long)]
    pub force: bool,

    /// Directory for temporary downloads/extraction (default: system tmp).
    /// Useful if /tmp is a small tmpfs
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Telegram API id (or set TG_API_ID). Required for Telegram URLs
    #[arg(long)]
    pub tg_api_id: Option<String>,

    /// Telegram API hash (or set TG_API_HASH). Required for Telegram URLs
    #[arg(long)]
    pub tg_api_hash: Option<String>,

    /// Telegram session identifier (or set TG_SESSION), reused across runs
    #[arg(long)]
    pub tg_session: Option<String>,

    /// Path to a KEY=VALUE env file. If omitted, looks for ./.env then the
    /// per-user config directory
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Disable env file loading
    #[arg(long)]
    pub no_env: bool,

    /// Let env file values shadow already-set environment variables
    #[arg(long)]
    pub env_override: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_urls() {
        let result = Args::try_parse_from(["modfetch", "--dest", "/tmp/mods"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_dest() {
        let result = Args::try_parse_from(["modfetch", "https://mega.nz/file/F#K"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_minimal_invocation() {
        let args = Args::try_parse_from([
            "modfetch",
            "--dest",
            "/tmp/mods",
            "https://mega.nz/file/F#K",
        ])
        .unwrap();
        assert_eq!(args.urls.len(), 1);
        assert_eq!(args.dest, PathBuf::from("/tmp/mods"));
        assert!(!args.force);
        assert!(!args.no_progress);
        assert!(args.owner.is_none());
    }

    #[test]
    fn test_cli_multiple_urls_preserved_in_order() {
        let args = Args::try_parse_from([
            "modfetch",
            "--dest",
            "/tmp/mods",
            "https://mega.nz/file/A#K",
            "https://t.me/chan/1",
        ])
        .unwrap();
        assert_eq!(args.urls[0], "https://mega.nz/file/A#K");
        assert_eq!(args.urls[1], "https://t.me/chan/1");
    }

    #[test]
    fn test_cli_telegram_and_env_flags() {
        let args = Args::try_parse_from([
            "modfetch",
            "--dest",
            "/tmp/mods",
            "--tg-api-id",
            "12345",
            "--tg-api-hash",
            "abc",
            "--env-file",
            "/etc/modfetch.env",
            "--no-env",
            "https://t.me/chan/1",
        ])
        .unwrap();
        assert_eq!(args.tg_api_id.as_deref(), Some("12345"));
        assert_eq!(args.env_file, Some(PathBuf::from("/etc/modfetch.env")));
        assert!(args.no_env);
    }

    #[test]
    fn test_cli_force_and_owner() {
        let args = Args::try_parse_from([
            "modfetch",
            "--dest",
            "/tmp/mods",
            "--force",
            "--owner",
            "games:games",
            "https://mega.nz/file/F#K",
        ])
        .unwrap();
        assert!(args.force);
        assert_eq!(args.owner.as_deref(), Some("games:games"));
    }

    #[test]
    fn test_cli_verbose_count() {
        let args = Args::try_parse_from([
            "modfetch",
            "--dest",
            "/tmp/mods",
            "-vv",
            "https://mega.nz/file/F#K",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["modfetch", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
