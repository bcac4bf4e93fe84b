//! CLI entry point for modfetch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use modfetch::{
    DownloadTarget, EnvFile, Fetcher, SystemTools, apply_ownership, build_http_client,
    resolve_telegram_config,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let env = if args.no_env {
        EnvFile::empty()
    } else if let Some(path) = &args.env_file {
        EnvFile::load(path, args.env_override)?
            .with_context(|| format!("env file not found: {}", path.display()))?
    } else {
        EnvFile::load_default(args.env_override)?
    };

    let telegram = resolve_telegram_config(
        args.tg_api_id.as_deref(),
        args.tg_api_hash.as_deref(),
        args.tg_session.as_deref(),
        &env,
    )?;

    let dest_dir = std::path::absolute(&args.dest)
        .with_context(|| format!("cannot resolve destination path: {}", args.dest.display()))?;
    std::fs::create_dir_all(&dest_dir)
        .with_context(|| format!("cannot create destination directory: {}", dest_dir.display()))?;
    if let Some(work_dir) = &args.work_dir {
        std::fs::create_dir_all(work_dir)
            .with_context(|| format!("cannot create work directory: {}", work_dir.display()))?;
    }

    let target = DownloadTarget {
        dest_dir,
        debug_html_dir: args.debug_html.clone(),
    };
    let client = build_http_client();
    let tools = SystemTools;
    let fetcher = Fetcher::new(
        client,
        &tools,
        target,
        args.work_dir.clone(),
        args.force,
        !args.no_progress,
        telegram,
    );

    // Sequential, fail-fast: the batch stops at the first unrecoverable URL.
    let mut installed: Vec<PathBuf> = Vec::new();
    for url in &args.urls {
        info!(%url, "fetching");
        let placements = fetcher.fetch_url(url).await?;
        installed.extend(placements.into_iter().map(|p| p.path));
    }

    if installed.is_empty() {
        println!("Nothing installed.");
        return Ok(());
    }

    if let Some(owner) = &args.owner {
        apply_ownership(&tools, &installed, owner).await?;
    }
    for path in &installed {
        println!("Installed: {}", path.display());
    }

    Ok(())
}
