//! Delegated transfers through specialized external clients.
//!
//! Mega's encrypted storage and Telegram's message media cannot be fetched
//! with a plain HTTP GET; both need protocol-speaking clients. The clients
//! are environment-installed binaries reached through the injected
//! [`ToolRunner`] capability, each with a defined preference order and an
//! explicit missing-tool failure instead of a silent no-op.

use std::path::Path;

use tracing::{info, warn};

use super::RetrievedItem;
use super::error::TransferError;
use crate::config::TelegramConfig;
use crate::link::{ChatPeer, ResolvedLink, mega};
use crate::tools::ToolRunner;

/// Tools acceptable for encrypted-storage transfers, in preference order.
const MEGA_TOOLS_WANTED: &str = "MegaCMD (mega-get) or megatools (megadl)";

/// Tool required for chat-platform transfers.
const TELEGRAM_TOOL_WANTED: &str = "the tdl CLI";

/// Downloads an encrypted-storage link into `dest_dir`.
///
/// Preference order: `mega-get` (MegaCMD, understands every link form),
/// then `megadl` (megatools, legacy fragment grammar only). For folder-file
/// links megadl gets the original URL first; if that fails, the enclosing
/// folder is fetched instead, with a visible warning, because megatools has
/// no per-file folder download.
///
/// # Errors
///
/// Returns [`TransferError::MissingTool`] when neither client is installed,
/// [`TransferError::ToolFailed`] when the chosen client fails, and
/// [`TransferError::Empty`] when a client exits cleanly without producing
/// files.
pub async fn download_mega(
    tools: &dyn ToolRunner,
    url: &str,
    link: &ResolvedLink,
    dest_dir: &Path,
) -> Result<Vec<RetrievedItem>, TransferError> {
    let dest = dest_dir.display().to_string();

    if let Some(mega_get) = tools.locate("mega-get") {
        info!(tool = "mega-get", "delegating encrypted-storage transfer");
        tools
            .run(&mega_get, &[url.to_string(), dest], &[0], &[])
            .await
            .map_err(|e| TransferError::tool_failed(url, e))?;
        return collect_items(dest_dir, "Mega", url);
    }

    if let Some(megadl) = tools.locate("megadl") {
        info!(tool = "megadl", "delegating encrypted-storage transfer");
        let megadl = &megadl;
        let run_megadl = |target: String| {
            let args = vec!["--path".to_string(), dest.clone(), target];
            async move { tools.run(megadl, &args, &[0], &[]).await }
        };

        if matches!(link, ResolvedLink::EncryptedFolderFile { .. }) {
            // megadl sometimes understands nested file links directly; try
            // that before falling back to the whole folder.
            if run_megadl(url.to_string()).await.is_err() {
                let Some((folder_url, _)) = mega::megatools_url(link) else {
                    return Err(TransferError::missing_tool(url, MEGA_TOOLS_WANTED));
                };
                warn!(
                    "folder/file link detected; megadl will download the entire folder instead of the single file"
                );
                run_megadl(folder_url)
                    .await
                    .map_err(|e| TransferError::tool_failed(url, e))?;
            }
        } else {
            let Some((rendered, folder_fallback)) = mega::megatools_url(link) else {
                return Err(TransferError::missing_tool(url, MEGA_TOOLS_WANTED));
            };
            if folder_fallback {
                warn!(
                    "folder/file link detected; megadl will download the entire folder instead of the single file"
                );
            }
            run_megadl(rendered)
                .await
                .map_err(|e| TransferError::tool_failed(url, e))?;
        }
        return collect_items(dest_dir, "Mega", url);
    }

    Err(TransferError::missing_tool(url, MEGA_TOOLS_WANTED))
}

/// Downloads the media attached to a chat message into `dest_dir`.
///
/// Delegates to the `tdl` CLI with the canonical message URL rebuilt from
/// the parsed peer and message id; credentials travel as environment
/// variables and the reusable session identifier as the tool's namespace.
///
/// # Errors
///
/// Returns [`TransferError::MissingTool`] when `tdl` is not installed,
/// [`TransferError::ToolFailed`] on client failure, and
/// [`TransferError::Empty`] when nothing was produced.
pub async fn download_telegram(
    tools: &dyn ToolRunner,
    url: &str,
    peer: &ChatPeer,
    message_id: i64,
    config: &TelegramConfig,
    dest_dir: &Path,
) -> Result<Vec<RetrievedItem>, TransferError> {
    let Some(tdl) = tools.locate("tdl") else {
        return Err(TransferError::missing_tool(url, TELEGRAM_TOOL_WANTED));
    };

    let canonical = canonical_message_url(peer, message_id);
    let args = vec![
        "dl".to_string(),
        "-u".to_string(),
        canonical,
        "-d".to_string(),
        dest_dir.display().to_string(),
        "-n".to_string(),
        config.session.clone(),
    ];
    let envs = vec![
        ("TG_API_ID".to_string(), config.api_id.to_string()),
        ("TG_API_HASH".to_string(), config.api_hash.clone()),
    ];

    info!(tool = "tdl", "delegating chat-platform transfer");
    tools
        .run(&tdl, &args, &[0], &envs)
        .await
        .map_err(|e| TransferError::tool_failed(url, e))?;
    collect_items(dest_dir, "Telegram", url)
}

/// Rebuilds the canonical message URL from parsed identifiers.
fn canonical_message_url(peer: &ChatPeer, message_id: i64) -> String {
    match peer {
        ChatPeer::Username(name) => format!("https://t.me/{name}/{message_id}"),
        ChatPeer::Supergroup(id) => {
            let bare = id
                .to_string()
                .strip_prefix("-100")
                .map(str::to_string)
                .unwrap_or_else(|| id.to_string());
            format!("https://t.me/c/{bare}/{message_id}")
        }
    }
}

/// Lists what a delegated transfer produced; nothing is a failure.
fn collect_items(
    dest_dir: &Path,
    source_desc: &'static str,
    url: &str,
) -> Result<Vec<RetrievedItem>, TransferError> {
    let mut items = Vec::new();
    let entries = std::fs::read_dir(dest_dir).map_err(|e| TransferError::io(dest_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TransferError::io(dest_dir, e))?;
        items.push(RetrievedItem { path: entry.path() });
    }
    if items.is_empty() {
        return Err(TransferError::empty(source_desc, url));
    }
    Ok(items)
}
