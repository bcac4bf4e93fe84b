//! Mega link normalization.
//!
//! Mega has two generations of link grammar. The current form puts the node
//! id in the path and the decryption key in the fragment
//! (`/file/<id>#<key>`, `/folder/<id>#<key>`, and the nested
//! `/folder/<id>#<key>/file/<id2>`). The legacy form encodes everything in
//! the fragment (`#!<id>!<key>` for files, `#F!<id>!<key>` and
//! `#F!<id>!<key>!<id2>` for folders). Both reduce to the same identifiers.

use url::Url;

use super::ResolvedLink;
use super::error::LinkError;

/// Service name used in error messages.
pub(crate) const SERVICE: &str = "Mega";

/// Normalizes a Mega URL into one of the encrypted-storage link variants.
///
/// # Errors
///
/// Returns [`LinkError::Malformed`] on unrecognized shapes or when a
/// required id/key component is empty. No best-effort guessing: a link
/// missing its decryption key is unusable and rejected here, before any
/// network or external-tool activity.
pub fn normalize(url: &str) -> Result<ResolvedLink, LinkError> {
    let parsed =
        Url::parse(url).map_err(|e| LinkError::malformed(SERVICE, url, e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| LinkError::malformed(SERVICE, url, "missing host"))?;
    let base = format!("{}://{host}", parsed.scheme());
    let fragment = parsed.fragment().unwrap_or_default();

    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();

    if segments.len() >= 2 && segments[0].eq_ignore_ascii_case("file") {
        let file_id = segments[1];
        return require(url, "file id", file_id).and_then(|_| {
            require(url, "decryption key", fragment)?;
            Ok(ResolvedLink::EncryptedFile {
                base,
                file_id: file_id.to_string(),
                key: fragment.to_string(),
            })
        });
    }

    if segments.len() >= 2 && segments[0].eq_ignore_ascii_case("folder") {
        let folder_id = segments[1];
        require(url, "folder id", folder_id)?;
        // Nested file link: the fragment carries "<key>/file/<file id>".
        if let Some((key, file_id)) = fragment.split_once("/file/") {
            require(url, "decryption key", key)?;
            require(url, "nested file id", file_id)?;
            return Ok(ResolvedLink::EncryptedFolderFile {
                base,
                folder_id: folder_id.to_string(),
                file_id: file_id.to_string(),
                key: key.to_string(),
            });
        }
        require(url, "decryption key", fragment)?;
        return Ok(ResolvedLink::EncryptedFolder {
            base,
            folder_id: folder_id.to_string(),
            key: fragment.to_string(),
        });
    }

    if let Some(rest) = fragment.strip_prefix("F!") {
        let tokens: Vec<&str> = rest.split('!').collect();
        if tokens.len() >= 2 {
            let (folder_id, key) = (tokens[0], tokens[1]);
            require(url, "folder id", folder_id)?;
            require(url, "decryption key", key)?;
            if tokens.len() >= 3 && !tokens[2].is_empty() {
                return Ok(ResolvedLink::EncryptedFolderFile {
                    base,
                    folder_id: folder_id.to_string(),
                    file_id: tokens[2].to_string(),
                    key: key.to_string(),
                });
            }
            return Ok(ResolvedLink::EncryptedFolder {
                base,
                folder_id: folder_id.to_string(),
                key: key.to_string(),
            });
        }
    }

    if let Some(rest) = fragment.strip_prefix('!') {
        let tokens: Vec<&str> = rest.split('!').collect();
        if tokens.len() >= 2 {
            let (file_id, key) = (tokens[0], tokens[1]);
            require(url, "file id", file_id)?;
            require(url, "decryption key", key)?;
            return Ok(ResolvedLink::EncryptedFile {
                base,
                file_id: file_id.to_string(),
                key: key.to_string(),
            });
        }
    }

    Err(LinkError::malformed(
        SERVICE,
        url,
        "unrecognized link shape (expected /file/<id>#<key>, /folder/<id>#<key>, or legacy #!/#F! fragment)",
    ))
}

fn require(url: &str, what: &str, value: &str) -> Result<(), LinkError> {
    if value.is_empty() {
        return Err(LinkError::malformed(SERVICE, url, format!("empty {what}")));
    }
    Ok(())
}

/// Renders the legacy fragment URL shape the megatools CLI understands.
///
/// Returns the rendered URL plus a flag that is true when the link addressed
/// a single file inside a folder: megatools has no per-file folder download,
/// so the rendered URL fetches the entire enclosing folder and the caller
/// must surface a warning.
#[must_use]
pub fn megatools_url(link: &ResolvedLink) -> Option<(String, bool)> {
    match link {
        ResolvedLink::EncryptedFile { base, file_id, key } => {
            Some((format!("{base}/#!{file_id}!{key}"), false))
        }
        ResolvedLink::EncryptedFolder {
            base,
            folder_id,
            key,
        } => Some((format!("{base}/#F!{folder_id}!{key}"), false)),
        ResolvedLink::EncryptedFolderFile {
            base,
            folder_id,
            key,
            ..
        } => Some((format!("{base}/#F!{folder_id}!{key}"), true)),
        _ => None,
    }
}
