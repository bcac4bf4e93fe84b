//! Share-link classification and normalization.
//!
//! This module turns raw URLs into the stable identifiers each hosting
//! service's transfer path actually needs. It is organized as a set of
//! independent pure parsers keyed by classified service kind:
//!
//! - [`classify`] - host-based service detection
//! - [`parse_link`] - classification plus per-service normalization
//! - [`ResolvedLink`] - tagged union over the per-service identifier sets
//!
//! Each service's grammar lives in its own submodule ([`drive`], [`dropbox`],
//! [`mega`], [`disk`], [`telegram`]); the parsers share no state and fail
//! fast with descriptive errors instead of guessing a best-effort id.

pub mod disk;
pub mod drive;
pub mod dropbox;
mod error;
pub mod mega;
pub mod telegram;

pub use error::LinkError;

use url::Url;

/// Hosts recognized as the chat platform, in both absolute and host-relative
/// link forms.
pub const TELEGRAM_HOSTS: [&str; 3] = ["t.me", "telegram.me", "telegram.dog"];

const DRIVE_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];
const DROPBOX_HOSTS: [&str; 2] = ["dropbox.com", "dropboxusercontent.com"];
const MEGA_HOSTS: [&str; 2] = ["mega.nz", "mega.co.nz"];
const DISK_HOSTS: [&str; 2] = ["disk.yandex.ru", "yadi.sk"];

/// The hosting service a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Google Drive file links.
    Drive,
    /// Dropbox share or direct-content links.
    Dropbox,
    /// Mega encrypted-storage links.
    Mega,
    /// Yandex Disk public-share links.
    PublicDisk,
    /// Telegram message links.
    Telegram,
}

impl ServiceKind {
    /// Human-readable service name for logs and error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Drive => drive::SERVICE,
            Self::Dropbox => dropbox::SERVICE,
            Self::Mega => mega::SERVICE,
            Self::PublicDisk => disk::SERVICE,
            Self::Telegram => telegram::SERVICE,
        }
    }

    fn hosts(self) -> &'static [&'static str] {
        match self {
            Self::Drive => &DRIVE_HOSTS,
            Self::Dropbox => &DROPBOX_HOSTS,
            Self::Mega => &MEGA_HOSTS,
            Self::PublicDisk => &DISK_HOSTS,
            Self::Telegram => &TELEGRAM_HOSTS,
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The peer a chat message belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPeer {
    /// Public username or channel name.
    Username(String),
    /// Internal signed supergroup id (`-100`-prefixed).
    Supergroup(i64),
}

impl std::fmt::Display for ChatPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username(name) => f.write_str(name),
            Self::Supergroup(id) => write!(f, "{id}"),
        }
    }
}

/// A normalized share link carrying only the identifiers needed to reach
/// bytes. Immutable once produced; consumed exactly once by the transfer
/// stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLink {
    /// A single Drive file addressed by id.
    DriveFile {
        /// The Drive file id.
        file_id: String,
    },
    /// A Dropbox URL already normalized to serve direct content.
    SyncShare {
        /// The direct-content URL.
        url: String,
    },
    /// A single encrypted-storage file.
    EncryptedFile {
        /// Scheme + host the link was parsed from.
        base: String,
        /// Node id of the file.
        file_id: String,
        /// Decryption key.
        key: String,
    },
    /// A shared encrypted-storage folder.
    EncryptedFolder {
        /// Scheme + host the link was parsed from.
        base: String,
        /// Node id of the folder.
        folder_id: String,
        /// Decryption key.
        key: String,
    },
    /// One file nested inside a shared encrypted-storage folder.
    EncryptedFolderFile {
        /// Scheme + host the link was parsed from.
        base: String,
        /// Node id of the enclosing folder.
        folder_id: String,
        /// Node id of the nested file.
        file_id: String,
        /// Decryption key of the folder share.
        key: String,
    },
    /// A public-disk share, optionally addressing one entry inside it.
    PublicDiskItem {
        /// Normalized public-share URL (the metadata endpoint's public key).
        public_url: String,
        /// Sub-path locating one entry inside a folder share.
        subpath: Option<String>,
    },
    /// A chat-platform message expected to carry a media attachment.
    ChatMessage {
        /// The peer the message belongs to.
        peer: ChatPeer,
        /// Numeric message id.
        message_id: i64,
    },
}

impl ResolvedLink {
    /// The service this link belongs to.
    #[must_use]
    pub fn service(&self) -> ServiceKind {
        match self {
            Self::DriveFile { .. } => ServiceKind::Drive,
            Self::SyncShare { .. } => ServiceKind::Dropbox,
            Self::EncryptedFile { .. }
            | Self::EncryptedFolder { .. }
            | Self::EncryptedFolderFile { .. } => ServiceKind::Mega,
            Self::PublicDiskItem { .. } => ServiceKind::PublicDisk,
            Self::ChatMessage { .. } => ServiceKind::Telegram,
        }
    }
}

/// Returns true if `host` is `domain` or any subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Identifies which hosting service a URL belongs to.
///
/// Pure function of the URL's host name (case-insensitive), matching the
/// exact domain or any subdomain of each service's fixed allow-list.
/// Host-relative chat links (`t.me/...` without a scheme) are recognized as
/// well. Returns `None` when no pattern matches; the caller decides whether
/// that is fatal.
#[must_use]
pub fn classify(url: &str) -> Option<ServiceKind> {
    let candidate = telegram::normalize_host_relative(url);
    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    for kind in [
        ServiceKind::Drive,
        ServiceKind::Dropbox,
        ServiceKind::Mega,
        ServiceKind::PublicDisk,
        ServiceKind::Telegram,
    ] {
        if kind
            .hosts()
            .iter()
            .any(|domain| host_matches(&host, domain))
        {
            return Some(kind);
        }
    }
    None
}

/// Classifies a URL and runs the matching service normalizer.
///
/// # Errors
///
/// Returns [`LinkError::Unclassified`] when no service matches and
/// [`LinkError::Malformed`] when the matched service's grammar rejects the
/// link.
pub fn parse_link(url: &str) -> Result<ResolvedLink, LinkError> {
    match classify(url) {
        Some(ServiceKind::Drive) => drive::normalize(url),
        Some(ServiceKind::Dropbox) => dropbox::normalize(url),
        Some(ServiceKind::Mega) => mega::normalize(url),
        Some(ServiceKind::PublicDisk) => disk::normalize(url),
        Some(ServiceKind::Telegram) => telegram::normalize(url),
        None => Err(LinkError::unclassified(url)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_drive_hosts() {
        assert_eq!(
            classify("https://drive.google.com/file/d/abc/view"),
            Some(ServiceKind::Drive)
        );
        assert_eq!(
            classify("https://docs.google.com/uc?id=abc"),
            Some(ServiceKind::Drive)
        );
    }

    #[test]
    fn test_classify_dropbox_hosts() {
        assert_eq!(
            classify("https://www.dropbox.com/s/abc/x.zip?dl=0"),
            Some(ServiceKind::Dropbox)
        );
        assert_eq!(
            classify("https://dl.dropboxusercontent.com/s/abc/x.zip"),
            Some(ServiceKind::Dropbox)
        );
    }

    #[test]
    fn test_classify_mega_hosts() {
        assert_eq!(
            classify("https://mega.nz/file/ID#KEY"),
            Some(ServiceKind::Mega)
        );
        assert_eq!(
            classify("https://mega.co.nz/#!ID!KEY"),
            Some(ServiceKind::Mega)
        );
    }

    #[test]
    fn test_classify_public_disk_hosts() {
        assert_eq!(
            classify("https://disk.yandex.ru/d/hash"),
            Some(ServiceKind::PublicDisk)
        );
        assert_eq!(classify("https://yadi.sk/d/hash"), Some(ServiceKind::PublicDisk));
    }

    #[test]
    fn test_classify_telegram_hosts_and_subdomains() {
        assert_eq!(classify("https://t.me/chan/1"), Some(ServiceKind::Telegram));
        assert_eq!(
            classify("https://telegram.me/chan/1"),
            Some(ServiceKind::Telegram)
        );
        assert_eq!(
            classify("https://telegram.dog/chan/1"),
            Some(ServiceKind::Telegram)
        );
    }

    #[test]
    fn test_classify_host_relative_telegram() {
        assert_eq!(classify("t.me/chan/1"), Some(ServiceKind::Telegram));
    }

    #[test]
    fn test_classify_is_case_insensitive_on_host() {
        assert_eq!(
            classify("https://Drive.Google.COM/file/d/abc/view"),
            Some(ServiceKind::Drive)
        );
    }

    #[test]
    fn test_classify_unknown_host_returns_none() {
        assert_eq!(classify("https://example.com/file.zip"), None);
        // Suffix match must not treat lookalike domains as a hit.
        assert_eq!(classify("https://omega.nz/file/ID#KEY"), None);
        assert_eq!(classify("https://notdropbox.com/s/abc"), None);
    }

    #[test]
    fn test_parse_link_unclassified_error() {
        let err = parse_link("https://example.com/file.zip").unwrap_err();
        assert!(matches!(err, LinkError::Unclassified { .. }));
    }

    #[test]
    fn test_parse_link_dispatches_to_service_normalizer() {
        let link = parse_link("https://mega.nz/file/FILEID#KEY").unwrap();
        assert_eq!(link.service(), ServiceKind::Mega);
    }

    #[test]
    fn test_service_kind_names() {
        assert_eq!(ServiceKind::Drive.name(), "Google Drive");
        assert_eq!(ServiceKind::PublicDisk.name(), "Yandex Disk");
    }
}
