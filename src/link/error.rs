//! Error types for link classification and normalization.

use thiserror::Error;

/// Errors produced while classifying or parsing share links.
///
/// Both variants are terminal for the current URL: malformed links are never
/// retried or guessed at, and unclassified hosts are reported back to the
/// caller to decide whether that is fatal.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The URL's host does not belong to any supported hosting service.
    #[error("unsupported URL (no known hosting service matches): {url}")]
    Unclassified {
        /// The URL that failed classification.
        url: String,
    },

    /// The URL matched a service but its link grammar could not be parsed.
    #[error("malformed {service} link {url}: {reason}")]
    Malformed {
        /// Human-readable service name (e.g. "Google Drive").
        service: &'static str,
        /// The offending URL.
        url: String,
        /// What was missing or unparseable.
        reason: String,
    },
}

impl LinkError {
    /// Creates an unclassified-URL error.
    pub fn unclassified(url: impl Into<String>) -> Self {
        Self::Unclassified { url: url.into() }
    }

    /// Creates a malformed-link error for the named service.
    pub fn malformed(
        service: &'static str,
        url: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Malformed {
            service,
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclassified_display_names_url() {
        let err = LinkError::unclassified("https://example.com/file.zip");
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/file.zip"), "got: {msg}");
    }

    #[test]
    fn test_malformed_display_names_service_and_reason() {
        let err = LinkError::malformed(
            "Google Drive",
            "https://drive.google.com/drive/folders/abc",
            "folder links are not supported",
        );
        let msg = err.to_string();
        assert!(msg.contains("Google Drive"), "got: {msg}");
        assert!(msg.contains("folder links"), "got: {msg}");
    }
}
