//! Telegram message-link normalization.
//!
//! Three path shapes address a message: `/s/<username>/<msgid>` (public
//! channel preview), `/c/<chatid>/<msgid>` (private chat, where the chat id
//! must be turned into the internal signed supergroup id by prefixing
//! `-100`), and the default `/<username>/<msgid>`. Links are also accepted
//! host-relative (`t.me/user/42` with no scheme) and re-prefixed with
//! `https://`.

use url::Url;

use super::{ChatPeer, ResolvedLink, TELEGRAM_HOSTS};
use super::error::LinkError;

/// Service name used in error messages.
pub(crate) const SERVICE: &str = "Telegram";

/// Re-prefixes a host-relative Telegram link with `https://`.
///
/// Inputs that already carry a scheme and host are returned unchanged, as is
/// anything that does not start with a known Telegram host.
#[must_use]
pub fn normalize_host_relative(url: &str) -> String {
    if Url::parse(url).is_ok() {
        return url.to_string();
    }
    let trimmed = url.trim_start_matches('/');
    for host in TELEGRAM_HOSTS {
        if trimmed.starts_with(&format!("{host}/")) {
            return format!("https://{trimmed}");
        }
    }
    url.to_string()
}

/// Normalizes a Telegram message URL into a [`ResolvedLink::ChatMessage`].
///
/// # Errors
///
/// Returns [`LinkError::Malformed`] for any shape missing a numeric trailing
/// message id, and for private-chat links whose chat id is not numeric.
pub fn normalize(url: &str) -> Result<ResolvedLink, LinkError> {
    let normalized = normalize_host_relative(url);
    let parsed = Url::parse(&normalized)
        .map_err(|e| LinkError::malformed(SERVICE, url, e.to_string()))?;

    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();
    if segments.is_empty() {
        return Err(LinkError::malformed(SERVICE, url, "empty path"));
    }

    let message_id = |raw: &str| -> Result<i64, LinkError> {
        raw.parse::<i64>().map_err(|_| {
            LinkError::malformed(SERVICE, url, format!("message id '{raw}' is not numeric"))
        })
    };

    match segments[0] {
        "s" => {
            if segments.len() < 3 {
                return Err(LinkError::malformed(
                    SERVICE,
                    url,
                    "preview link needs a username and message id",
                ));
            }
            Ok(ResolvedLink::ChatMessage {
                peer: ChatPeer::Username(segments[1].to_string()),
                message_id: message_id(segments[segments.len() - 1])?,
            })
        }
        "c" => {
            if segments.len() < 3 {
                return Err(LinkError::malformed(
                    SERVICE,
                    url,
                    "private chat link needs a chat id and message id",
                ));
            }
            let chat_id = segments[1];
            if !chat_id.chars().all(|c| c.is_ascii_digit()) || chat_id.is_empty() {
                return Err(LinkError::malformed(
                    SERVICE,
                    url,
                    format!("chat id '{chat_id}' is not numeric"),
                ));
            }
            let peer = format!("-100{chat_id}").parse::<i64>().map_err(|_| {
                LinkError::malformed(SERVICE, url, format!("chat id '{chat_id}' is out of range"))
            })?;
            Ok(ResolvedLink::ChatMessage {
                peer: ChatPeer::Supergroup(peer),
                message_id: message_id(segments[segments.len() - 1])?,
            })
        }
        username => {
            if segments.len() < 2 {
                return Err(LinkError::malformed(
                    SERVICE,
                    url,
                    "link needs a username and message id",
                ));
            }
            Ok(ResolvedLink::ChatMessage {
                peer: ChatPeer::Username(username.to_string()),
                message_id: message_id(segments[segments.len() - 1])?,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn chat(link: ResolvedLink) -> (ChatPeer, i64) {
        match link {
            ResolvedLink::ChatMessage { peer, message_id } => (peer, message_id),
            other => panic!("expected ChatMessage, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_private_chat_gets_supergroup_prefix() {
        let (peer, message_id) = chat(normalize("https://t.me/c/1234567890/99").unwrap());
        assert_eq!(peer, ChatPeer::Supergroup(-1001234567890));
        assert_eq!(message_id, 99);
    }

    #[test]
    fn test_normalize_default_public_form() {
        let (peer, message_id) = chat(normalize("https://t.me/somechannel/42").unwrap());
        assert_eq!(peer, ChatPeer::Username("somechannel".to_string()));
        assert_eq!(message_id, 42);
    }

    #[test]
    fn test_normalize_preview_form() {
        let (peer, message_id) = chat(normalize("https://t.me/s/somechannel/42").unwrap());
        assert_eq!(peer, ChatPeer::Username("somechannel".to_string()));
        assert_eq!(message_id, 42);
    }

    #[test]
    fn test_normalize_missing_message_id_rejected() {
        let err = normalize("https://t.me/somechannel").unwrap_err();
        assert!(matches!(err, LinkError::Malformed { .. }));
    }

    #[test]
    fn test_normalize_non_numeric_message_id_rejected() {
        assert!(normalize("https://t.me/somechannel/about").is_err());
    }

    #[test]
    fn test_normalize_non_numeric_chat_id_rejected() {
        assert!(normalize("https://t.me/c/abc/99").is_err());
    }

    #[test]
    fn test_normalize_host_relative_input_accepted() {
        let (peer, message_id) = chat(normalize("t.me/somechannel/7").unwrap());
        assert_eq!(peer, ChatPeer::Username("somechannel".to_string()));
        assert_eq!(message_id, 7);
    }

    #[test]
    fn test_normalize_host_relative_unknown_host_untouched() {
        assert_eq!(
            normalize_host_relative("example.com/user/1"),
            "example.com/user/1"
        );
    }
}
