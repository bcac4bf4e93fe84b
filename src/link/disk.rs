//! Yandex Disk public-share link normalization.
//!
//! Two accepted shapes: the short `/d/<hash>` form, optionally followed by a
//! sub-path addressing one entry inside a folder share, and the older
//! `/public?hash=<hash>&path=<subpath>` query form. Both normalize to a
//! public-share URL (the `public_key` the metadata endpoint accepts) plus an
//! optional sub-path.

use url::Url;

use super::ResolvedLink;
use super::error::LinkError;

/// Service name used in error messages.
pub(crate) const SERVICE: &str = "Yandex Disk";

/// Normalizes a public-disk URL into a [`ResolvedLink::PublicDiskItem`].
///
/// # Errors
///
/// Returns [`LinkError::Malformed`] when neither shape matches or the share
/// hash is empty.
pub fn normalize(url: &str) -> Result<ResolvedLink, LinkError> {
    let parsed =
        Url::parse(url).map_err(|e| LinkError::malformed(SERVICE, url, e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| LinkError::malformed(SERVICE, url, "missing host"))?;

    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();

    if segments.len() >= 2 && segments[0] == "d" {
        let hash = segments[1];
        if hash.is_empty() {
            return Err(LinkError::malformed(SERVICE, url, "empty share hash"));
        }
        let subpath = (segments.len() > 2).then(|| segments[2..].join("/"));
        return Ok(ResolvedLink::PublicDiskItem {
            public_url: format!("https://{host}/d/{hash}"),
            subpath,
        });
    }

    if segments.first() == Some(&"public") {
        let hash = parsed
            .query_pairs()
            .find(|(k, _)| k == "hash")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LinkError::malformed(SERVICE, url, "missing hash parameter"))?;
        let subpath = parsed
            .query_pairs()
            .find(|(k, _)| k == "path")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
        return Ok(ResolvedLink::PublicDiskItem {
            public_url: format!("https://{host}/public?hash={hash}"),
            subpath,
        });
    }

    Err(LinkError::malformed(
        SERVICE,
        url,
        "unrecognized link shape (expected /d/<hash> or /public?hash=)",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parts(link: ResolvedLink) -> (String, Option<String>) {
        match link {
            ResolvedLink::PublicDiskItem {
                public_url,
                subpath,
            } => (public_url, subpath),
            other => panic!("expected PublicDiskItem, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_short_form_without_subpath() {
        let (public_url, subpath) = parts(normalize("https://disk.yandex.ru/d/AbCdEf123").unwrap());
        assert_eq!(public_url, "https://disk.yandex.ru/d/AbCdEf123");
        assert_eq!(subpath, None);
    }

    #[test]
    fn test_normalize_short_form_with_subpath() {
        let (public_url, subpath) =
            parts(normalize("https://yadi.sk/d/AbCdEf123/modules/core.zip").unwrap());
        assert_eq!(public_url, "https://yadi.sk/d/AbCdEf123");
        assert_eq!(subpath.as_deref(), Some("modules/core.zip"));
    }

    #[test]
    fn test_normalize_query_form() {
        let (public_url, subpath) = parts(
            normalize("https://disk.yandex.ru/public?hash=AbC%2Bd&path=%2Fcore.zip").unwrap(),
        );
        assert!(public_url.starts_with("https://disk.yandex.ru/public?hash="));
        assert_eq!(subpath.as_deref(), Some("/core.zip"));
    }

    #[test]
    fn test_normalize_query_form_without_path() {
        let (_, subpath) =
            parts(normalize("https://disk.yandex.ru/public?hash=AbCd").unwrap());
        assert_eq!(subpath, None);
    }

    #[test]
    fn test_normalize_missing_hash_rejected() {
        assert!(normalize("https://disk.yandex.ru/public?path=%2Fx").is_err());
    }

    #[test]
    fn test_normalize_unrecognized_shape_rejected() {
        assert!(normalize("https://disk.yandex.ru/client/disk").is_err());
    }
}
