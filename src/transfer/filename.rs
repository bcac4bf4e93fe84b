//! Filename derivation for downloaded files.
//!
//! Preference order: RFC 5987 `filename*` parameter (percent-decoded), a
//! quoted or bare `filename` parameter, the last path segment of the final
//! (possibly redirected) URL, then whatever service-specific fallback the
//! caller supplies.

use url::Url;

/// Parses a Content-Disposition header into a filename.
///
/// Handles:
/// - `attachment; filename*=UTF-8''example%20file.zip` (RFC 5987)
/// - `attachment; filename="example.zip"`
/// - `attachment; filename=example.zip`
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = header.find("filename=") {
        let value = header[pos + 9..].trim();
        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim();
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

/// Derives a filename from the last path segment of a URL, percent-decoded.
#[must_use]
pub fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    Some(
        urlencoding::decode(last)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| last.to_string()),
    )
}

/// Strips path components and characters that are unsafe in a filename.
///
/// The result is always a plain single-segment name; anything that reduces
/// to nothing becomes `download.bin`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    // Keep only the final path component, whichever separator style.
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let sanitized: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = sanitized.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return "download.bin".to_string();
    }
    trimmed.to_string()
}
