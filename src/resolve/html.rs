//! Pure HTML inspection helpers for interstitial pages.
//!
//! Everything here is a function of the page text alone so the token and
//! redirect extraction order stays testable without a network.

use std::sync::LazyLock;

use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static CONFIRM_QUERY_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"confirm=([0-9A-Za-z_-]+)"));
static CONFIRM_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"name="confirm"\s+value="([^"]+)""#));
static CONFIRM_JS_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"'confirm'\s*:\s*'([^']+)'"));
static DOWNLOAD_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#""downloadUrl"\s*:\s*"([^"]+)""#));
static ANCHOR_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"href="(/uc\?export=download[^"]+)""#));
static FORM_ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"<form[^>]+id="download-form"[^>]+action="([^"]+)""#));
static ANY_ACTION_RE: LazyLock<Regex> = LazyLock::new(|| compile(r#"action="([^"]+)""#));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)<title>(.*?)</title>"));

/// Hidden form fields worth carrying into a reconstructed download request.
const FORM_FIELDS: [&str; 4] = ["confirm", "uuid", "id", "export"];

/// Extracts a confirm token, trying the `confirm=` query pattern, the named
/// form field, then the JS-literal pattern, in that order.
#[must_use]
pub fn confirm_token(html: &str) -> Option<String> {
    for re in [&*CONFIRM_QUERY_RE, &*CONFIRM_FIELD_RE, &*CONFIRM_JS_RE] {
        if let Some(caps) = re.captures(html) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Extracts a machine-readable redirect from the page.
///
/// Tries the JSON `downloadUrl` field first (unescaping `\uXXXX` and `\/`
/// sequences), then a plain download anchor href.
#[must_use]
pub fn download_url(html: &str) -> Option<String> {
    if let Some(caps) = DOWNLOAD_URL_RE.captures(html) {
        return Some(unescape_json_fragment(&caps[1]));
    }
    ANCHOR_HREF_RE.captures(html).map(|caps| {
        format!(
            "https://drive.google.com{}",
            caps[1].replace("&amp;", "&")
        )
    })
}

/// Undoes JSON string escaping on a fragment captured out of inline script.
///
/// The captured text is a JSON string body, so re-wrapping it in quotes and
/// parsing handles every escape form at once; the manual replacements cover
/// pages whose escaping is not valid JSON.
fn unescape_json_fragment(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| {
        raw.replace("\\u003d", "=")
            .replace("\\u0026", "&")
            .replace("\\/", "/")
    })
}

/// Extracts the download form's action URL, if the page carries one.
#[must_use]
pub fn form_action(html: &str) -> Option<String> {
    FORM_ACTION_RE
        .captures(html)
        .map(|caps| caps[1].replace("&amp;", "&"))
}

/// Collects the known hidden form field values present in the page.
#[must_use]
pub fn form_params(html: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for name in FORM_FIELDS {
        let re = compile(&format!(r#"name="{name}"\s+value="([^"]+)""#));
        if let Some(caps) = re.captures(html) {
            params.push((name.to_string(), caps[1].to_string()));
        }
    }
    params
}

/// Parses the query parameters out of the first form action on the page.
#[must_use]
pub fn action_params(html: &str) -> Vec<(String, String)> {
    let Some(caps) = ANY_ACTION_RE.captures(html) else {
        return Vec::new();
    };
    let action = caps[1].replace("&amp;", "&");
    let Some((_, query)) = action.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (!key.is_empty() && !value.is_empty())
                .then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Extracts and whitespace-normalizes the page title.
#[must_use]
pub fn page_title(html: &str) -> Option<String> {
    let caps = TITLE_RE.captures(html)?;
    let title = caps[1]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}

/// Returns true if the page looks like a sign-in wall.
#[must_use]
pub fn has_signin_marker(html: &str) -> bool {
    html.contains("accounts.google.com") || html.contains("ServiceLogin")
}
