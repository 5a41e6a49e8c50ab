use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9a-f]{32})$").expect("valid trailing id regex"));
static EMBEDDED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9a-f]{32})").expect("valid embedded id regex"));
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{12}$")
        .expect("valid uuid regex")
});

/// Page id from a page URL (`…/Some-Title-<32 hex>`), a bare 32-hex id or
/// a dashed UUID, which is returned unchanged.
pub fn parse_page_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match Url::parse(input) {
        Ok(url) => {
            let last_segment = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default();
            if let Some(caps) = TRAILING_ID.captures(last_segment) {
                return Some(caps[1].to_string());
            }
        }
        Err(_) => {
            if let Some(caps) = EMBEDDED_ID.captures(input) {
                return Some(caps[1].to_string());
            }
        }
    }

    UUID.is_match(input).then(|| input.to_string())
}
