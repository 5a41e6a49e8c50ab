//! Inline images into exported HTML so the document stands on its own.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use backup_logging::{backup_debug, backup_info};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::{Captures, Regex};
use url::Url;

use crate::batch::convert_batch;
use crate::cache::{ImageCache, CACHE_REF_PREFIX};
use crate::fetch::ImageFetcher;

/// Remote images are fetched this many at a time, with no pause in between.
pub const EMBED_CONCURRENCY: usize = 4;

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc=(?:"([^"]+)"|'([^']+)')[^>]*>"#).expect("valid img regex")
});
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc=(?:"[^"]+"|'[^']+')"#).expect("valid src regex")
});

fn tag_src<'c>(caps: &'c Captures) -> &'c str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

fn with_src(tag: &str, src: &str) -> String {
    SRC_ATTR
        .replace(tag, format!("src=\"{src}\"").as_str())
        .into_owned()
}

/// Already local, inline or relative to the archive.
fn should_skip(src: &str) -> bool {
    src.is_empty()
        || src.starts_with("data:")
        || src.starts_with("blob:")
        || src.starts_with("images/")
        || src.starts_with("./")
        || src.starts_with("../")
}

fn resolve(src: &str, base: Option<&Url>) -> Option<Url> {
    let url = match Url::parse(src) {
        Ok(url) => url,
        Err(_) => base?.join(src).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Replace remote `<img src>` values with data URIs.
///
/// Relative sources resolve against `base`. Images that cannot be fetched
/// keep their original tag.
pub async fn embed_remote_images(html: &str, base: Option<&Url>, fetcher: &dyn ImageFetcher) -> String {
    let mut sources: Vec<String> = Vec::new();
    for caps in IMG_TAG.captures_iter(html) {
        let src = tag_src(&caps);
        if !sources.iter().any(|seen| seen == src) {
            sources.push(src.to_string());
        }
    }
    if sources.is_empty() {
        return html.to_string();
    }

    let fetched = convert_batch(sources, EMBED_CONCURRENCY, Duration::ZERO, move |src: String| async move {
        if should_skip(&src) {
            return (src, None);
        }
        let Some(url) = resolve(&src, base) else {
            return (src, None);
        };
        match fetcher.fetch_image(url.as_str()).await {
            Ok(image) => {
                let uri = format!("data:{};base64,{}", image.mime_type(), STANDARD.encode(&image.bytes));
                (src, Some(uri))
            }
            Err(err) => {
                backup_debug!("Could not embed {}: {}", src, err);
                (src, None)
            }
        }
    })
    .await;

    let data_uris: HashMap<String, String> = fetched
        .into_iter()
        .filter_map(|(src, uri)| uri.map(|uri| (src, uri)))
        .collect();
    backup_info!("Embedded {} remote image(s)", data_uris.len());

    IMG_TAG
        .replace_all(html, |caps: &Captures| match data_uris.get(tag_src(caps)) {
            Some(uri) => with_src(&caps[0], uri),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Replace `<img src="/api/image-cache?id=…">` values with the cached data.
/// Missing or expired entries keep their tag.
pub fn embed_cached_images(html: &str, cache: &ImageCache) -> String {
    let mut found = 0usize;
    let mut embedded = 0usize;
    let out = IMG_TAG
        .replace_all(html, |caps: &Captures| {
            let src = tag_src(caps);
            let Some(id) = src.strip_prefix(CACHE_REF_PREFIX) else {
                return caps[0].to_string();
            };
            found += 1;
            let id = id.split('&').next().unwrap_or(id);
            match cache.data_uri(id) {
                Some(uri) => {
                    embedded += 1;
                    with_src(&caps[0], &uri)
                }
                None => {
                    backup_debug!("Image {} not found in cache", id);
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    backup_info!("Embedded {}/{} cached image(s)", embedded, found);
    out
}
