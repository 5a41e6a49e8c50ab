//! Image references inside page markdown: extraction, fetching and rewriting.
//!
//! Both entry points fetch each distinct URL once and only touch the markdown
//! after every fetch of the page has settled, replacing each URL everywhere
//! it occurs.

use std::collections::HashMap;
use std::sync::LazyLock;

use backup_logging::{backup_debug, backup_warn};
use futures_util::stream::{FuturesUnordered, StreamExt};
use regex::Regex;

use crate::cache::{cache_reference, ImageCache};
use crate::fetch::ImageFetcher;
use crate::{FetchError, FetchedImage, ImageStats};

static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("valid image regex"));

/// A downloaded image assigned to a file inside the page's image folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub filename: String,
    pub source_url: String,
    pub image: FetchedImage,
}

/// Markdown with image references pointing at the staged files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImages {
    pub markdown: String,
    pub images: Vec<StagedImage>,
    pub stats: ImageStats,
}

/// Running tally reported after each fetch settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProgress {
    pub settled: usize,
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Distinct image URLs in order of first appearance.
pub fn extract_image_urls(markdown: &str) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    for caps in IMAGE_REF.captures_iter(markdown) {
        let url = &caps[2];
        if !seen.iter().any(|existing| existing == url) {
            seen.push(url.to_string());
        }
    }
    seen
}

/// Download every distinct image of a page for the backup archive.
///
/// Image `n` (by first appearance) is stored as `image-<n>.<ext>` and its
/// references are rewritten to `<image_dir>/image-<n>.<ext>`. A failed fetch
/// keeps its original URL and counts as failed.
pub async fn process_images<P>(
    markdown: &str,
    fetcher: &dyn ImageFetcher,
    image_dir: &str,
    mut on_progress: P,
) -> ProcessedImages
where
    P: FnMut(ImageProgress),
{
    let urls = extract_image_urls(markdown);
    let mut stats = ImageStats {
        total: urls.len(),
        ..ImageStats::default()
    };
    if urls.is_empty() {
        return ProcessedImages {
            markdown: markdown.to_string(),
            images: Vec::new(),
            stats,
        };
    }

    let mut pending: FuturesUnordered<_> = urls
        .iter()
        .enumerate()
        .map(|(idx, url)| async move { (idx, fetcher.fetch_image(url).await) })
        .collect();

    let mut fetched: Vec<Option<FetchedImage>> = vec![None; urls.len()];
    let mut settled = 0;
    while let Some((idx, outcome)) = pending.next().await {
        settled += 1;
        match outcome {
            Ok(image) => {
                stats.downloaded += 1;
                fetched[idx] = Some(image);
            }
            Err(err) => {
                stats.failed += 1;
                log_failed_fetch(&urls[idx], &err);
            }
        }
        on_progress(ImageProgress {
            settled,
            total: urls.len(),
            downloaded: stats.downloaded,
            failed: stats.failed,
        });
    }

    let mut rewritten = markdown.to_string();
    let mut images = Vec::new();
    for (idx, (url, image)) in urls.iter().zip(fetched).enumerate() {
        let Some(image) = image else { continue };
        let filename = format!("image-{}.{}", idx + 1, image.extension());
        rewritten = rewritten.replace(url.as_str(), &format!("{image_dir}/{filename}"));
        images.push(StagedImage {
            filename,
            source_url: url.clone(),
            image,
        });
    }

    ProcessedImages {
        markdown: rewritten,
        images,
        stats,
    }
}

/// Pull absolute image URLs of freshly exported markdown into `cache` and
/// point the markdown at the cached copies.
pub async fn stage_remote_images(
    markdown: &str,
    fetcher: &dyn ImageFetcher,
    cache: &ImageCache,
) -> String {
    let urls: Vec<String> = extract_image_urls(markdown)
        .into_iter()
        .filter(|url| is_absolute_http(url))
        .collect();
    if urls.is_empty() {
        return markdown.to_string();
    }

    let mut pending: FuturesUnordered<_> = urls
        .iter()
        .map(|url| async move { (url, fetcher.fetch_image(url).await) })
        .collect();

    let mut url_to_id: HashMap<&str, String> = HashMap::new();
    while let Some((url, outcome)) = pending.next().await {
        match outcome {
            Ok(image) => {
                let mime = image.mime_type().to_string();
                let id = cache.insert(image.bytes, mime);
                backup_debug!("Cached image {} as {}", url, id);
                url_to_id.insert(url.as_str(), id);
            }
            Err(err) => log_failed_fetch(url, &err),
        }
    }

    let mut rewritten = markdown.to_string();
    for url in &urls {
        if let Some(id) = url_to_id.get(url.as_str()) {
            rewritten = rewritten.replace(url.as_str(), &cache_reference(id));
        }
    }
    rewritten
}

fn is_absolute_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn log_failed_fetch(url: &str, err: &FetchError) {
    backup_warn!("Failed to download image {}: {}", url, err);
}

#[cfg(test)]
mod tests {
    use super::extract_image_urls;

    #[test]
    fn urls_are_deduplicated_in_first_appearance_order() {
        let md = "![a](https://x/1.png)\n![b](https://x/2.png)\n![c](https://x/1.png)";
        assert_eq!(
            extract_image_urls(md),
            vec!["https://x/1.png".to_string(), "https://x/2.png".to_string()]
        );
    }

    #[test]
    fn plain_links_are_not_images() {
        assert!(extract_image_urls("[a](https://x/1.png)").is_empty());
    }
}
