use std::sync::Arc;

use backup_logging::{backup_info, backup_warn};
use chrono::Utc;
use thiserror::Error;

use crate::archive::{ArchiveBuilder, ArchiveError};
use crate::cache::ImageCache;
use crate::convert::{convert_pages, PageExporter, PageJob};
use crate::fetch::ImageFetcher;
use crate::html_embed::{embed_cached_images, embed_remote_images};
use crate::images::{process_images, stage_remote_images};
use crate::markdown::to_standalone_html;
use crate::path::{backup_filename, path_for, sanitize_path_segment};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::retry::with_retry;
use crate::settings::BackupSettings;
use crate::tree::PageRecord;
use crate::{BackupArchive, FetchError};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("no pages selected")]
    NoPagesSelected,
    #[error("failed to build archive: {0}")]
    Archive(#[from] ArchiveError),
}

/// Drives one backup: convert, pull images, zip.
#[derive(Clone)]
pub struct BackupRunner {
    exporter: Arc<dyn PageExporter>,
    fetcher: Arc<dyn ImageFetcher>,
    settings: BackupSettings,
}

impl BackupRunner {
    pub fn new(
        exporter: Arc<dyn PageExporter>,
        fetcher: Arc<dyn ImageFetcher>,
        settings: BackupSettings,
    ) -> Self {
        Self {
            exporter,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Empty image cache using the configured TTL.
    pub fn new_cache(&self) -> ImageCache {
        ImageCache::new(self.settings.cache_ttl)
    }

    /// Back up `selected`, resolving folder paths against `all_pages`.
    ///
    /// Pages that fail to convert are left out of the archive and counted in
    /// the page stats; images that fail to download keep their remote URL.
    pub async fn run_backup(
        &self,
        selected: &[PageRecord],
        all_pages: &[PageRecord],
        sink: &dyn ProgressSink,
    ) -> Result<BackupArchive, BackupError> {
        if selected.is_empty() {
            return Err(BackupError::NoPagesSelected);
        }
        backup_info!("Starting backup of {} page(s)", selected.len());

        let jobs: Vec<PageJob> = selected
            .iter()
            .map(|page| PageJob {
                id: page.id.clone(),
                title: page.title.clone(),
                path: path_for(&page.id, all_pages),
            })
            .collect();

        let mut tracker = ProgressTracker::new(sink, jobs.len());
        tracker.converting(0);
        let results = convert_pages(self.exporter.as_ref(), jobs, &self.settings, |settled| {
            tracker.converting(settled)
        })
        .await;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        tracker.record_conversions(results.len() - failed, failed);

        // Image progress is spread over every selected page; failed pages
        // keep their slot.
        let mut archive = ArchiveBuilder::new();
        let page_count = results.len();
        for (index, result) in results.iter().enumerate() {
            if !result.is_ok() {
                backup_warn!(
                    "Skipping page {} in archive: {}",
                    result.title,
                    result.error.as_deref().unwrap_or("unknown error")
                );
                continue;
            }
            tracker.page_started(index, page_count, &result.title);
            let processed = process_images(
                &result.markdown,
                self.fetcher.as_ref(),
                &self.settings.image_dir,
                |image| tracker.image_settled(index, page_count, &result.title, image),
            )
            .await;
            tracker.record_images(processed.stats);

            let folder = if result.path.is_empty() {
                sanitize_path_segment(&result.title)
            } else {
                result.path.join("/")
            };
            archive.add_page(
                &folder,
                &self.settings.document_name,
                &processed.markdown,
                &self.settings.image_dir,
                &processed.images,
            );
        }

        tracker.archive_started();
        let bytes = archive.finish()?;
        tracker.archive_finished();

        let page_stats = tracker.page_stats();
        let image_stats = tracker.image_stats();
        backup_info!(
            "Backup finished: {}/{} page(s), {}/{} image(s), {} bytes",
            page_stats.converted,
            page_stats.total,
            image_stats.downloaded,
            image_stats.total,
            bytes.len()
        );
        Ok(BackupArchive {
            filename: backup_filename(&self.settings.archive_prefix, Utc::now()),
            bytes,
            page_stats,
            image_stats,
        })
    }

    /// Export one page as Markdown with its remote images staged in `cache`.
    pub async fn export_markdown(
        &self,
        page_id: &str,
        cache: &ImageCache,
    ) -> Result<String, FetchError> {
        let markdown =
            with_retry(self.settings.retry, || self.exporter.export_markdown(page_id)).await?;
        Ok(stage_remote_images(&markdown, self.fetcher.as_ref(), cache).await)
    }

    /// Export one page as a self-contained HTML document with every image
    /// inlined.
    pub async fn export_html(
        &self,
        page: &PageRecord,
        cache: &ImageCache,
    ) -> Result<String, FetchError> {
        let markdown = self.export_markdown(&page.id, cache).await?;
        let html = to_standalone_html(&markdown, Some(&page.title));
        let html = embed_cached_images(&html, cache);
        Ok(embed_remote_images(&html, None, self.fetcher.as_ref()).await)
    }
}
