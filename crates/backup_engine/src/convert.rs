use backup_logging::{backup_info, backup_warn};

use crate::batch::convert_batch_with;
use crate::retry::with_retry;
use crate::settings::BackupSettings;
use crate::{ConversionResult, FetchError};

/// Remote service that renders one page as Markdown.
#[async_trait::async_trait]
pub trait PageExporter: Send + Sync {
    async fn export_markdown(&self, page_id: &str) -> Result<String, FetchError>;
}

/// A page queued for conversion together with its resolved folder path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageJob {
    pub id: String,
    pub title: String,
    pub path: Vec<String>,
}

/// Convert every job through `exporter`, honoring the configured concurrency
/// cap and inter-batch delay. Each export is retried per the retry policy; an
/// export that still fails yields a result with an error and an empty body.
pub async fn convert_pages<P>(
    exporter: &dyn PageExporter,
    jobs: Vec<PageJob>,
    settings: &BackupSettings,
    on_batch: P,
) -> Vec<ConversionResult>
where
    P: FnMut(usize),
{
    let total = jobs.len();
    let retry = settings.retry;
    let results = convert_batch_with(
        jobs,
        settings.concurrency,
        settings.batch_delay,
        move |job: PageJob| async move {
            let outcome = with_retry(retry, || exporter.export_markdown(&job.id)).await;
            match outcome {
                Ok(markdown) => ConversionResult {
                    page_id: job.id,
                    title: job.title,
                    path: job.path,
                    markdown,
                    error: None,
                },
                Err(err) => {
                    backup_warn!("Failed to convert page {} ({}): {}", job.id, job.title, err);
                    ConversionResult {
                        page_id: job.id,
                        title: job.title,
                        path: job.path,
                        markdown: String::new(),
                        error: Some(err.to_string()),
                    }
                }
            }
        },
        on_batch,
    )
    .await;

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    backup_info!("Converted {} page(s), {} failed", total - failed, failed);
    results
}
