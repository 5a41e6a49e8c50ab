use std::sync::mpsc;

use crate::images::ImageProgress;
use crate::{BackupEvent, BackupPhase, BackupProgress, ImageStats, PageStats};

const CONVERT_WEIGHT: f64 = 30.0;
const IMAGE_BASE: f64 = 30.0;
const IMAGE_WEIGHT: f64 = 60.0;
const ARCHIVE_BASE: u8 = 90;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: BackupProgress);
}

/// Sink that drops every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _progress: BackupProgress) {}
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<BackupEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<BackupEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, progress: BackupProgress) {
        let _ = self.tx.send(BackupEvent::Progress(progress));
    }
}

/// Folds the three phases of a backup run into one 0-100 scalar.
///
/// Conversion covers 0-30, image processing 30-90 and archive creation
/// 90-100. Every call emits a full snapshot to the sink.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    page_stats: PageStats,
    image_stats: ImageStats,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink, total_pages: usize) -> Self {
        Self {
            sink,
            page_stats: PageStats {
                total: total_pages,
                ..PageStats::default()
            },
            image_stats: ImageStats::default(),
        }
    }

    pub fn page_stats(&self) -> PageStats {
        self.page_stats
    }

    pub fn image_stats(&self) -> ImageStats {
        self.image_stats
    }

    /// `settled` of the total pages have finished converting.
    pub fn converting(&self, settled: usize) {
        let total = self.page_stats.total;
        let fraction = if total == 0 {
            0.0
        } else {
            settled as f64 / total as f64
        };
        self.emit(
            BackupPhase::Converting,
            settled,
            total,
            None,
            round_percent(fraction * CONVERT_WEIGHT),
            self.image_stats,
        );
    }

    pub fn record_conversions(&mut self, converted: usize, failed: usize) {
        self.page_stats.converted += converted;
        self.page_stats.failed += failed;
    }

    /// Image processing of page `page_index` (zero based) is starting.
    pub fn page_started(&self, page_index: usize, page_count: usize, label: &str) {
        self.emit(
            BackupPhase::DownloadingImages,
            page_index + 1,
            page_count,
            Some(label.to_string()),
            image_phase_percent(page_index, page_count, 0.0),
            self.image_stats,
        );
    }

    /// One image of page `page_index` settled.
    pub fn image_settled(
        &self,
        page_index: usize,
        page_count: usize,
        label: &str,
        image: ImageProgress,
    ) {
        let in_page = if image.total == 0 {
            1.0
        } else {
            image.settled as f64 / image.total as f64
        };
        let stats = ImageStats {
            total: self.image_stats.total + image.total,
            downloaded: self.image_stats.downloaded + image.downloaded,
            failed: self.image_stats.failed + image.failed,
        };
        self.emit(
            BackupPhase::DownloadingImages,
            page_index + 1,
            page_count,
            Some(label.to_string()),
            image_phase_percent(page_index, page_count, in_page),
            stats,
        );
    }

    pub fn record_images(&mut self, stats: ImageStats) {
        self.image_stats.total += stats.total;
        self.image_stats.downloaded += stats.downloaded;
        self.image_stats.failed += stats.failed;
    }

    pub fn archive_started(&self) {
        self.emit(
            BackupPhase::CreatingArchive,
            0,
            1,
            None,
            ARCHIVE_BASE,
            self.image_stats,
        );
    }

    pub fn archive_finished(&self) {
        self.emit(BackupPhase::CreatingArchive, 1, 1, None, 100, self.image_stats);
    }

    fn emit(
        &self,
        phase: BackupPhase,
        current: usize,
        total: usize,
        current_label: Option<String>,
        overall_percent: u8,
        image_stats: ImageStats,
    ) {
        self.sink.emit(BackupProgress {
            phase,
            current,
            total,
            current_label,
            overall_percent,
            image_stats,
            page_stats: self.page_stats,
        });
    }
}

/// `30 + index/count*60 + in_page*(60/count)`, rounded.
pub fn image_phase_percent(page_index: usize, page_count: usize, in_page: f64) -> u8 {
    if page_count == 0 {
        return round_percent(IMAGE_BASE + IMAGE_WEIGHT);
    }
    let count = page_count as f64;
    let base = IMAGE_BASE + (page_index as f64 / count) * IMAGE_WEIGHT;
    round_percent(base + in_page.clamp(0.0, 1.0) * (IMAGE_WEIGHT / count))
}

fn round_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_phase_spans_thirty_to_ninety() {
        assert_eq!(image_phase_percent(0, 4, 0.0), 30);
        assert_eq!(image_phase_percent(1, 4, 0.5), 53);
        assert_eq!(image_phase_percent(3, 4, 1.0), 90);
        assert_eq!(image_phase_percent(0, 0, 0.0), 90);
    }
}
