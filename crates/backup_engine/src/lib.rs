//! Backup engine: page hierarchy, rate-limited conversion, image staging,
//! archive assembly and standalone HTML export.
mod archive;
mod batch;
mod cache;
mod convert;
mod directory;
mod engine;
mod fetch;
mod html_embed;
mod images;
mod markdown;
mod page_id;
mod path;
mod persist;
mod progress;
mod retry;
mod runner;
mod settings;
mod tree;
mod types;

pub use archive::{ArchiveBuilder, ArchiveError, DEFAULT_DOCUMENT_NAME, DEFAULT_IMAGE_DIR};
pub use batch::{convert_batch, convert_batch_with};
pub use cache::{cache_reference, ImageCache, ImageCacheEntry, CACHE_REF_PREFIX, DEFAULT_CACHE_TTL};
pub use convert::{convert_pages, PageExporter, PageJob};
pub use directory::{
    collect_all_pages, DirectoryPage, NotionSearchDirectory, PageDirectory, NOTION_API_BASE,
    NOTION_VERSION,
};
pub use engine::BackupHandle;
pub use fetch::{FetchSettings, ImageFetcher, ProxyMode, ReqwestImageFetcher, PROXY_ENV_VARS};
pub use html_embed::{embed_cached_images, embed_remote_images, EMBED_CONCURRENCY};
pub use images::{
    extract_image_urls, process_images, stage_remote_images, ImageProgress, ProcessedImages,
    StagedImage,
};
pub use markdown::{markdown_to_html_fragment, to_standalone_html, DEFAULT_DOCUMENT_TITLE};
pub use page_id::parse_page_id;
pub use path::{
    backup_filename, path_for, sanitize_path_segment, DEFAULT_ARCHIVE_PREFIX, MAX_SEGMENT_CHARS,
};
pub use persist::{ensure_output_dir, save_archive, AtomicFileWriter, PersistError};
pub use progress::{
    image_phase_percent, ChannelProgressSink, NullProgressSink, ProgressSink, ProgressTracker,
};
pub use retry::{with_retry, RetryPolicy};
pub use runner::{BackupError, BackupRunner};
pub use settings::{BackupSettings, SettingsError, SETTINGS_FILENAME};
pub use tree::{
    build_tree, compare_titles, descendant_ids, find_node, flatten_with_paths, PageIcon, PageNode,
    PageRecord, ParentKind, ParentRef,
};
pub use types::{
    BackupArchive, BackupEvent, BackupPhase, BackupProgress, ConversionResult, FailureKind,
    FetchError, FetchedImage, ImageStats, PageStats, StatusClass,
};
