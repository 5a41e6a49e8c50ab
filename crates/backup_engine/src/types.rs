use std::fmt;

/// Phase of a backup run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    Converting,
    DownloadingImages,
    CreatingArchive,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupPhase::Converting => write!(f, "converting"),
            BackupPhase::DownloadingImages => write!(f, "downloading-images"),
            BackupPhase::CreatingArchive => write!(f, "creating-zip"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
}

/// Complete snapshot of a backup run, re-emitted in full on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupProgress {
    pub phase: BackupPhase,
    pub current: usize,
    pub total: usize,
    pub current_label: Option<String>,
    pub overall_percent: u8,
    pub image_stats: ImageStats,
    pub page_stats: PageStats,
}

/// Outcome of converting one page to Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub page_id: String,
    pub title: String,
    pub path: Vec<String>,
    pub markdown: String,
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Finished archive of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArchive {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_stats: PageStats,
    pub image_stats: ImageStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupEvent {
    Progress(BackupProgress),
    Completed(Result<BackupArchive, String>),
}

/// Image bytes returned by an [`crate::ImageFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedImage {
    /// Mime type without parameters, `application/octet-stream` when unknown.
    pub fn mime_type(&self) -> &str {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or("application/octet-stream")
    }

    /// File extension derived from the content type subtype, `png` when unknown.
    pub fn extension(&self) -> &str {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split('/').nth(1))
            .and_then(|sub| sub.split(';').next())
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("png")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

/// Coarse classification of an HTTP status returned by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Server,
    Other,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => StatusClass::InvalidRequest,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::Forbidden,
            404 => StatusClass::NotFound,
            429 => StatusClass::RateLimited,
            500..=599 => StatusClass::Server,
            _ => StatusClass::Other,
        }
    }
}

impl FailureKind {
    /// Network trouble, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => matches!(
                StatusClass::from_status(*code),
                StatusClass::RateLimited | StatusClass::Server
            ),
            FailureKind::InvalidUrl | FailureKind::TooLarge { .. } | FailureKind::Decode => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
