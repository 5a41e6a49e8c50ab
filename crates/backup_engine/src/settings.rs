use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backup_logging::{backup_info, backup_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{DEFAULT_DOCUMENT_NAME, DEFAULT_IMAGE_DIR};
use crate::cache::DEFAULT_CACHE_TTL;
use crate::fetch::{FetchSettings, ProxyMode};
use crate::path::DEFAULT_ARCHIVE_PREFIX;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::retry::RetryPolicy;

pub const SETTINGS_FILENAME: &str = "backup_settings.ron";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write settings: {0}")]
    Persist(#[from] PersistError),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Knobs of one backup run.
#[derive(Debug, Clone)]
pub struct BackupSettings {
    /// Pages converted at the same time.
    pub concurrency: usize,
    /// Pause between conversion batches.
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
    pub fetch: FetchSettings,
    pub archive_prefix: String,
    pub document_name: String,
    pub image_dir: String,
    pub cache_ttl: Duration,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            concurrency: 3,
            batch_delay: Duration::from_millis(350),
            retry: RetryPolicy::default(),
            fetch: FetchSettings::default(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// On-disk shape. Every field is optional and falls back to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    concurrency: Option<usize>,
    batch_delay_ms: Option<u64>,
    max_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    max_image_bytes: Option<u64>,
    proxy: Option<String>,
    relay: Option<String>,
    archive_prefix: Option<String>,
    cache_ttl_secs: Option<u64>,
}

impl BackupSettings {
    /// Defaults with the outbound proxy taken from the environment.
    pub fn from_env() -> Self {
        Self {
            fetch: FetchSettings::from_env(),
            ..Self::default()
        }
    }

    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        let file: SettingsFile = ron::from_str(text)?;
        Self::from_file(file, Self::from_env())
    }

    /// Read `{dir}/backup_settings.ron`; a missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let path = dir.join(SETTINGS_FILENAME);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                backup_info!("No settings file at {:?}, using defaults", path);
                return Ok(Self::from_env());
            }
            Err(err) => return Err(err.into()),
        };
        let settings = Self::from_ron_str(&text)?;
        backup_info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Write the overridable fields to `{dir}/backup_settings.ron`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, SettingsError> {
        let (proxy, relay) = match &self.fetch.proxy {
            ProxyMode::Direct => (None, None),
            ProxyMode::Forward(url) => (Some(url.clone()), None),
            ProxyMode::Relay(url) => (None, Some(url.clone())),
        };
        let file = SettingsFile {
            concurrency: Some(self.concurrency),
            batch_delay_ms: Some(millis(self.batch_delay)),
            max_attempts: Some(self.retry.max_attempts),
            retry_base_delay_ms: Some(millis(self.retry.base_delay)),
            request_timeout_ms: Some(millis(self.fetch.request_timeout)),
            max_image_bytes: Some(self.fetch.max_bytes),
            proxy,
            relay,
            archive_prefix: Some(self.archive_prefix.clone()),
            cache_ttl_secs: Some(self.cache_ttl.as_secs()),
        };
        let content = ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::new())?;
        let path = AtomicFileWriter::new(dir.to_path_buf()).write(SETTINGS_FILENAME, content.as_bytes())?;
        Ok(path)
    }

    fn from_file(file: SettingsFile, mut base: Self) -> Result<Self, SettingsError> {
        if let Some(concurrency) = file.concurrency {
            if concurrency == 0 {
                return Err(SettingsError::Invalid {
                    field: "concurrency",
                    reason: "must be at least 1".into(),
                });
            }
            base.concurrency = concurrency;
        }
        if let Some(ms) = file.batch_delay_ms {
            base.batch_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = file.max_attempts {
            base.retry.max_attempts = attempts;
        }
        if let Some(ms) = file.retry_base_delay_ms {
            base.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.request_timeout_ms {
            base.fetch.request_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = file.max_image_bytes {
            base.fetch.max_bytes = max;
        }
        match (file.proxy, file.relay) {
            (Some(_), Some(_)) => {
                return Err(SettingsError::Invalid {
                    field: "relay",
                    reason: "proxy and relay are mutually exclusive".into(),
                });
            }
            (Some(proxy), None) => base.fetch.proxy = ProxyMode::Forward(proxy),
            (None, Some(relay)) => base.fetch.proxy = ProxyMode::Relay(relay),
            (None, None) => {}
        }
        if let Some(prefix) = file.archive_prefix {
            if prefix.trim().is_empty() {
                backup_warn!("Ignoring empty archive prefix");
            } else {
                base.archive_prefix = prefix;
            }
        }
        if let Some(secs) = file.cache_ttl_secs {
            base.cache_ttl = Duration::from_secs(secs);
        }
        Ok(base)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
