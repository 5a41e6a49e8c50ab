//! In-memory image cache with lazy TTL eviction.
//!
//! Staged images are stored under fresh UUIDs, so writers never collide and a
//! single mutex around the map is enough. Expired entries are dropped the
//! first time a lookup finds them stale.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use uuid::Uuid;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Prefix of the local reference written into markdown for cached images.
pub const CACHE_REF_PREFIX: &str = "/api/image-cache?id=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCacheEntry {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct ImageCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, ImageCacheEntry>>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ImageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store an image under a freshly generated id and return the id.
    pub fn insert(&self, bytes: Vec<u8>, mime_type: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = ImageCacheEntry {
            bytes,
            mime_type: mime_type.into(),
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().insert(id.clone(), entry);
        id
    }

    /// Live entry for `id`; a stale entry is evicted and reported as a miss.
    pub fn get(&self, id: &str) -> Option<ImageCacheEntry> {
        let mut entries = self.lock();
        let expired = match entries.get(id) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(id);
        }
        None
    }

    /// `data:<mime>;base64,<payload>` for a live entry.
    pub fn data_uri(&self, id: &str) -> Option<String> {
        self.get(id)
            .map(|entry| format!("data:{};base64,{}", entry.mime_type, STANDARD.encode(&entry.bytes)))
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ImageCacheEntry>> {
        // Inserts and removals are single calls, so a poisoned map is intact.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn cache_reference(id: &str) -> String {
    format!("{CACHE_REF_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_entry_is_returned() {
        let cache = ImageCache::default();
        let id = cache.insert(vec![1, 2, 3], "image/png");
        let entry = cache.get(&id).unwrap();
        assert_eq!(entry.bytes, vec![1, 2, 3]);
        assert_eq!(entry.mime_type, "image/png");
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let cache = ImageCache::new(Duration::ZERO);
        let id = cache.insert(vec![1], "image/gif");
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn ids_are_unique_per_insert() {
        let cache = ImageCache::default();
        let a = cache.insert(vec![0], "image/png");
        let b = cache.insert(vec![0], "image/png");
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn data_uri_is_base64_encoded() {
        let cache = ImageCache::default();
        let id = cache.insert(b"abc".to_vec(), "image/png");
        assert_eq!(cache.data_uri(&id).unwrap(), "data:image/png;base64,YWJj");
        assert!(cache.data_uri("missing").is_none());
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let cache = ImageCache::new(Duration::ZERO);
        cache.insert(vec![1], "image/png");
        cache.insert(vec![2], "image/png");
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }
}
