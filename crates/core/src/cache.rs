use crate::models::{CacheKeyPolicy, Document};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn for_document(document: &Document, policy: CacheKeyPolicy) -> Self {
        match (policy, document.file_name.as_deref()) {
            (CacheKeyPolicy::FileName, Some(name)) => Self(format!("name:{name}")),
            _ => Self(format!("sha256:{}", digest_bytes(&document.bytes))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub struct DocumentCache {
    summaries: Mutex<LruCache<DocumentKey, String>>,
    embeddings: Mutex<LruCache<DocumentKey, Vec<f32>>>,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl DocumentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            summaries: Mutex::new(LruCache::new(capacity)),
            embeddings: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn summary(&self, key: &DocumentKey) -> Option<String> {
        lock(&self.summaries).get(key).cloned()
    }

    pub fn put_summary(&self, key: DocumentKey, summary: String) {
        lock(&self.summaries).put(key, summary);
    }

    pub fn embeddings(
        &self,
        key: &DocumentKey,
        dimension: usize,
        expected_count: usize,
    ) -> Option<Vec<Vec<f32>>> {
        let mut guard = lock(&self.embeddings);
        let flat = guard.get(key)?;
        if dimension == 0 || flat.len() != dimension * expected_count {
            return None;
        }
        Some(flat.chunks_exact(dimension).map(<[f32]>::to_vec).collect())
    }

    pub fn put_embeddings(&self, key: DocumentKey, vectors: &[Vec<f32>]) {
        let flat = vectors.iter().flatten().copied().collect();
        lock(&self.embeddings).put(key, flat);
    }

    pub fn summary_count(&self) -> usize {
        lock(&self.summaries).len()
    }

    pub fn embedding_count(&self) -> usize {
        lock(&self.embeddings).len()
    }
}

// Entries are independent memo values; a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
