//! Per-key invocation registry.
//!
//! The host may run one summarization per context (e.g. per browser tab).
//! The registry maps an invocation key to its cancellation token and
//! enforces at-most-one-active-per-key: beginning a key cancels any prior
//! in-flight invocation for it. Each entry also carries the single-slot
//! image cache that chat refinement reuses, overwritten on each new
//! summarization and cleared on cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::types::ImageData;

struct TaskEntry {
    generation: u64,
    token: CancellationToken,
    cached_images: Vec<ImageData>,
}

/// Registry of in-flight summarizations, keyed by invocation context.
#[derive(Default)]
pub struct TaskRegistry {
    entries: Mutex<HashMap<String, TaskEntry>>,
    generations: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Begin an invocation for `key`, cancelling any prior one.
    ///
    /// The returned guard carries the fresh cancellation token; dropping it
    /// removes the entry (unless a newer invocation already replaced it).
    pub fn begin(self: &Arc<Self>, key: &str) -> TaskGuard {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let mut entries = self.entries.lock().unwrap();
        if let Some(prior) = entries.insert(
            key.to_string(),
            TaskEntry {
                generation,
                token: token.clone(),
                cached_images: Vec::new(),
            },
        ) {
            tracing::debug!(key, "cancelling prior invocation for key");
            prior.token.cancel();
        }

        TaskGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            generation,
            token,
        }
    }

    /// Cancel the active invocation for `key`, if any, and clear its image
    /// cache. The entry itself is removed when its guard drops.
    pub fn cancel(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.token.cancel();
            entry.cached_images.clear();
        }
    }

    /// Whether an invocation is registered for `key`.
    pub fn is_active(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Images cached by the last summarization for `key`.
    pub fn cached_images(&self, key: &str) -> Vec<ImageData> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.cached_images.clone())
            .unwrap_or_default()
    }

    fn store_images(&self, key: &str, generation: u64, images: Vec<ImageData>) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            if entry.generation == generation {
                entry.cached_images = images;
            }
        }
    }

    fn remove(&self, key: &str, generation: u64) {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .get(key)
            .map(|e| e.generation == generation)
            .unwrap_or(false)
        {
            entries.remove(key);
        }
    }
}

/// Handle for one registered invocation.
///
/// Created at invocation start; dropping it removes the registry entry, so
/// the lifecycle covers completion, cancellation, and error paths alike.
pub struct TaskGuard {
    registry: Arc<TaskRegistry>,
    key: String,
    generation: u64,
    token: CancellationToken,
}

impl TaskGuard {
    /// The cancellation token to thread through the pipeline.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Store fetched images for later chat refinement. A newer invocation
    /// for the same key silently wins.
    pub fn store_images(&self, images: Vec<ImageData>) {
        self.registry.store_images(&self.key, self.generation, images);
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.key, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> ImageData {
        ImageData {
            base64: name.to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    #[test]
    fn test_second_begin_cancels_first() {
        let registry = TaskRegistry::new();
        let first = registry.begin("tab-1");
        let first_token = first.token();
        assert!(!first_token.is_cancelled());

        let second = registry.begin("tab-1");
        assert!(first_token.is_cancelled());
        assert!(!second.token().is_cancelled());
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let registry = TaskRegistry::new();
        let a = registry.begin("tab-a");
        let _b = registry.begin("tab-b");
        assert!(!a.token().is_cancelled());
    }

    #[test]
    fn test_guard_drop_removes_entry() {
        let registry = TaskRegistry::new();
        {
            let _guard = registry.begin("tab-1");
            assert!(registry.is_active("tab-1"));
        }
        assert!(!registry.is_active("tab-1"));
    }

    #[test]
    fn test_stale_guard_drop_keeps_newer_entry() {
        let registry = TaskRegistry::new();
        let first = registry.begin("tab-1");
        let _second = registry.begin("tab-1");
        drop(first);
        assert!(registry.is_active("tab-1"));
    }

    #[test]
    fn test_image_cache_overwritten_by_new_invocation() {
        let registry = TaskRegistry::new();
        let first = registry.begin("tab-1");
        first.store_images(vec![image("a")]);
        assert_eq!(registry.cached_images("tab-1").len(), 1);

        let _second = registry.begin("tab-1");
        assert!(registry.cached_images("tab-1").is_empty());
        // A stale guard cannot write into the new entry.
        first.store_images(vec![image("b")]);
        assert!(registry.cached_images("tab-1").is_empty());
    }

    #[test]
    fn test_cancel_clears_image_cache() {
        let registry = TaskRegistry::new();
        let guard = registry.begin("tab-1");
        guard.store_images(vec![image("a")]);
        registry.cancel("tab-1");
        assert!(guard.token().is_cancelled());
        assert!(registry.cached_images("tab-1").is_empty());
    }
}
