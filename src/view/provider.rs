//! Store-backed view provider.
//!
//! Resolves a virtual path to a stored page body, falling back to a
//! secondary provider. Every hit is wired to the change bus so that firing
//! the normalized path evicts each exact cache key it was served under.
//!
//! ```text
//! resolve("/Home/Index.liquid")
//!   normalize ──► "/home/index" ──► pages.get_async(path == …)
//!                     │                 │ miss ──► fallback.get_file(..)
//!                     ▼                 ▼
//!          index["/home/index"] += "/Home/Index.liquid"
//!          bus.get_token("/home/index").register(evict all indexed keys)
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::cache::CacheInvalidator;
use super::file::{FileProvider, ViewFile};
use super::path::normalize;
use crate::log;
use crate::signal::{ChangeBus, ChangeToken};
use crate::store::{Page, Repository};
use crate::template::RenderError;

/// Exact keys served for one normalized path, and the token generation
/// an eviction callback is registered on.
#[derive(Default)]
struct Served {
    keys: FxHashSet<String>,
    token_id: Option<u64>,
}

type ServedIndex = Arc<Mutex<FxHashMap<String, Served>>>;

pub struct StoreViewProvider {
    pages: Arc<dyn Repository<Page>>,
    bus: Arc<ChangeBus>,
    fallback: Arc<dyn FileProvider>,
    invalidator: Arc<dyn CacheInvalidator>,
    extension: String,
    index: ServedIndex,
}

impl StoreViewProvider {
    pub fn new(
        pages: Arc<dyn Repository<Page>>,
        bus: Arc<ChangeBus>,
        fallback: Arc<dyn FileProvider>,
        invalidator: Arc<dyn CacheInvalidator>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            pages,
            bus,
            fallback,
            invalidator,
            extension: extension.into(),
            index: Arc::default(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn normalize(&self, path: &str) -> String {
        normalize(path, &self.extension)
    }

    async fn find_page(&self, normalized: &str) -> Option<Page> {
        self.pages
            .get_async(&|page: &Page| page.path == normalized && page.status.is_active())
            .await
    }

    /// Resolve `path`, tracking it for invalidation when it exists.
    pub async fn resolve(&self, path: &str) -> Result<ViewFile, RenderError> {
        let normalized = self.normalize(path);

        // Taken before the read: an edit signalled while reading fires this
        // token, so the stale result is never published
        let token = self.bus.get_token(&normalized);
        let file = self.read(path, &normalized).await?;
        if !file.exists {
            return Ok(file);
        }

        self.track(path, &normalized, &token);
        Ok(file.with_token(token))
    }

    /// Read `path` without tracking it.
    pub async fn fetch(&self, path: &str) -> Result<ViewFile, RenderError> {
        self.read(path, &self.normalize(path)).await
    }

    async fn read(&self, path: &str, normalized: &str) -> Result<ViewFile, RenderError> {
        match self.find_page(normalized).await {
            Some(page) => Ok(ViewFile::found(
                page.body.into_bytes(),
                Some(page.updated_at.unwrap_or(page.created_at)),
            )),
            None => self.fallback.get_file(path).await,
        }
    }

    /// Existence check without tracking, for the view resolver.
    pub async fn exists(&self, path: &str) -> Result<bool, RenderError> {
        let normalized = self.normalize(path);
        if self.find_page(&normalized).await.is_some() {
            return Ok(true);
        }
        self.fallback.exists(path).await
    }

    /// Exact keys currently tracked for `normalized`.
    pub fn tracked_keys(&self, normalized: &str) -> Vec<String> {
        let index = self.index.lock();
        let mut keys: Vec<String> = index
            .get(normalized)
            .map(|served| served.keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    fn track(&self, key: &str, normalized: &str, token: &ChangeToken) {
        {
            let mut index = self.index.lock();
            let served = index.entry(normalized.to_owned()).or_default();
            served.keys.insert(key.to_owned());
            if served.token_id == Some(token.id()) {
                return;
            }
            served.token_id = Some(token.id());
        }

        // Registered outside the lock: a token that already fired runs the
        // callback inline, and the callback takes the lock itself.
        let index = Arc::clone(&self.index);
        let invalidator = Arc::clone(&self.invalidator);
        let normalized = normalized.to_owned();
        token.register(move || {
            let keys = index
                .lock()
                .remove(&normalized)
                .map(|served| served.keys)
                .unwrap_or_default();
            let evicted = keys.iter().filter(|key| invalidator.invalidate(key)).count();
            if evicted > 0 {
                log!("store"; "{} changed, evicted {} cached view(s)", normalized, evicted);
            }
        });
    }
}
