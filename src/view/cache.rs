//! Compiled-template cache keyed by the exact requested path.
//!
//! Entries are replaced or removed wholesale, never mutated. Eviction only
//! happens through [`CacheInvalidator::invalidate`].

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::signal::ChangeToken;
use crate::template::Template;

/// Something that can drop a cached entry by key.
pub trait CacheInvalidator: Send + Sync {
    /// Remove `key`. Returns whether an entry was present.
    fn invalidate(&self, key: &str) -> bool;
}

#[derive(Default)]
pub struct TemplateCache {
    entries: RwLock<FxHashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Template>> {
        self.entries.read().get(key).cloned()
    }

    /// Publish a compiled template for `key`.
    ///
    /// Nothing is published once `token` has fired: the source changed while
    /// the template was being compiled. Invalidation callbacks take the same
    /// write lock, so an entry published here is either skipped or evicted
    /// by the signal that outdates it.
    pub fn publish(&self, key: &str, template: Arc<Template>, token: &ChangeToken) -> bool {
        let mut entries = self.entries.write();
        if token.has_changed() {
            return false;
        }
        entries.insert(key.to_owned(), template);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheInvalidator for TemplateCache {
    fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ChangeBus;
    use crate::template::{TemplateOptions, TemplateParser};

    fn compiled(source: &str) -> Arc<Template> {
        let parser = TemplateParser::new(&TemplateOptions::default()).unwrap();
        Arc::new(parser.parse(source).unwrap())
    }

    #[test]
    fn test_publish_get_invalidate() {
        let bus = ChangeBus::new();
        let cache = TemplateCache::new();
        let token = bus.get_token("/home/index");

        assert!(cache.publish("/Home/Index.liquid", compiled("a"), &token));
        assert!(cache.get("/Home/Index.liquid").is_some());
        // Keys are literal; other spellings are separate entries
        assert!(cache.get("/home/index.liquid").is_none());

        assert!(cache.invalidate("/Home/Index.liquid"));
        assert!(!cache.invalidate("/Home/Index.liquid"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_publish_skipped_after_token_fired() {
        let bus = ChangeBus::new();
        let cache = TemplateCache::new();
        let token = bus.get_token("/home/index");
        bus.signal("/home/index");

        assert!(!cache.publish("/Home/Index.liquid", compiled("stale"), &token));
        assert!(!cache.contains("/Home/Index.liquid"));
    }

    #[test]
    fn test_publish_replaces_whole_entry() {
        let bus = ChangeBus::new();
        let cache = TemplateCache::new();
        let token = bus.get_token("/a");
        let first = compiled("1");
        let second = compiled("2");

        cache.publish("/a", Arc::clone(&first), &token);
        cache.publish("/a", Arc::clone(&second), &token);
        assert!(Arc::ptr_eq(&cache.get("/a").unwrap(), &second));
        // Holders of the old entry keep a valid template
        assert_eq!(Arc::strong_count(&first), 1);
    }
}
