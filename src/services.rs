//! Type-keyed service locator carried by evaluation contexts.
//!
//! Directives that need a host capability (the `render` widget tag needs a
//! widget source) look it up here by type at render time.
//!
//! ```ignore
//! let services = ServiceLocator::new().with::<Arc<dyn WidgetService>>(widgets);
//! let widgets = services.get::<Arc<dyn WidgetService>>();
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct ServiceLocator {
    services: FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Register `service`, replacing any previous one of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.services.insert(TypeId::of::<T>(), Arc::new(service));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| service.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_lookup_by_type() {
        let services = ServiceLocator::new()
            .with(42_u32)
            .with::<Arc<dyn Greeter>>(Arc::new(English));

        assert_eq!(services.get::<u32>(), Some(&42));
        assert_eq!(services.get::<Arc<dyn Greeter>>().unwrap().greet(), "hello");
        assert!(services.get::<String>().is_none());
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn test_insert_replaces() {
        let mut services = ServiceLocator::new();
        services.insert(1_u32);
        services.insert(2_u32);
        assert_eq!(services.get::<u32>(), Some(&2));
        assert_eq!(services.len(), 1);
    }
}
