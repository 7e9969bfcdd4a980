//! View resolver: logical view names → virtual paths.
//!
//! | Name shape                 | Example              | Resolution                  |
//! |----------------------------|----------------------|-----------------------------|
//! | application-relative       | `~/Shared/Foo`, `/x` | used as given               |
//! | file-relative              | `Foo.liquid`         | next to the executing view  |
//! | logical                    | `Foo`                | every location, in order    |
//!
//! Location formats substitute `{name}`, `{controller}` and `{area}`. A
//! format needing a routing field the request does not carry is skipped.

use std::sync::Arc;

use super::path::has_extension;
use super::provider::StoreViewProvider;
use crate::template::RenderError;

/// Routing fields available to location formats.
#[derive(Debug, Clone, Default)]
pub struct RoutingContext {
    pub controller: Option<String>,
    pub area: Option<String>,
    /// Path of the view doing the lookup, for file-relative names.
    pub executing_path: Option<String>,
}

impl RoutingContext {
    pub fn controller(controller: impl Into<String>) -> Self {
        Self {
            controller: Some(controller.into()),
            ..Self::default()
        }
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }
}

/// Outcome of a view lookup. A miss is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewLookup {
    Found(String),
    /// Every path tried, in order.
    NotFound(Vec<String>),
}

pub struct ViewEngine {
    provider: Arc<StoreViewProvider>,
    locations: Vec<String>,
}

impl ViewEngine {
    pub fn new(provider: Arc<StoreViewProvider>, locations: Vec<String>) -> Self {
        Self {
            provider,
            locations,
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub async fn find_view(
        &self,
        name: &str,
        routing: &RoutingContext,
    ) -> Result<ViewLookup, RenderError> {
        let candidates = self.candidates(name, routing);
        for candidate in &candidates {
            if self.provider.exists(candidate).await? {
                return Ok(ViewLookup::Found(candidate.clone()));
            }
        }
        Ok(ViewLookup::NotFound(candidates))
    }

    /// Paths to try for `name`, in order.
    pub fn candidates(&self, name: &str, routing: &RoutingContext) -> Vec<String> {
        let name = name.trim();
        if name.starts_with('~') || name.starts_with('/') {
            return vec![name.trim_start_matches('~').to_owned()];
        }
        if has_extension(name, self.provider.extension()) {
            return vec![relative_to(routing.executing_path.as_deref(), name)];
        }

        self.locations
            .iter()
            .filter_map(|format| expand(format, name, routing))
            .collect()
    }
}

/// Substitute routing fields into `format`; `None` if a needed one is absent.
fn expand(format: &str, name: &str, routing: &RoutingContext) -> Option<String> {
    let mut path = format.replace("{name}", name);
    for (placeholder, value) in [
        ("{controller}", routing.controller.as_deref()),
        ("{area}", routing.area.as_deref()),
    ] {
        if path.contains(placeholder) {
            path = path.replace(placeholder, value?);
        }
    }
    Some(path)
}

fn relative_to(executing: Option<&str>, name: &str) -> String {
    let directory = executing
        .and_then(|path| path.rfind('/').map(|i| &path[..=i]))
        .unwrap_or("/");
    format!("{directory}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ChangeBus;
    use crate::store::{MemoryRepository, Page, Repository};
    use crate::view::cache::TemplateCache;
    use crate::view::file::NullProvider;
    use crate::view::path::VIEW_EXTENSION;

    fn engine(paths: &[&str], locations: &[&str]) -> ViewEngine {
        let repo = Arc::new(MemoryRepository::<Page>::new());
        for (i, path) in paths.iter().enumerate() {
            repo.insert(Page {
                name: format!("p{i}"),
                path: (*path).to_owned(),
                body: String::new(),
                ..Page::default()
            })
            .unwrap();
        }
        let provider = StoreViewProvider::new(
            repo,
            Arc::new(ChangeBus::new()),
            Arc::new(NullProvider),
            Arc::new(TemplateCache::new()),
            VIEW_EXTENSION,
        );
        ViewEngine::new(
            Arc::new(provider),
            locations.iter().map(|s| (*s).to_owned()).collect(),
        )
    }

    const LOCATIONS: &[&str] = &["/{area}/{controller}/{name}", "/Shared/{name}"];

    #[tokio::test]
    async fn test_falls_through_to_shared() {
        let engine = engine(&["/shared/foo"], LOCATIONS);

        let with_area = RoutingContext::controller("Home").with_area("Admin");
        assert_eq!(
            engine.find_view("foo", &with_area).await.unwrap(),
            ViewLookup::Found("/Shared/foo".into())
        );
        let without_area = RoutingContext::controller("Blog");
        assert_eq!(
            engine.find_view("foo", &without_area).await.unwrap(),
            ViewLookup::Found("/Shared/foo".into())
        );
    }

    #[tokio::test]
    async fn test_first_location_wins() {
        let engine = engine(&["/admin/home/foo", "/shared/foo"], LOCATIONS);
        let routing = RoutingContext::controller("Home").with_area("Admin");
        assert_eq!(
            engine.find_view("foo", &routing).await.unwrap(),
            ViewLookup::Found("/Admin/Home/foo".into())
        );
    }

    #[tokio::test]
    async fn test_not_found_lists_attempts_in_order() {
        let engine = engine(&[], LOCATIONS);
        let routing = RoutingContext::controller("Home").with_area("Admin");
        assert_eq!(
            engine.find_view("foo", &routing).await.unwrap(),
            ViewLookup::NotFound(vec!["/Admin/Home/foo".into(), "/Shared/foo".into()])
        );
    }

    #[tokio::test]
    async fn test_qualified_names_bypass_locations() {
        let engine = engine(&["/home/index"], LOCATIONS);
        let routing = RoutingContext::controller("Home");

        assert_eq!(
            engine.find_view("~/Home/Index.liquid", &routing).await.unwrap(),
            ViewLookup::Found("/Home/Index.liquid".into())
        );
        assert_eq!(
            engine.find_view("/Home/Nope", &routing).await.unwrap(),
            ViewLookup::NotFound(vec!["/Home/Nope".into()])
        );

        let routing = RoutingContext {
            executing_path: Some("/Home/Layout.liquid".into()),
            ..RoutingContext::default()
        };
        assert_eq!(
            engine.find_view("Index.liquid", &routing).await.unwrap(),
            ViewLookup::Found("/Home/Index.liquid".into())
        );
    }

    #[test]
    fn test_expand_placeholders() {
        let routing = RoutingContext::controller("Home");
        assert_eq!(
            expand("/{controller}/{name}.liquid", "Index", &routing).as_deref(),
            Some("/Home/Index.liquid")
        );
        assert_eq!(expand("/{area}/{name}", "Index", &routing), None);
    }
}
