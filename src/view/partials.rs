//! `{% include %}` sources, resolved through the store adapter.
//!
//! Partial names are searched over their own location list. Partials are
//! read on every render that includes them, so an edit is visible without
//! evicting the including view.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use liquid::partials::PartialSource;

use super::path::strip_extension;
use super::provider::StoreViewProvider;
use crate::log;
use crate::template::{RenderError, block_on};

#[derive(Clone)]
pub struct ViewPartials {
    provider: Arc<StoreViewProvider>,
    locations: Vec<String>,
}

impl ViewPartials {
    pub fn new(provider: Arc<StoreViewProvider>, locations: Vec<String>) -> Self {
        Self {
            provider,
            locations,
        }
    }

    /// Paths to try for partial `name`, in order.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        let name = name.trim();
        if name.starts_with(['~', '/']) {
            return vec![name.trim_start_matches('~').to_owned()];
        }
        let name = strip_extension(name, self.provider.extension());
        self.locations
            .iter()
            .map(|format| format.replace("{name}", name))
            .collect()
    }

    pub async fn load(&self, name: &str) -> Result<Option<String>, RenderError> {
        for candidate in self.candidates(name) {
            let file = self.provider.fetch(&candidate).await?;
            if file.exists {
                let source =
                    String::from_utf8(file.bytes).map_err(|_| RenderError::InvalidUtf8(candidate))?;
                return Ok(Some(source));
            }
        }
        Ok(None)
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match block_on(self.load(name)).and_then(|loaded| loaded) {
            Ok(source) => source,
            Err(err) => {
                log!("render"; "partial `{}` could not be read: {}", name, err);
                None
            }
        }
    }
}

impl fmt::Debug for ViewPartials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewPartials")
            .field("locations", &self.locations)
            .finish_non_exhaustive()
    }
}

impl PartialSource for ViewPartials {
    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Stored partials are not enumerable.
    fn names(&self) -> Vec<&str> {
        Vec::new()
    }

    fn try_get<'a>(&'a self, name: &str) -> Option<Cow<'a, str>> {
        self.lookup(name).map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ChangeBus;
    use crate::store::{MemoryRepository, Page, Repository};
    use crate::view::cache::TemplateCache;
    use crate::view::file::NullProvider;
    use crate::view::path::VIEW_EXTENSION;

    fn partials(pages: &[(&str, &str)]) -> ViewPartials {
        let repo = Arc::new(MemoryRepository::<Page>::new());
        for (i, (path, body)) in pages.iter().enumerate() {
            repo.insert(Page {
                name: format!("p{i}"),
                path: (*path).to_owned(),
                body: (*body).to_owned(),
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
        ViewPartials::new(
            Arc::new(provider),
            vec![
                "/Partials/{name}.liquid".into(),
                "/Shared/Partials/{name}.liquid".into(),
            ],
        )
    }

    #[test]
    fn test_candidates() {
        let partials = partials(&[]);
        assert_eq!(
            partials.candidates("card.liquid"),
            vec!["/Partials/card.liquid", "/Shared/Partials/card.liquid"]
        );
        assert_eq!(partials.candidates("~/Home/Card"), vec!["/Home/Card"]);
    }

    #[tokio::test]
    async fn test_load_searches_in_order() {
        let partials = partials(&[("/shared/partials/card", "shared"), ("/partials/nav", "nav")]);
        assert_eq!(partials.load("card").await.unwrap().as_deref(), Some("shared"));
        assert_eq!(partials.load("nav").await.unwrap().as_deref(), Some("nav"));
        assert_eq!(partials.load("none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partial_source_from_blocking_thread() {
        let partials = partials(&[("/partials/card", "card")]);
        let found = tokio::task::spawn_blocking(move || {
            (partials.try_get("card").map(Cow::into_owned), partials.contains("none"))
        })
        .await
        .unwrap();
        assert_eq!(found, (Some("card".to_owned()), false));
    }
}
