//! Composition root: one [`App`] owns every pipeline component.
//!
//! ```text
//! Stores ──► StoreViewProvider ──► ViewRenderer ──► TemplateCache
//!   │              │    ▲ fallback: PhysicalProvider([views].root)
//!   │              │    └── ViewPartials ({% include %})
//!   │              ▼
//!   └──► PageService ──► ChangeBus
//! ```

use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;

use crate::config::{AppConfig, ViewsConfig};
use crate::log;
use crate::pages::PageService;
use crate::services::ServiceLocator;
use crate::signal::ChangeBus;
use crate::store::{Page, StoreError, Stores};
use crate::template::{Diagnostic, ParseError, RenderError, TemplateParser, Value};
use crate::view::{
    FileProvider, PhysicalProvider, RoutingContext, StoreViewProvider, TemplateCache, ViewEngine,
    ViewLookup, ViewPartials, ViewRenderer,
};
use crate::widget::{StoreWidgetService, WidgetService};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view `{name}` was not found, searched: {}", .searched.join(", "))]
    NotFound { name: String, searched: Vec<String> },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One template that failed to parse during [`App::check`].
#[derive(Debug, Clone)]
pub struct CheckFailure {
    /// `page /home/index` or `widget greet`
    pub subject: String,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct App {
    stores: Stores,
    bus: Arc<ChangeBus>,
    provider: Arc<StoreViewProvider>,
    parser: Arc<TemplateParser>,
    renderer: ViewRenderer,
    engine: ViewEngine,
    pages: PageService,
    services: Arc<ServiceLocator>,
}

impl App {
    /// Wire the pipeline over `stores`, falling back to `fallback` for
    /// paths no stored page matches.
    pub fn new(
        stores: Stores,
        fallback: Arc<dyn FileProvider>,
        views: &ViewsConfig,
    ) -> Result<Self, ParseError> {
        let bus = Arc::new(ChangeBus::new());
        let cache = Arc::new(TemplateCache::new());
        let provider = Arc::new(StoreViewProvider::new(
            Arc::clone(&stores.pages),
            Arc::clone(&bus),
            fallback,
            cache.clone(),
            views.extension.clone(),
        ));

        let options = views.template_options();
        let partials = ViewPartials::new(Arc::clone(&provider), views.partials.clone());
        let parser = Arc::new(TemplateParser::with_partials(partials, &options)?);

        let renderer = ViewRenderer::new(Arc::clone(&provider), cache, Arc::clone(&parser), options);
        let engine = ViewEngine::new(Arc::clone(&provider), views.locations.clone());
        let pages = PageService::new(
            Arc::clone(&stores.pages),
            Arc::clone(&stores.widgets),
            Arc::clone(&bus),
            views.extension.clone(),
        );

        let widgets: Arc<dyn WidgetService> =
            Arc::new(StoreWidgetService::new(Arc::clone(&stores.widgets)));
        let services = Arc::new(ServiceLocator::new().with(widgets));

        Ok(Self {
            stores,
            bus,
            provider,
            parser,
            renderer,
            engine,
            pages,
            services,
        })
    }

    /// Build from config: open the stores, seed them, and root the
    /// fallback provider at `[views].root`.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let stores = open_stores(config)?;
        if let Some(seed) = &config.store.seed {
            let inserted = stores.seed_from_path(seed, &config.views.extension)?;
            log!("store"; "seeded {} row(s) from {}", inserted, seed.display());
        }
        let fallback = Arc::new(PhysicalProvider::new(&config.views.root));
        Self::new(stores, fallback, &config.views).context("Failed to build the template parser")
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    pub fn provider(&self) -> &StoreViewProvider {
        &self.provider
    }

    pub fn renderer(&self) -> &ViewRenderer {
        &self.renderer
    }

    pub fn engine(&self) -> &ViewEngine {
        &self.engine
    }

    pub fn pages(&self) -> &PageService {
        &self.pages
    }

    pub fn services(&self) -> &Arc<ServiceLocator> {
        &self.services
    }

    /// Resolve `name` for `routing` and render it against `model`.
    pub async fn render_view(
        &self,
        name: &str,
        routing: &RoutingContext,
        model: Value,
    ) -> Result<String, ViewError> {
        let path = match self.engine.find_view(name, routing).await? {
            ViewLookup::Found(path) => path,
            ViewLookup::NotFound(searched) => {
                return Err(ViewError::NotFound {
                    name: name.to_owned(),
                    searched,
                });
            }
        };
        let html = self
            .renderer
            .render_to_string(&path, model, Some(Arc::clone(&self.services)))
            .await?;
        Ok(html)
    }

    /// Parse every active page and widget, collecting the ones that fail.
    pub fn check(&self) -> (usize, Vec<CheckFailure>) {
        let mut checked = 0;
        let mut failures = Vec::new();
        let mut check = |subject: String, source: &str| {
            checked += 1;
            if let Err(err) = self.parser.parse(source) {
                failures.push(CheckFailure {
                    subject,
                    diagnostics: err.diagnostics,
                });
            }
        };

        for page in self.stores.pages.all().iter().filter(|p| p.status.is_active()) {
            check(format!("page {}", page.path), &page.body);
        }
        for widget in self.stores.widgets.all().iter().filter(|w| w.status.is_active()) {
            check(format!("widget {}", widget.name), &widget.content);
        }
        (checked, failures)
    }

    /// Active page named `name`.
    pub async fn page(&self, name: &str) -> Option<Page> {
        self.pages.page_by_name(name).await
    }
}

#[cfg(feature = "persist")]
fn open_stores(config: &AppConfig) -> Result<Stores, StoreError> {
    match &config.store.database {
        Some(path) => Stores::open_database(path),
        None => Ok(Stores::in_memory()),
    }
}

#[cfg(not(feature = "persist"))]
fn open_stores(config: &AppConfig) -> Result<Stores, StoreError> {
    if let Some(path) = &config.store.database {
        log!("store"; "`persist` feature disabled, ignoring database {}", path.display());
    }
    Ok(Stores::in_memory())
}
