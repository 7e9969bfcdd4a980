//! Write path for pages and widgets, and the page view-model.
//!
//! Every page write signals the change bus for the page's normalized path,
//! which evicts any cached view served from it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::log;
use crate::signal::ChangeBus;
use crate::store::{EntityStatus, Page, Repository, StoreError, Widget, now};
use crate::view::normalize;

/// Body of `POST /Home/AddOrUpdateLiquid`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LiquidPageRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub path: String,
}

/// Body of `POST /Home/AddOrUpdateWidget`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WidgetRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{0} is required")]
    Validation(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn require(value: &str, field: &'static str) -> Result<(), WriteError> {
    if value.trim().is_empty() {
        return Err(WriteError::Validation(field));
    }
    Ok(())
}

pub struct PageService {
    pages: Arc<dyn Repository<Page>>,
    widgets: Arc<dyn Repository<Widget>>,
    bus: Arc<ChangeBus>,
    extension: String,
}

impl PageService {
    pub fn new(
        pages: Arc<dyn Repository<Page>>,
        widgets: Arc<dyn Repository<Widget>>,
        bus: Arc<ChangeBus>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            pages,
            widgets,
            bus,
            extension: extension.into(),
        }
    }

    /// Insert a page named `request.name`, or replace its body.
    ///
    /// Both branches signal the normalized request path. An update whose
    /// stored path differs also signals the stored path, since that is where
    /// the edited body is served from.
    pub async fn add_or_update(&self, request: LiquidPageRequest) -> Result<Page, WriteError> {
        require(&request.name, "Name")?;
        require(&request.content, "Content")?;
        require(&request.path, "Path")?;

        let path = normalize(&request.path, &self.extension);
        let existing = self
            .pages
            .get_async(&|page: &Page| page.name == request.name)
            .await;

        let page = match existing {
            None => {
                let page = self.pages.insert(Page {
                    name: request.name,
                    path: path.clone(),
                    body: request.content,
                    status: EntityStatus::Active,
                    created_at: now(),
                    ..Page::default()
                })?;
                log!("store"; "added page `{}` at {}", page.name, page.path);
                page
            }
            Some(mut page) => {
                page.body = request.content;
                page.updated_at = Some(now());
                self.pages.update(page.clone())?;
                if page.path != path {
                    self.bus.signal(&page.path);
                }
                page
            }
        };

        self.bus.signal(&path);
        Ok(page)
    }

    /// Insert a widget named `request.name`, or replace its content.
    ///
    /// No signal is needed: `render` directives re-parse a widget whose
    /// content fingerprint changed.
    pub async fn add_or_update_widget(&self, request: WidgetRequest) -> Result<Widget, WriteError> {
        require(&request.name, "Name")?;
        require(&request.content, "Content")?;

        let existing = self
            .widgets
            .get_async(&|widget: &Widget| widget.name == request.name)
            .await;

        match existing {
            None => Ok(self.widgets.insert(Widget {
                name: request.name,
                content: request.content,
                status: EntityStatus::Active,
                created_at: now(),
                ..Widget::default()
            })?),
            Some(mut widget) => {
                widget.content = request.content;
                widget.updated_at = Some(now());
                self.widgets.update(widget.clone())?;
                Ok(widget)
            }
        }
    }

    /// Active page named `name`.
    pub async fn page_by_name(&self, name: &str) -> Option<Page> {
        self.pages
            .get_async(&|page: &Page| page.name == name && page.status.is_active())
            .await
    }
}

/// View-model handed to the home view: `{{ Name }}`, `{{ Path }}`, `{{ Content }}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageModel {
    pub name: String,
    pub path: String,
    pub content: String,
}

impl From<&Page> for PageModel {
    fn from(page: &Page) -> Self {
        Self {
            name: page.name.clone(),
            path: page.path.clone(),
            content: page.body.clone(),
        }
    }
}
