//! Live view pipeline: resolution, store adapter, cache and rendering.
//!
//! # Module Structure
//!
//! - [`path`] - virtual path normalization
//! - [`file`] - `ViewFile` and the `FileProvider` seam
//! - [`physical`] - fallback provider over the views directory
//! - [`provider`] - store adapter wiring resolutions to the change bus
//! - [`partials`] - `{% include %}` sources over the store adapter
//! - [`cache`] - compiled templates keyed by exact path
//! - [`renderer`] - compile-on-first-access rendering
//! - [`engine`] - view name → path search over configured locations
//!
//! # Flow
//!
//! ```text
//! find_view("Index", Home) ──► exists("/Home/Index.liquid")? ──► Found
//!                                                                  │
//! render("/Home/Index.liquid") ──► cache hit? ──no──► resolve ──► parse ──► publish
//!                                     │yes                                    │
//!                                     └──────────────► execute ◄──────────────┘
//!
//! write path ──► bus.signal("/home/index") ──► evict "/Home/Index.liquid", …
//! ```

pub mod cache;
pub mod engine;
pub mod file;
pub mod partials;
pub mod path;
pub mod physical;
pub mod provider;
pub mod renderer;

pub use cache::{CacheInvalidator, TemplateCache};
pub use engine::{RoutingContext, ViewEngine, ViewLookup};
pub use file::{FileProvider, NullProvider, ViewFile};
pub use path::{VIEW_EXTENSION, normalize};
pub use partials::ViewPartials;
pub use physical::PhysicalProvider;
pub use provider::StoreViewProvider;
pub use renderer::ViewRenderer;
