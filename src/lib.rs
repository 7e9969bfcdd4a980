//! Tessera - live, store-backed liquid views.
//!
//! Page bodies and widgets live in a repository. Views are resolved by
//! name, compiled once, and cached until a write signals their path.
//!
//! # Module Structure
//!
//! - [`signal`] - per-path change tokens
//! - [`store`] - entities, repositories, seeding
//! - [`template`] - liquid parser, render frame, template errors
//! - [`view`] - resolution, store adapter, cache, rendering
//! - [`widget`] - the `render` directive
//! - [`services`] - type-keyed service locator handed to directives
//! - [`pages`] - write path and page view-model
//! - [`app`] - wiring of the above
//! - [`config`], [`cli`], [`serve`], [`watch`], [`logger`] - the binary's surface

pub mod logger;

pub mod app;
pub mod cli;
pub mod config;
pub mod pages;
pub mod serve;
pub mod services;
pub mod signal;
pub mod store;
pub mod template;
pub mod view;
pub mod watch;
pub mod widget;

pub use app::{App, ViewError};
