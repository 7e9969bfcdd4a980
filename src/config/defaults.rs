//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [store] Section Defaults
// ============================================================================

pub mod store {
    use std::path::PathBuf;

    pub fn seed() -> Option<PathBuf> {
        None
    }

    pub fn database() -> Option<PathBuf> {
        None
    }
}

// ============================================================================
// [views] Section Defaults
// ============================================================================

pub mod views {
    use std::path::PathBuf;

    use crate::template::{DEFAULT_MAX_RANGE, DEFAULT_MAX_WIDGET_DEPTH};
    use crate::view::VIEW_EXTENSION;

    pub fn root() -> PathBuf {
        "Views".into()
    }

    pub fn extension() -> String {
        VIEW_EXTENSION.into()
    }

    pub fn locations() -> Vec<String> {
        vec![
            "/{controller}/{name}.liquid".into(),
            "/Shared/{name}.liquid".into(),
        ]
    }

    pub fn partials() -> Vec<String> {
        vec![
            "/Partials/{name}.liquid".into(),
            "/Shared/Partials/{name}.liquid".into(),
        ]
    }

    pub fn max_widget_depth() -> usize {
        DEFAULT_MAX_WIDGET_DEPTH
    }

    pub fn max_range() -> u64 {
        DEFAULT_MAX_RANGE
    }

    pub fn home_page() -> String {
        "about".into()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        5277
    }

    pub fn workers() -> usize {
        4
    }
}
