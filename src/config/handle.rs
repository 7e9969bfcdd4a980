//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads from request handlers and the
//! watcher thread.
//!
//! ```ignore
//! use crate::config::cfg;
//!
//! let c = cfg();
//! let port = c.serve.port;  // Arc auto-derefs to &AppConfig
//! ```

use super::AppConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Initialized with the default config, then replaced with the loaded one in main.
static CONFIG: LazyLock<ArcSwap<AppConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(AppConfig::default()));

/// Current config. Wait-free.
#[inline]
pub fn cfg() -> Arc<AppConfig> {
    CONFIG.load_full()
}

/// Install the loaded config (called once at startup).
#[inline]
pub fn init_config(config: AppConfig) {
    CONFIG.store(Arc::new(config));
}
