//! `[store]` section configuration.

use std::path::PathBuf;

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[store]` section in tessera.toml - where pages and widgets come from.
///
/// # Example
/// ```toml
/// [store]
/// seed = "seed.toml"
/// database = "tessera.redb"  # only with the `persist` feature
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// TOML file of `[[pages]]`, `[[layouts]]` and `[[widgets]]` loaded at startup.
    #[serde(default = "defaults::store::seed")]
    #[educe(Default = defaults::store::seed())]
    pub seed: Option<PathBuf>,

    /// Embedded database file. Without it, stores live in memory.
    #[serde(default = "defaults::store::database")]
    #[educe(Default = defaults::store::database())]
    pub database: Option<PathBuf>,
}
