//! Application configuration management for `tessera.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[store]`   | Seed file and optional database                  |
//! | `[views]`   | Fallback directory, lookup locations, limits     |
//! | `[serve]`   | HTTP surface (port, interface, watch, workers)   |
//!
//! # Example
//!
//! ```toml
//! [store]
//! seed = "seed.toml"
//!
//! [views]
//! root = "Views"
//! locations = ["/{controller}/{name}.liquid", "/Shared/{name}.liquid"]
//!
//! [serve]
//! port = 5277
//! ```

pub mod defaults;
mod error;
mod handle;
mod serve;
mod store;
mod views;

pub use error::ConfigError;
pub use handle::{cfg, init_config};
pub use serve::ServeConfig;
pub use store::StoreConfig;
pub use views::ViewsConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing tessera.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Project root, all relative paths resolve against it (set after loading)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub views: ViewsConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl AppConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `cli.config` under the root, or defaults when the file is absent.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = Self::normalize_path(cli.root.as_deref().unwrap_or(Path::new("./")));
        self.config_path = Self::normalize_path(&root.join(&cli.config));

        Self::update_option(&mut self.views.root, cli.views.as_ref());
        self.views.root = Self::normalize_path(&root.join(&self.views.root));
        if let Some(seed) = &self.store.seed {
            self.store.seed = Some(Self::normalize_path(&root.join(seed)));
        }
        if let Some(database) = &self.store.database {
            self.store.database = Some(Self::normalize_path(&root.join(database)));
        }
        self.root = root;

        if let Commands::Serve {
            interface,
            port,
            watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let views = &self.views;

        if views.locations.is_empty() {
            bail!(ConfigError::Validation(
                "[views.locations] must have at least one element".into()
            ));
        }
        if let Some(location) = views.locations.iter().find(|l| !l.contains("{name}")) {
            bail!(ConfigError::Validation(format!(
                "[views.locations] entry `{location}` has no {{name}} placeholder"
            )));
        }
        if let Some(partial) = views
            .partials
            .iter()
            .find(|p| !p.contains("{name}") || p.contains("{controller}") || p.contains("{area}"))
        {
            bail!(ConfigError::Validation(format!(
                "[views.partials] entry `{partial}` must use {{name}} and nothing else"
            )));
        }
        if !views.extension.starts_with('.') {
            bail!(ConfigError::Validation(
                "[views.extension] must start with `.`".into()
            ));
        }
        if views.max_widget_depth == 0 {
            bail!(ConfigError::Validation(
                "[views.max_widget_depth] must be at least 1".into()
            ));
        }
        if views.max_range == 0 {
            bail!(ConfigError::Validation(
                "[views.max_range] must be at least 1".into()
            ));
        }
        if self.serve.workers == 0 {
            bail!(ConfigError::Validation(
                "[serve.workers] must be at least 1".into()
            ));
        }
        if let Some(seed) = &self.store.seed
            && !seed.is_file()
        {
            bail!(ConfigError::Validation(format!(
                "[store.seed] `{}` not found",
                seed.display()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn validation_message(config: &AppConfig) -> String {
        let err = config.validate().unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Validation(message)) => message.clone(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_str() {
        let config = AppConfig::from_str(
            r#"
            [views]
            home_page = "welcome"
        "#,
        )
        .unwrap();
        assert_eq!(config.views.home_page, "welcome");
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result = AppConfig::from_str("[views\nroot = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        let result = AppConfig::from_str("[build]\noutput = \"public\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_locations() {
        let mut config = AppConfig::default();
        config.views.locations.clear();
        assert!(validation_message(&config).contains("at least one"));

        config.views.locations = vec!["/Shared/Foo.liquid".into()];
        assert!(validation_message(&config).contains("{name}"));
    }

    #[test]
    fn test_validate_partials() {
        let mut config = AppConfig::default();
        config.views.partials = vec!["/Partials/{controller}/{name}.liquid".into()];
        assert!(validation_message(&config).contains("[views.partials]"));

        config.views.partials.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_extension_and_depth() {
        let mut config = AppConfig::default();
        config.views.extension = "liquid".into();
        assert!(validation_message(&config).contains("extension"));

        let mut config = AppConfig::default();
        config.views.max_widget_depth = 0;
        assert!(validation_message(&config).contains("max_widget_depth"));

        let mut config = AppConfig::default();
        config.views.max_range = 0;
        assert!(validation_message(&config).contains("max_range"));
    }

    #[test]
    fn test_update_with_cli_resolves_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::parse_from(["tessera", "--root", root, "serve", "--port", "8080"]);

        let mut config = AppConfig::from_str("[store]\nseed = \"seed.toml\"\n").unwrap();
        config.update_with_cli(&cli);

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.root, root);
        assert_eq!(config.config_path, root.join("tessera.toml"));
        assert_eq!(config.views.root, root.join("Views"));
        assert_eq!(config.store.seed, Some(root.join("seed.toml")));
        assert_eq!(config.serve.port, 8080);
    }

    #[test]
    fn test_load_missing_seed_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tessera.toml"), "[store]\nseed = \"nope.toml\"\n").unwrap();
        let cli = Cli::parse_from(["tessera", "--root", dir.path().to_str().unwrap(), "check"]);

        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("[store.seed]"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cli = Cli::parse_from(["tessera", "--root", dir.path().to_str().unwrap(), "check"]);
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.views.template_options().max_widget_depth, 16);
    }
}
