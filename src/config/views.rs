//! `[views]` section configuration.

use std::path::PathBuf;

use super::defaults;
use crate::template::TemplateOptions;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[views]` section in tessera.toml - view lookup and rendering.
///
/// # Example
/// ```toml
/// [views]
/// root = "Views"                 # physical fallback directory
/// extension = ".liquid"
/// locations = ["/{area}/{controller}/{name}.liquid", "/Shared/{name}.liquid"]
/// partials = ["/Partials/{name}.liquid", "/Shared/Partials/{name}.liquid"]
/// max_widget_depth = 16
/// max_range = 10000
/// home_page = "about"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ViewsConfig {
    /// Directory served when no stored page matches a path.
    #[serde(default = "defaults::views::root")]
    #[educe(Default = defaults::views::root())]
    pub root: PathBuf,

    #[serde(default = "defaults::views::extension")]
    #[educe(Default = defaults::views::extension())]
    pub extension: String,

    /// Ordered path formats. `{name}`, `{controller}` and `{area}` are substituted.
    #[serde(default = "defaults::views::locations")]
    #[educe(Default = defaults::views::locations())]
    pub locations: Vec<String>,

    /// Ordered path formats for `{% include %}` names. Only `{name}` is substituted.
    #[serde(default = "defaults::views::partials")]
    #[educe(Default = defaults::views::partials())]
    pub partials: Vec<String>,

    #[serde(default = "defaults::views::max_widget_depth")]
    #[educe(Default = defaults::views::max_widget_depth())]
    pub max_widget_depth: usize,

    /// Largest literal `(a..b)` range a template may contain.
    #[serde(default = "defaults::views::max_range")]
    #[educe(Default = defaults::views::max_range())]
    pub max_range: u64,

    /// Page rendered at `GET /`.
    #[serde(default = "defaults::views::home_page")]
    #[educe(Default = defaults::views::home_page())]
    pub home_page: String,
}

impl ViewsConfig {
    pub fn template_options(&self) -> TemplateOptions {
        TemplateOptions {
            max_widget_depth: self.max_widget_depth,
            max_range: self.max_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::AppConfig;
    use std::path::PathBuf;

    #[test]
    fn test_views_config_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.views.root, PathBuf::from("Views"));
        assert_eq!(config.views.extension, ".liquid");
        assert_eq!(
            config.views.locations,
            vec!["/{controller}/{name}.liquid", "/Shared/{name}.liquid"]
        );
        assert_eq!(
            config.views.partials,
            vec!["/Partials/{name}.liquid", "/Shared/Partials/{name}.liquid"]
        );
        assert_eq!(config.views.max_widget_depth, 16);
        assert_eq!(config.views.max_range, 10_000);
        assert_eq!(config.views.home_page, "about");
    }

    #[test]
    fn test_views_config_override() {
        let config = r#"
            [views]
            root = "templates"
            locations = ["/{area}/{name}.liquid"]
            partials = ["/Snippets/{name}.liquid"]
            max_widget_depth = 4
        "#;
        let config: AppConfig = toml::from_str(config).unwrap();

        assert_eq!(config.views.root, PathBuf::from("templates"));
        assert_eq!(config.views.locations, vec!["/{area}/{name}.liquid"]);
        assert_eq!(config.views.partials, vec!["/Snippets/{name}.liquid"]);
        assert_eq!(config.views.max_widget_depth, 4);
        assert_eq!(config.views.template_options().max_widget_depth, 4);
        assert_eq!(config.views.extension, ".liquid");
    }
}
