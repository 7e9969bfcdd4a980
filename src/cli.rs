//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live, store-backed liquid views
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root; config, seed and views paths are relative to it
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: tessera.toml)
    #[arg(short = 'C', long, default_value = "tessera.toml")]
    pub config: PathBuf,

    /// Directory of physical fallback views (relative to project root)
    #[arg(long)]
    pub views: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve views over HTTP, picking up page, widget and file edits live
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Resolve one view and render it to stdout
    Render {
        /// View name, e.g. `Index` or `~/Shared/Foo.liquid`
        view: String,

        /// Controller the lookup runs for
        #[arg(long, default_value = "Home")]
        controller: String,

        /// Area the lookup runs for
        #[arg(long)]
        area: Option<String>,

        /// Model as a JSON object
        #[arg(long)]
        model: Option<String>,
    },

    /// Parse every stored page and widget, reporting diagnostics
    Check,
}

#[allow(unused)]
impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_render(&self) -> bool {
        matches!(self.command, Commands::Render { .. })
    }
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse_from([
            "tessera", "-C", "site.toml", "render", "Index", "--controller", "Blog", "--model",
            r#"{"title":"x"}"#,
        ]);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        match cli.command {
            Commands::Render {
                view,
                controller,
                area,
                model,
            } => {
                assert_eq!(view, "Index");
                assert_eq!(controller, "Blog");
                assert!(area.is_none());
                assert_eq!(model.as_deref(), Some(r#"{"title":"x"}"#));
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["tessera", "serve", "-w", "false"]);
        assert!(cli.is_serve());
        assert_eq!(cli.config, PathBuf::from("tessera.toml"));
        assert!(matches!(
            cli.command,
            Commands::Serve {
                port: None,
                watch: Some(false),
                ..
            }
        ));
    }
}
