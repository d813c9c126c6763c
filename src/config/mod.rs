//! Project configuration management for `cinder.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[build]`   | Source/output directories and glob patterns    |
//! | `[style]`   | Comment suppression, output formatting style   |
//! | `[publish]` | URL prefixes for asset-reference rewriting     |
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "sass"
//! output = "public/troydm/stylesheets"
//!
//! [style]
//! suppress_comments = true
//! output = "compact"
//!
//! [publish]
//! http_path = "/troydm/"
//! images = "/troydm/images"
//! fonts = "/troydm/fonts"
//! ```

mod build;
pub mod defaults;
mod error;
mod publish;
mod style;

// Re-export public types used by other modules
pub use publish::join_url;
pub use style::OutputStyle;

// Internal imports used in this module
use build::BuildConfig;
use error::ConfigError;
use publish::PublishConfig;
use style::StyleConfig;

use crate::cli::Cli;
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

/// Root configuration structure representing cinder.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build layout settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Output transformation settings
    #[serde(default)]
    pub style: StyleConfig,

    /// Publishing URL prefixes
    #[serde(default)]
    pub publish: PublishConfig,
}

impl Config {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Get CLI arguments reference
    pub fn get_cli(&self) -> &'static Cli {
        self.cli.unwrap()
    }

    /// Source extension without a leading dot.
    pub fn source_ext(&self) -> &str {
        self.build.source_ext.trim_start_matches('.')
    }

    /// Output extension without a leading dot.
    pub fn output_ext(&self) -> &str {
        self.build.output_ext.trim_start_matches('.')
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        self.set_root(&root);
        self.update_path_with_root(&root);

        // Style overrides shared by build/watch subcommands
        let args = cli.build_args();
        if let Some(style) = args.style {
            self.style.output = style.into();
        }
        Self::update_option(&mut self.style.suppress_comments, args.suppress_comments.as_ref());
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path) {
        let cli = self.get_cli();

        // Apply CLI overrides first
        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        // Normalize root to absolute path
        let root = Self::normalize_path(&expand_tilde(root));
        self.set_root(&root);

        // Normalize config path
        self.config_path = Self::normalize_path(&root.join(&cli.config));

        // Normalize source/output directories (with tilde expansion)
        self.build.source = Self::normalize_path(&root.join(expand_tilde(&self.build.source)));
        self.build.output = Self::normalize_path(&root.join(expand_tilde(&self.build.output)));
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

    /// Validate configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if !self.config_path.exists() {
            bail!("Config file not found");
        }

        if self.build.patterns.is_empty() {
            bail!(ConfigError::Validation(
                "[build.patterns] must have at least one pattern".into()
            ));
        }

        if self.source_ext().is_empty() {
            bail!(ConfigError::Validation(
                "[build.source_ext] must not be empty".into()
            ));
        }

        if self.output_ext().is_empty() {
            bail!(ConfigError::Validation(
                "[build.output_ext] must not be empty".into()
            ));
        }

        if self.publish.http_path.is_empty() {
            bail!(ConfigError::Validation(
                "[publish.http_path] must not be empty".into()
            ));
        }

        Ok(())
    }
}

/// Expand a leading tilde in a path to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(s.as_ref()).into_owned())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        let config_str = r#"
            [build]
            source = "stylesheets"

            [style]
            output = "compact"
        "#;
        let result = Config::from_str(config_str);

        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.build.source, PathBuf::from("stylesheets"));
        assert_eq!(config.style.output, OutputStyle::Compact);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let invalid_config = r#"
            [build
            source = "sass"
        "#;
        let result = Config::from_str(invalid_config);

        assert!(result.is_err());
    }

    #[test]
    fn test_get_root_default() {
        let config = Config::default();
        assert_eq!(config.get_root(), Path::new("./"));
    }

    #[test]
    fn test_set_root() {
        let mut config = Config::default();
        config.set_root(Path::new("/custom/path"));
        assert_eq!(config.get_root(), Path::new("/custom/path"));
    }

    #[test]
    fn test_extension_getters_strip_dots() {
        let config = r#"
            [build]
            source_ext = ".scss"
            output_ext = ".css"
        "#;
        let config: Config = toml::from_str(config).unwrap();

        assert_eq!(config.source_ext(), "scss");
        assert_eq!(config.output_ext(), "css");
    }

    #[test]
    fn test_full_config_all_sections() {
        let config = r#"
            [build]
            source = "sass"
            output = "public/troydm/stylesheets"
            patterns = ["**/[!_]*.scss"]

            [style]
            suppress_comments = true
            output = "compact"

            [publish]
            http_path = "/troydm/"
            images = "/troydm/images"
            fonts = "/troydm/fonts"
        "#;
        let config: Config = toml::from_str(config).unwrap();

        assert_eq!(config.build.source, PathBuf::from("sass"));
        assert!(config.style.suppress_comments);
        assert_eq!(config.style.output, OutputStyle::Compact);
        assert_eq!(config.publish.http_path, "/troydm/");
        assert_eq!(config.publish.images_path(), "/troydm/images");
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.cli.is_none());
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.build.source, PathBuf::from("sass"));
        assert!(!config.style.suppress_comments);
        assert_eq!(config.publish.http_path, "/");
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        let config = r#"
            [unknown_section]
            field = "value"
        "#;
        let result: Result<Config, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
