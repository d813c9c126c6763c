//! `[style]` section configuration.
//!
//! The two knobs of the output transformation: comment suppression and
//! the output formatting style.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

// ============================================================================
// Enums
// ============================================================================

/// Output formatting style for compiled stylesheets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Indented, one declaration per line (default).
    #[default]
    Readable,
    /// Whitespace-eliding single-line output.
    Compact,
}

// ============================================================================
// StyleConfig
// ============================================================================

/// `[style]` section in cinder.toml.
///
/// # Example
/// ```toml
/// [style]
/// suppress_comments = true
/// output = "compact"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Drop `//` line comments instead of passing them through
    /// as `/* ... */` in the output.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub suppress_comments: bool,

    /// Output formatting style.
    #[serde(default = "defaults::style::output")]
    #[educe(Default = defaults::style::output())]
    pub output: OutputStyle,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::Config;
    use super::*;

    #[test]
    fn test_style_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert!(!config.style.suppress_comments);
        assert_eq!(config.style.output, OutputStyle::Readable);
    }

    #[test]
    fn test_style_parsing() {
        let config = r#"
            [style]
            suppress_comments = true
            output = "compact"
        "#;
        let config: Config = toml::from_str(config).unwrap();

        assert!(config.style.suppress_comments);
        assert_eq!(config.style.output, OutputStyle::Compact);
    }

    #[test]
    fn test_style_invalid_output_rejection() {
        let config = r#"
            [style]
            output = "compressed"
        "#;
        let result: Result<Config, _> = toml::from_str(config);
        assert!(result.is_err());
    }

    #[test]
    fn test_style_unknown_field_rejection() {
        let config = r#"
            [style]
            unknown = "field"
        "#;
        let result: Result<Config, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
