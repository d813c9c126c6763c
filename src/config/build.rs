//! `[build]` section configuration.
//!
//! Paths and glob patterns driving unit resolution.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in cinder.toml - input/output layout for the pipeline.
///
/// # Example
/// ```toml
/// [build]
/// source = "sass"                  # Stylesheet source directory
/// output = "public/stylesheets"    # Compiled CSS directory
/// patterns = ["**/[!_]*.scss"]     # Ordered glob patterns
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Stylesheet source directory.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Compiled output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Ordered glob patterns expanded against the source directory.
    /// Later patterns may re-match files; first-seen order wins.
    #[serde(default = "defaults::build::patterns")]
    #[educe(Default = defaults::build::patterns())]
    pub patterns: Vec<String>,

    /// Extension of source stylesheets.
    #[serde(default = "defaults::build::source_ext")]
    #[educe(Default = defaults::build::source_ext())]
    pub source_ext: String,

    /// Extension given to compiled outputs.
    #[serde(default = "defaults::build::output_ext")]
    #[educe(Default = defaults::build::output_ext())]
    pub output_ext: String,
}

// ============================================================================
// Tests
// ============================================================================
