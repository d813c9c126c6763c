//! `[publish]` section configuration.
//!
//! URL prefixes stamped into compiled stylesheets when asset helper
//! functions (`image-url`, `font-url`) are rewritten. The prefixes are
//! metadata only; the pipeline never resolves them against the filesystem.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[publish]` section in cinder.toml.
///
/// # Example
/// ```toml
/// [publish]
/// http_path = "/troydm/"
/// images = "/troydm/images"
/// fonts = "/troydm/fonts"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// URL path prefix the compiled site is published under.
    #[serde(default = "defaults::publish::http_path")]
    #[educe(Default = defaults::publish::http_path())]
    pub http_path: String,

    /// URL prefix for `image-url(...)` rewrites.
    /// Defaults to `<http_path>/images`.
    #[serde(default = "defaults::publish::images")]
    #[educe(Default = defaults::publish::images())]
    pub images: Option<String>,

    /// URL prefix for `font-url(...)` rewrites.
    /// Defaults to `<http_path>/fonts`.
    #[serde(default = "defaults::publish::fonts")]
    #[educe(Default = defaults::publish::fonts())]
    pub fonts: Option<String>,
}

impl PublishConfig {
    /// Effective URL prefix for image assets.
    pub fn images_path(&self) -> String {
        self.images
            .clone()
            .unwrap_or_else(|| join_url(&self.http_path, "images"))
    }

    /// Effective URL prefix for font assets.
    pub fn fonts_path(&self) -> String {
        self.fonts
            .clone()
            .unwrap_or_else(|| join_url(&self.http_path, "fonts"))
    }
}

/// Join two URL path segments with exactly one `/` between them.
pub fn join_url(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    format!("{base}/{segment}")
}

// ============================================================================
// Tests
// ============================================================================
