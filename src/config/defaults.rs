//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn source() -> PathBuf {
        "sass".into()
    }

    pub fn output() -> PathBuf {
        "public/stylesheets".into()
    }

    /// The leading `[!_]` keeps underscore-prefixed partials importable
    /// without giving them standalone outputs.
    pub fn patterns() -> Vec<String> {
        vec!["**/[!_]*.scss".into()]
    }

    pub fn source_ext() -> String {
        "scss".into()
    }

    pub fn output_ext() -> String {
        "css".into()
    }
}

// ============================================================================
// [style] Section Defaults
// ============================================================================

pub mod style {
    use super::super::OutputStyle;

    pub fn output() -> OutputStyle {
        OutputStyle::default()
    }
}

// ============================================================================
// [publish] Section Defaults
// ============================================================================

pub mod publish {
    pub fn http_path() -> String {
        "/".into()
    }

    pub fn images() -> Option<String> {
        None
    }

    pub fn fonts() -> Option<String> {
        None
    }
}
