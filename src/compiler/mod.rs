//! Stylesheet compilation pipeline.
//!
//! This module owns everything between a resolved unit and its written
//! output:
//!
//! - **scan**: comment/string-aware lexical scanning
//! - **imports**: splicing resolvable `@import` targets into the source
//! - **transform**: the deterministic parse/emit transformation
//! - **assets**: `image-url()`/`font-url()` rewriting
//! - **pipeline**: per-unit compile + hash-gated writes
//!
//! # Compile Flow
//!
//! ```text
//! flatten() ──► transform() ──► write_if_changed()
//!     │             │                  │
//!     ▼             ▼                  ▼
//! inlined src   CSS bytes        output file (skipped
//!                                when hash matches)
//! ```

pub mod assets;
pub mod imports;
pub mod pipeline;
pub mod scan;
pub mod transform;

// ============================================================================
// Public API
// ============================================================================

pub use pipeline::{CompiledResult, WriteOutcome, compile, write_if_changed};

use crate::config::{Config, OutputStyle};
use scan::ScanError;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Per-unit compilation failure. Non-fatal: collected and reported at the
/// end of the build while the remaining units continue.
#[derive(Debug, Error)]
#[error("{unit}: {kind}")]
pub struct CompileError {
    pub unit: String,
    pub kind: CompileErrorKind,
}

/// What went wrong while compiling one unit.
#[derive(Debug, Error)]
pub enum CompileErrorKind {
    #[error("unterminated comment (line {0})")]
    UnterminatedComment(u32),

    #[error("unterminated string (line {0})")]
    UnterminatedString(u32),

    #[error("unbalanced parenthesis (line {0})")]
    UnbalancedParen(u32),

    #[error("unexpected `}}` (line {0})")]
    UnexpectedCloseBrace(u32),

    #[error("unclosed block opened on line {0}")]
    UnclosedBlock(u32),

    #[error("selector expected before `{{` (line {0})")]
    MissingSelector(u32),

    #[error("declaration outside a block (line {0})")]
    TopLevelDeclaration(u32),

    #[error("source not present in manifest")]
    MissingSource,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ScanError> for CompileErrorKind {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::UnterminatedComment(line) => Self::UnterminatedComment(line),
            ScanError::UnterminatedString(line) => Self::UnterminatedString(line),
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Configuration snapshot controlling the transformation.
///
/// `transform` is a pure function of (content, options); identical inputs
/// under identical options always produce identical bytes.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub suppress_comments: bool,
    pub output: OutputStyle,
    pub images_path: String,
    pub fonts_path: String,
}

impl StyleOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            suppress_comments: config.style.suppress_comments,
            output: config.style.output,
            images_path: config.publish.images_path(),
            fonts_path: config.publish.fonts_path(),
        }
    }
}

#[cfg(test)]
impl StyleOptions {
    /// Test fixture with the given output style.
    pub fn with_style(output: OutputStyle) -> Self {
        Self {
            suppress_comments: false,
            output,
            images_path: "/images".into(),
            fonts_path: "/fonts".into(),
        }
    }
}
