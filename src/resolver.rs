//! Path resolution: ordered glob patterns over the source tree.
//!
//! Expands each configured pattern against the source root and produces
//! the build's unit sequence. The sequence is deduplicated by identity in
//! first-seen order, and file enumeration is sorted so the build order is
//! reproducible regardless of filesystem enumeration order.

use crate::manifest::CompilationUnit;
use globset::GlobBuilder;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Fatal resolution failures. Any of these aborts the build before
/// compilation starts.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("source root not found: `{0}`")]
    RootNotFound(PathBuf),

    #[error("invalid glob pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to walk source tree")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read `{0}`")]
    Read(PathBuf, #[source] std::io::Error),
}

/// Identity of a source file: its normalized, forward-slash relative path.
pub fn rel_id(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(segments.join("/"))
}

/// Expand `patterns` against `source_root` into an ordered unit sequence.
///
/// Later patterns may re-match files matched by earlier ones; the result
/// keeps the first-seen position. Zero matches is valid and yields no
/// units. Each matched path maps to `dest_root/<relative>` with the
/// extension replaced by `output_ext`.
pub fn resolve(
    source_root: &Path,
    patterns: &[String],
    dest_root: &Path,
    output_ext: &str,
) -> Result<Vec<CompilationUnit>, ResolutionError> {
    if !source_root.is_dir() {
        return Err(ResolutionError::RootNotFound(source_root.to_path_buf()));
    }

    // Validate every pattern before touching the filesystem
    let matchers = patterns
        .iter()
        .map(|pattern| {
            GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map(|glob| glob.compile_matcher())
                .map_err(|source| ResolutionError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let files = collect_files(source_root)?;

    let mut seen = FxHashSet::default();
    let mut units = Vec::new();
    for matcher in &matchers {
        for rel in &files {
            if matcher.is_match(Path::new(rel)) && seen.insert(rel.clone()) {
                let output = dest_root.join(Path::new(rel)).with_extension(output_ext);
                units.push(CompilationUnit::new(rel.clone(), output));
            }
        }
    }

    Ok(units)
}

/// Collect all regular files under `root` as sorted relative identities.
fn collect_files(root: &Path) -> Result<Vec<String>, ResolutionError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }
        if let Some(rel) = rel_id(entry.path(), root) {
            files.push(rel);
        }
    }
    files.sort();
    Ok(files)
}

// =============================================================================
// Tests
// =============================================================================
