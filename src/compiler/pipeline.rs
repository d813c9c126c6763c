//! Per-unit compilation and hash-gated writes.

use super::{CompileError, CompileErrorKind, StyleOptions, imports, transform::transform};
use crate::manifest::{BuildManifest, CompilationUnit};
use std::fs;

/// Output of one unit's transformation.
#[derive(Debug)]
pub struct CompiledResult {
    pub bytes: Vec<u8>,
    pub hash: blake3::Hash,
}

/// What `write_if_changed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Compile one unit: inline its imports, run the transformation, hash the
/// result. Deterministic for fixed manifest contents and options.
pub fn compile(
    id: &str,
    manifest: &BuildManifest,
    opts: &StyleOptions,
) -> Result<CompiledResult, CompileError> {
    if manifest.source(id).is_none() {
        return Err(CompileError {
            unit: id.to_string(),
            kind: CompileErrorKind::MissingSource,
        });
    }

    let flattened = imports::flatten(id, manifest);
    let bytes = transform(&flattened, opts).map_err(|kind| CompileError {
        unit: id.to_string(),
        kind,
    })?;
    let hash = blake3::hash(&bytes);
    Ok(CompiledResult { bytes, hash })
}

/// Write the compiled bytes unless they match the unit's stored hash.
///
/// The stored hash is lazily seeded from the bytes already on disk, so a
/// fresh invocation over an unchanged tree performs zero writes. The hash
/// is updated only after a successful write.
pub fn write_if_changed(
    unit: &mut CompilationUnit,
    result: &CompiledResult,
) -> Result<WriteOutcome, CompileError> {
    if unit.hash.is_none()
        && let Ok(existing) = fs::read(&unit.output)
    {
        unit.hash = Some(blake3::hash(&existing));
    }

    if unit.hash == Some(result.hash) {
        return Ok(WriteOutcome::Unchanged);
    }

    if let Some(parent) = unit.output.parent() {
        fs::create_dir_all(parent).map_err(|err| io_error(&unit.id, err))?;
    }
    fs::write(&unit.output, &result.bytes).map_err(|err| io_error(&unit.id, err))?;
    unit.hash = Some(result.hash);
    Ok(WriteOutcome::Written)
}

fn io_error(unit: &str, err: std::io::Error) -> CompileError {
    CompileError {
        unit: unit.to_string(),
        kind: CompileErrorKind::Io(err),
    }
}

// =============================================================================
// Tests
// =============================================================================
