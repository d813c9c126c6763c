//! Per-invocation build state.
//!
//! The [`BuildManifest`] is an explicit value constructed at the start of
//! every build invocation and passed by reference into each phase; there
//! is no ambient singleton. It holds every discovered source file, the
//! dependency graph over them, and the ordered compilation units.
//!
//! During the parallel compile phase the manifest is read-only; each
//! worker mutates only its own unit (taken out of the manifest first) and
//! its own output file.

use crate::config::Config;
use crate::deps::{self, DependencyGraph, scan_imports};
use crate::resolver::{self, ResolutionError, rel_id};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::WalkDir;

/// One discovered source file. Identity is the normalized relative path
/// from the source root.
#[derive(Debug)]
pub struct SourceFile {
    pub id: String,
    /// Raw content.
    pub content: String,
    /// Last-observed modification time.
    pub mtime: SystemTime,
    /// Resolved direct dependency identities.
    pub deps: Vec<String>,
}

/// Pairs one source identity with one output path and the hash of the
/// last successfully written output.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub id: String,
    pub output: PathBuf,
    /// Content hash of the last written output. `None` until the first
    /// write (or lazy seed from the bytes already on disk).
    pub hash: Option<blake3::Hash>,
}

impl CompilationUnit {
    pub fn new(id: String, output: PathBuf) -> Self {
        Self {
            id,
            output,
            hash: None,
        }
    }
}

/// Process-wide build state for one invocation.
#[derive(Debug, Default)]
pub struct BuildManifest {
    /// Units in resolver order.
    pub units: Vec<CompilationUnit>,
    /// Dependency edges over all discovered sources.
    pub graph: DependencyGraph,
    sources: FxHashMap<String, SourceFile>,
    source_ext: String,
}

impl BuildManifest {
    /// Resolve units, load every source file, and build the dependency
    /// graph. Completes fully before any compilation may begin.
    pub fn collect(config: &Config) -> Result<Self, ResolutionError> {
        let source_root = &config.build.source;
        let units = resolver::resolve(
            source_root,
            &config.build.patterns,
            &config.build.output,
            config.output_ext(),
        )?;

        let source_ext = config.source_ext().to_string();
        let mut sources = load_sources(source_root, &units, &source_ext)?;

        // Resolve direct dependencies now that every identity is known
        let graph = link_sources(&mut sources, &source_ext);

        Ok(Self {
            units,
            graph,
            sources,
            source_ext,
        })
    }

    pub fn source(&self, id: &str) -> Option<&SourceFile> {
        self.sources.get(id)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Resolve an import target against the discovered sources.
    pub fn resolve_import(&self, name: &str, importer: &str) -> Option<String> {
        deps::resolve_import(name, importer, &self.source_ext, |id| {
            self.sources.contains_key(id)
        })
    }
}

/// Load every file carrying the source extension (partials included),
/// plus any unit inputs matched under a different extension.
fn load_sources(
    root: &Path,
    units: &[CompilationUnit],
    source_ext: &str,
) -> Result<FxHashMap<String, SourceFile>, ResolutionError> {
    let unit_ids: rustc_hash::FxHashSet<&str> = units.iter().map(|u| u.id.as_str()).collect();

    let mut sources = FxHashMap::default();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(id) = rel_id(entry.path(), root) else {
            continue;
        };

        let has_source_ext = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(source_ext));
        if !has_source_ext && !unit_ids.contains(id.as_str()) {
            continue;
        }

        let source = load_source(id, entry.path().to_path_buf())?;
        sources.insert(source.id.clone(), source);
    }
    Ok(sources)
}

/// Read one source file's content and mtime.
fn load_source(id: String, path: PathBuf) -> Result<SourceFile, ResolutionError> {
    let bytes =
        fs::read(&path).map_err(|err| ResolutionError::Read(path.clone(), err))?;
    let mtime = fs::metadata(&path)
        .and_then(|m| m.modified())
        .map_err(|err| ResolutionError::Read(path.clone(), err))?;

    Ok(SourceFile {
        id,
        content: String::from_utf8_lossy(&bytes).into_owned(),
        mtime,
        deps: Vec::new(),
    })
}

/// Scan imports in every source and wire up the dependency graph.
fn link_sources(
    sources: &mut FxHashMap<String, SourceFile>,
    source_ext: &str,
) -> DependencyGraph {
    let resolved: Vec<(String, Vec<String>)> = sources
        .values()
        .map(|source| {
            let deps: Vec<String> = scan_imports(&source.content)
                .iter()
                .flat_map(|import| &import.args)
                .filter_map(|arg| arg.name.as_deref())
                .filter_map(|name| {
                    deps::resolve_import(name, &source.id, source_ext, |id| {
                        sources.contains_key(id)
                    })
                })
                .collect();
            (source.id.clone(), deps)
        })
        .collect();

    for (id, deps) in resolved {
        if let Some(source) = sources.get_mut(&id) {
            source.deps = deps;
        }
    }

    let mut graph = DependencyGraph::new();
    for source in sources.values() {
        graph.insert(&source.id, source.deps.clone());
    }
    graph
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config_for(root: &Path) -> Config {
        let mut config = Config::default();
        config.build.source = root.join("sass");
        config.build.output = root.join("out");
        config
    }

    #[test]
    fn test_collect_loads_partials_without_units() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/screen.scss", "@import \"base\";");
        write(dir.path(), "sass/_base.scss", "body { margin: 0; }");

        let manifest = BuildManifest::collect(&config_for(dir.path())).unwrap();

        let ids: Vec<_> = manifest.units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["screen.scss"]);
        assert_eq!(manifest.source_count(), 2);
        assert!(manifest.source("_base.scss").is_some());
    }

    #[test]
    fn test_collect_links_dependencies() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/screen.scss", "@import \"lib/mixins\";");
        write(dir.path(), "sass/lib/_mixins.scss", "// helpers");

        let manifest = BuildManifest::collect(&config_for(dir.path())).unwrap();

        assert_eq!(
            manifest.graph.deps_of("screen.scss"),
            ["lib/_mixins.scss".to_string()]
        );
        assert_eq!(
            manifest.source("screen.scss").unwrap().deps,
            vec!["lib/_mixins.scss".to_string()]
        );
    }

    #[test]
    fn test_collect_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let result = BuildManifest::collect(&config_for(dir.path()));
        assert!(matches!(result, Err(ResolutionError::RootNotFound(_))));
    }

    #[test]
    fn test_resolve_import_through_manifest() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/screen.scss", "");
        write(dir.path(), "sass/_base.scss", "");

        let manifest = BuildManifest::collect(&config_for(dir.path())).unwrap();
        assert_eq!(
            manifest.resolve_import("base", "screen.scss").as_deref(),
            Some("_base.scss")
        );
        assert!(manifest.resolve_import("missing", "screen.scss").is_none());
    }
}
