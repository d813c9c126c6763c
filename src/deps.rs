//! Dependency tracking for precise incremental rebuilds.
//!
//! This module provides:
//!
//! - **Import scanning**: lexical extraction of `@import` directives,
//!   ignoring occurrences inside comments and string literals
//! - **Import resolution**: mapping directive targets to known source
//!   identities, including the underscore-partial convention
//! - **`DependencyGraph`**: directed edges with transitive closure and
//!   cycle detection
//!
//! # Rebuild Logic
//!
//! A compilation unit needs rebuilding when:
//! 1. Its source is newer than its output, OR
//! 2. Any identity in its transitive closure is newer than its output
//!
//! Closures are computed fresh for every build invocation; nothing here
//! is cached across builds.

use crate::compiler::scan::Scanner;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Range;

// =============================================================================
// Import Scanning
// =============================================================================

/// One argument of an `@import` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportArg {
    /// Verbatim argument text (string literal with quotes, or `url(...)`).
    pub raw: String,
    /// Inner text when the argument was a plain string literal.
    pub name: Option<String>,
}

/// A scanned `@import` directive.
#[derive(Debug, Clone)]
pub struct Import {
    /// Arguments in source order.
    pub args: Vec<ImportArg>,
    /// Byte span of the whole directive, including the trailing `;`.
    pub span: Range<usize>,
}

/// Whether a character can continue an identifier.
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Lexically scan `content` for `@import` directives.
///
/// Directives inside comments or string literals are ignored. Scanning is
/// best-effort on malformed input: an unterminated comment or string ends
/// the scan, and the compiler reports the syntax error properly later.
pub fn scan_imports(content: &str) -> Vec<Import> {
    let mut sc = Scanner::new(content);
    let mut imports = Vec::new();

    while let Some(c) = sc.peek() {
        if sc.at_comment() {
            if sc.take_comment().is_err() {
                break;
            }
            continue;
        }
        if c == '"' || c == '\'' {
            if sc.take_string().is_err() {
                break;
            }
            continue;
        }
        if c == '@' && at_import_directive(&sc) {
            match scan_import_directive(&mut sc) {
                Some(import) => imports.push(import),
                None => break,
            }
            continue;
        }
        sc.bump();
    }

    imports
}

/// Check for `@import` followed by a non-identifier character.
fn at_import_directive(sc: &Scanner) -> bool {
    const KEYWORD: &str = "@import";
    sc.starts_with(KEYWORD) && !sc.peek_ahead(KEYWORD.len()).is_some_and(is_ident_char)
}

/// Scan one `@import` directive. The cursor is at `@`.
///
/// Returns `None` when the argument list hits malformed input.
fn scan_import_directive(sc: &mut Scanner) -> Option<Import> {
    let start = sc.pos();
    sc.advance("@import".len());

    let mut args = Vec::new();
    loop {
        sc.skip_ws();
        while sc.at_comment() {
            if sc.take_comment().is_err() {
                return None;
            }
            sc.skip_ws();
        }

        match sc.peek() {
            Some('"') | Some('\'') => {
                let raw = sc.take_string().ok()?;
                let name = raw[1..raw.len() - 1].to_string();
                args.push(ImportArg {
                    raw: raw.to_string(),
                    name: Some(name),
                });
            }
            Some(';') | None => {}
            Some(_) => {
                let raw = scan_raw_arg(sc)?;
                if !raw.is_empty() {
                    args.push(ImportArg { raw, name: None });
                }
            }
        }

        sc.skip_ws();
        match sc.peek() {
            Some(',') => {
                sc.bump();
            }
            Some(';') => {
                sc.bump();
                break;
            }
            _ => break,
        }
    }

    Some(Import {
        args,
        span: start..sc.pos(),
    })
}

/// Scan a non-string import argument (e.g. `url(...)`) up to `,` or `;`.
fn scan_raw_arg(sc: &mut Scanner) -> Option<String> {
    let start = sc.pos();
    let mut depth: u32 = 0;

    while let Some(c) = sc.peek() {
        match c {
            '"' | '\'' => {
                sc.take_string().ok()?;
            }
            '(' => {
                depth += 1;
                sc.bump();
            }
            ')' => {
                depth = depth.saturating_sub(1);
                sc.bump();
            }
            ',' | ';' if depth == 0 => break,
            '\n' if depth == 0 => break,
            _ => {
                sc.bump();
            }
        }
    }

    Some(sc.slice(start, sc.pos()).trim().to_string())
}

// =============================================================================
// Import Resolution
// =============================================================================

/// Resolve an import target to a known source identity.
///
/// Tried in order: relative to the importing file's directory, then the
/// source root. For each base the candidate forms are the name with the
/// source extension appended, the exact name, and the underscore-partial
/// variants of both. Remote targets (`http://...`, protocol-relative) and
/// self-imports never resolve.
pub fn resolve_import(
    name: &str,
    importer: &str,
    source_ext: &str,
    exists: impl Fn(&str) -> bool,
) -> Option<String> {
    if name.contains("://") || name.starts_with("//") {
        return None;
    }

    let mut bases = Vec::new();
    if let Some((dir, _)) = importer.rsplit_once('/') {
        bases.push(format!("{dir}/{name}"));
    }
    bases.push(name.to_string());

    for base in &bases {
        for candidate in candidate_forms(base, source_ext) {
            if let Some(normalized) = normalize_rel(&candidate)
                && normalized != importer
                && exists(&normalized)
            {
                return Some(normalized);
            }
        }
    }
    None
}

/// Candidate filenames for an import target, in resolution order.
fn candidate_forms(base: &str, ext: &str) -> Vec<String> {
    let suffix = format!(".{ext}");
    let mut forms = Vec::new();

    if base.ends_with(&suffix) {
        forms.push(base.to_string());
    } else {
        forms.push(format!("{base}{suffix}"));
        forms.push(base.to_string());
    }

    // Underscore-partial variants: dir/name.ext -> dir/_name.ext
    for form in forms.clone() {
        let (dir, file) = form.rsplit_once('/').unwrap_or(("", form.as_str()));
        if !file.starts_with('_') {
            if dir.is_empty() {
                forms.push(format!("_{file}"));
            } else {
                forms.push(format!("{dir}/_{file}"));
            }
        }
    }
    forms
}

/// Normalize `.` and `..` segments in a forward-slash relative path.
///
/// Returns `None` when the path escapes the source root.
fn normalize_rel(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            _ => segments.push(segment),
        }
    }
    Some(segments.join("/"))
}

// =============================================================================
// Dependency Graph
// =============================================================================

/// Result of a transitive closure walk.
#[derive(Debug, Default)]
pub struct Closure {
    /// Every identity reachable from the start (start itself excluded).
    pub deps: FxHashSet<String>,
    /// An edge led back to a node on the active walk path.
    pub cycle_detected: bool,
}

/// DFS node coloring for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// On the active walk path.
    Active,
    /// Fully explored and popped.
    Done,
}

/// Directed dependency graph over source identities.
///
/// Edge A -> B means "A's output depends on B's content". Self-edges are
/// rejected at insertion; cycles are representable and detected during
/// closure computation rather than at construction.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: FxHashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`'s direct dependencies, dropping self-edges and duplicates.
    pub fn insert(&mut self, id: &str, deps: Vec<String>) {
        let mut seen = FxHashSet::default();
        let deps: Vec<String> = deps
            .into_iter()
            .filter(|d| d != id)
            .filter(|d| seen.insert(d.clone()))
            .collect();
        self.edges.insert(id.to_string(), deps);
    }

    /// Direct dependencies of `id`.
    pub fn deps_of(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth-first walk from `id`, accumulating every reachable identity.
    ///
    /// Terminates on cyclic graphs. A cycle is flagged only when an edge
    /// returns to a node still on the active path; re-reaching an already
    /// popped node (a shared dependency, e.g. a diamond) is legal.
    pub fn transitive_closure(&self, root: &str) -> Closure {
        let mut state: FxHashMap<&str, Visit> = FxHashMap::default();
        let mut closure = Closure::default();
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        state.insert(root, Visit::Active);

        while let Some(frame) = stack.last_mut() {
            let (id, next) = (frame.0, frame.1);
            let children = self.deps_of(id);

            if next >= children.len() {
                state.insert(id, Visit::Done);
                stack.pop();
                if id != root {
                    closure.deps.insert(id.to_string());
                }
                continue;
            }
            frame.1 += 1;

            let child = children[next].as_str();
            match state.get(child) {
                Some(Visit::Active) => closure.cycle_detected = true,
                Some(Visit::Done) => {}
                None => {
                    state.insert(child, Visit::Active);
                    stack.push((child, 0));
                }
            }
        }

        closure
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // scan_imports
    // ------------------------------------------------------------------------

    #[test]
    fn test_scan_single_import() {
        let imports = scan_imports("@import \"base\";\nbody { color: red; }");
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].args.len(), 1);
        assert_eq!(imports[0].args[0].name.as_deref(), Some("base"));
    }

    #[test]
    fn test_scan_multiple_targets() {
        let imports = scan_imports("@import \"a\", 'b';");
        assert_eq!(imports.len(), 1);
        let names: Vec<_> = imports[0]
            .args
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_scan_ignores_comments() {
        let content = "/* @import \"a\"; */\n// @import \"b\";\n@import \"c\";";
        let imports = scan_imports(content);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].args[0].name.as_deref(), Some("c"));
    }

    #[test]
    fn test_scan_ignores_string_literals() {
        let content = "a { content: \"@import \\\"x\\\";\"; }";
        assert!(scan_imports(content).is_empty());
    }

    #[test]
    fn test_scan_url_argument_is_not_named() {
        let imports = scan_imports("@import url(\"http://example.com/a.css\");");
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].args.len(), 1);
        assert!(imports[0].args[0].name.is_none());
        assert!(imports[0].args[0].raw.starts_with("url("));
    }

    #[test]
    fn test_scan_span_covers_directive() {
        let content = "x\n@import \"a\";\ny";
        let imports = scan_imports(content);
        assert_eq!(&content[imports[0].span.clone()], "@import \"a\";");
    }

    #[test]
    fn test_scan_rejects_longer_identifier() {
        assert!(scan_imports("@imports \"a\";").is_empty());
    }

    // ------------------------------------------------------------------------
    // resolve_import
    // ------------------------------------------------------------------------

    fn set(ids: &[&str]) -> FxHashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_appends_extension() {
        let ids = set(&["base.scss"]);
        let resolved = resolve_import("base", "screen.scss", "scss", |id| ids.contains(id));
        assert_eq!(resolved.as_deref(), Some("base.scss"));
    }

    #[test]
    fn test_resolve_relative_to_importer() {
        let ids = set(&["lib/mixins.scss"]);
        let resolved = resolve_import("mixins", "lib/screen.scss", "scss", |id| ids.contains(id));
        assert_eq!(resolved.as_deref(), Some("lib/mixins.scss"));
    }

    #[test]
    fn test_resolve_underscore_partial() {
        let ids = set(&["lib/_mixins.scss"]);
        let resolved = resolve_import("lib/mixins", "screen.scss", "scss", |id| ids.contains(id));
        assert_eq!(resolved.as_deref(), Some("lib/_mixins.scss"));
    }

    #[test]
    fn test_resolve_parent_traversal() {
        let ids = set(&["shared.scss"]);
        let resolved = resolve_import("../shared", "lib/a.scss", "scss", |id| ids.contains(id));
        assert_eq!(resolved.as_deref(), Some("shared.scss"));
    }

    #[test]
    fn test_resolve_escaping_root_fails() {
        let ids = set(&["a.scss"]);
        let resolved = resolve_import("../../a", "b.scss", "scss", |id| ids.contains(id));
        assert!(resolved.is_none());
    }

    #[test]
    fn test_resolve_remote_targets_skipped() {
        let ids = set(&["a.scss"]);
        assert!(
            resolve_import("http://x/a", "b.scss", "scss", |id| ids.contains(id)).is_none()
        );
        assert!(resolve_import("//x/a", "b.scss", "scss", |id| ids.contains(id)).is_none());
    }

    #[test]
    fn test_resolve_self_import_rejected() {
        let ids = set(&["a.scss"]);
        assert!(resolve_import("a", "a.scss", "scss", |id| ids.contains(id)).is_none());
    }

    // ------------------------------------------------------------------------
    // DependencyGraph
    // ------------------------------------------------------------------------

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (id, deps) in edges {
            g.insert(id, deps.iter().map(|d| d.to_string()).collect());
        }
        g
    }

    #[test]
    fn test_insert_rejects_self_edges() {
        let g = graph(&[("a", &["a", "b"])]);
        assert_eq!(g.deps_of("a"), ["b".to_string()]);
    }

    #[test]
    fn test_closure_linear_chain() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let closure = g.transitive_closure("a");
        assert_eq!(closure.deps, ["b", "c"].iter().map(|s| s.to_string()).collect());
        assert!(!closure.cycle_detected);
    }

    #[test]
    fn test_closure_diamond_is_not_a_cycle() {
        // a -> b, c; b -> d; c -> d
        let g = graph(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])]);
        let closure = g.transitive_closure("a");
        assert_eq!(
            closure.deps,
            ["b", "c", "d"].iter().map(|s| s.to_string()).collect()
        );
        assert!(!closure.cycle_detected);
    }

    #[test]
    fn test_closure_two_node_cycle_flags_both() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);

        let from_a = g.transitive_closure("a");
        assert!(from_a.cycle_detected);
        assert!(from_a.deps.contains("b"));

        let from_b = g.transitive_closure("b");
        assert!(from_b.cycle_detected);
        assert!(from_b.deps.contains("a"));
    }

    #[test]
    fn test_closure_inner_cycle_detected_from_outside() {
        // a -> b -> c -> b
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["b"])]);
        let closure = g.transitive_closure("a");
        assert!(closure.cycle_detected);
        assert!(closure.deps.contains("b"));
        assert!(closure.deps.contains("c"));
    }

    #[test]
    fn test_closure_unknown_node_is_empty() {
        let g = graph(&[("a", &["b"])]);
        let closure = g.transitive_closure("zzz");
        assert!(closure.deps.is_empty());
        assert!(!closure.cycle_detected);
    }
}
