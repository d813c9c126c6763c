//! Import inlining.
//!
//! Splices each resolvable `@import` target into the importing source at
//! the directive site, recursively. Targets that do not resolve to a known
//! source file (remote URLs, `url(...)` forms, plain CSS imports) are kept
//! as `@import` directives and pass through to the output untouched.
//!
//! An active-path guard makes splicing terminate on cyclic imports: a file
//! already being inlined on the current chain splices nothing. Cycle
//! reporting itself happens in the closure pass, not here.

use crate::deps::scan_imports;
use crate::manifest::BuildManifest;

/// Produce the fully inlined source for `id`.
pub fn flatten(id: &str, manifest: &BuildManifest) -> String {
    let mut out = String::new();
    let mut active = vec![id.to_string()];
    flatten_into(id, manifest, &mut active, &mut out);
    out
}

fn flatten_into(id: &str, manifest: &BuildManifest, active: &mut Vec<String>, out: &mut String) {
    let Some(source) = manifest.source(id) else {
        return;
    };
    let content = &source.content;

    let mut last = 0;
    for import in scan_imports(content) {
        out.push_str(&content[last..import.span.start]);

        let mut retained: Vec<&str> = Vec::new();
        for arg in &import.args {
            let resolved = arg
                .name
                .as_deref()
                .and_then(|name| manifest.resolve_import(name, id));
            match resolved {
                Some(target) if active.contains(&target) => {
                    // Already being inlined on this chain; splice nothing
                }
                Some(target) => {
                    active.push(target.clone());
                    flatten_into(&target, manifest, active, out);
                    active.pop();
                    ensure_newline(out);
                }
                None => retained.push(arg.raw.as_str()),
            }
        }

        if !retained.is_empty() {
            out.push_str("@import ");
            out.push_str(&retained.join(", "));
            out.push(';');
            ensure_newline(out);
        }
        last = import.span.end;
    }
    out.push_str(&content[last..]);
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn manifest_for(root: &Path) -> BuildManifest {
        let mut config = Config::default();
        config.build.source = root.join("sass");
        config.build.output = root.join("out");
        BuildManifest::collect(&config).unwrap()
    }

    #[test]
    fn test_flatten_inlines_partial() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/screen.scss", "@import \"base\";\na { b: c; }");
        write(dir.path(), "sass/_base.scss", "body { margin: 0; }");

        let manifest = manifest_for(dir.path());
        let flat = flatten("screen.scss", &manifest);

        assert!(flat.contains("body { margin: 0; }"));
        assert!(flat.contains("a { b: c; }"));
        assert!(!flat.contains("@import"));
        // Inlined content appears before the importer's own rules
        assert!(flat.find("margin").unwrap() < flat.find("a { b: c; }").unwrap());
    }

    #[test]
    fn test_flatten_recursive_chain() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/screen.scss", "@import \"mid\";");
        write(dir.path(), "sass/_mid.scss", "@import \"leaf\";\n.mid { a: b; }");
        write(dir.path(), "sass/_leaf.scss", ".leaf { c: d; }");

        let manifest = manifest_for(dir.path());
        let flat = flatten("screen.scss", &manifest);

        assert!(flat.find(".leaf").unwrap() < flat.find(".mid").unwrap());
        assert!(!flat.contains("@import"));
    }

    #[test]
    fn test_flatten_keeps_unresolved_imports() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "sass/screen.scss",
            "@import url(\"http://fonts.example/css\"), \"base\";\na { b: c; }",
        );
        write(dir.path(), "sass/_base.scss", ".base { d: e; }");

        let manifest = manifest_for(dir.path());
        let flat = flatten("screen.scss", &manifest);

        assert!(flat.contains(".base { d: e; }"));
        assert!(flat.contains("@import url(\"http://fonts.example/css\");"));
    }

    #[test]
    fn test_flatten_cycle_terminates() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", "@import \"b\";\n.a { x: 1; }");
        write(dir.path(), "sass/b.scss", "@import \"a\";\n.b { x: 2; }");

        let manifest = manifest_for(dir.path());
        let flat = flatten("a.scss", &manifest);

        // Each file spliced at most once per chain
        assert_eq!(flat.matches(".a {").count(), 1);
        assert_eq!(flat.matches(".b {").count(), 1);
    }

    #[test]
    fn test_flatten_diamond_splices_shared_dep_twice() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", "@import \"b\", \"c\";");
        write(dir.path(), "sass/_b.scss", "@import \"d\";\n.b { x: 1; }");
        write(dir.path(), "sass/_c.scss", "@import \"d\";\n.c { x: 2; }");
        write(dir.path(), "sass/_d.scss", ".d { x: 3; }");

        let manifest = manifest_for(dir.path());
        let flat = flatten("a.scss", &manifest);

        assert_eq!(flat.matches(".d {").count(), 2);
    }
}
