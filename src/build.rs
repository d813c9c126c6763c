//! Build orchestration.
//!
//! Coordinates the three phases of a build invocation:
//!
//! ```text
//! run_build()
//!     │
//!     ├── BuildManifest::collect()   resolve units, load sources,
//!     │                              build the dependency graph
//!     │
//!     ├── invalidation               fresh transitive closure per unit,
//!     │                              mtime checks, cycle warnings
//!     │
//!     └── parallel compile           flatten → transform → write_if_changed
//!                                    per dirty unit, errors collected
//! ```
//!
//! Graph construction completes before any compilation begins; during the
//! parallel phase the manifest is read-only and each worker touches only
//! its own unit and output file. The report lists units in resolver order
//! regardless of completion order.

use crate::{
    compiler::{CompileError, StyleOptions, WriteOutcome, compile, write_if_changed},
    deps::Closure,
    log,
    logger::{ProgressBar, inc_progress},
    manifest::{BuildManifest, CompilationUnit},
};
use anyhow::Result;
use rayon::prelude::*;
use std::{
    fs,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

/// Abort flag set by the CTRL-C handler. Checked between units; in-flight
/// outputs are left as-is.
pub static ABORT: AtomicBool = AtomicBool::new(false);

// =============================================================================
// Report
// =============================================================================

/// Per-unit result of one build invocation.
#[derive(Debug)]
pub enum UnitOutcome {
    /// Compiled and written.
    Compiled,
    /// Up-to-date by mtime; never compiled.
    Skipped,
    /// Compiled, but the output hash matched; nothing written.
    Unchanged,
    /// Not run because the build was aborted.
    Aborted,
    /// Compilation failed; the rest of the build continued.
    Failed(CompileError),
}

/// Outcome summary for one build invocation, in resolver order.
#[derive(Debug)]
pub struct BuildReport {
    pub outcomes: Vec<(String, UnitOutcome)>,
    /// Units whose closure computation detected an import cycle.
    pub cycles: Vec<String>,
    pub elapsed: Duration,
}

impl BuildReport {
    /// Units compiled and written.
    pub fn compiled(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Compiled))
    }

    /// Units skipped: up-to-date by mtime or unchanged by hash.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Skipped | UnitOutcome::Unchanged))
    }

    /// Units that failed to compile.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed(_)))
    }

    pub fn aborted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| matches!(o, UnitOutcome::Aborted))
    }

    /// Collected per-unit failures, in resolver order.
    pub fn failures(&self) -> impl Iterator<Item = &CompileError> {
        self.outcomes.iter().filter_map(|(_, o)| match o {
            UnitOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Log cycle warnings, failures, and the final counts.
    pub fn log_summary(&self) {
        if !self.cycles.is_empty() {
            log!(
                "warn";
                "import cycle in closure of: {} (compiled with partial closure)",
                self.cycles.join(", ")
            );
        }
        for err in self.failures() {
            log!("error"; "{err}");
        }
        if self.aborted() {
            log!("compile"; "aborted; partial outputs left in place");
        }
        log!(
            "compile";
            "{} compiled, {} skipped, {} failed in {:.2}s",
            self.compiled(),
            self.skipped(),
            self.failed(),
            self.elapsed.as_secs_f32()
        );
    }
}

// =============================================================================
// Build
// =============================================================================

/// Run one build invocation.
///
/// Fatal failures (resolution, unreadable sources) return `Err` before any
/// compilation starts. Per-unit failures land in the report; the build
/// keeps going. With `force`, freshness checks are skipped and every unit
/// recompiles.
pub fn run_build(config: &crate::config::Config, force: bool) -> Result<BuildReport> {
    let started = Instant::now();

    let mut manifest = BuildManifest::collect(config)?;
    let opts = StyleOptions::from_config(config);

    log!(
        "resolve";
        "{} unit(s) from {} source file(s)",
        manifest.units.len(),
        manifest.source_count()
    );

    // Closures are computed fresh each build; nothing carries over
    let mut cycles = Vec::new();
    let mut dirty = Vec::with_capacity(manifest.units.len());
    for unit in &manifest.units {
        let closure = manifest.graph.transitive_closure(&unit.id);
        if closure.cycle_detected {
            cycles.push(unit.id.clone());
        }
        dirty.push(force || needs_rebuild(unit, &manifest, &closure));
    }

    // Units move out of the manifest so workers own them exclusively while
    // the manifest stays shared read-only
    let mut units = std::mem::take(&mut manifest.units);
    let progress = ProgressBar::new("compile", dirty.iter().filter(|d| **d).count());

    let outcomes: Vec<UnitOutcome> = units
        .par_iter_mut()
        .zip(dirty.par_iter())
        .map(|(unit, &dirty)| {
            if ABORT.load(Ordering::Relaxed) {
                return UnitOutcome::Aborted;
            }
            if !dirty {
                return UnitOutcome::Skipped;
            }
            let outcome = match compile(&unit.id, &manifest, &opts)
                .and_then(|result| write_if_changed(unit, &result))
            {
                Ok(WriteOutcome::Written) => UnitOutcome::Compiled,
                Ok(WriteOutcome::Unchanged) => UnitOutcome::Unchanged,
                Err(err) => UnitOutcome::Failed(err),
            };
            inc_progress(progress.as_ref());
            outcome
        })
        .collect();

    if let Some(progress) = &progress {
        progress.finish();
    }

    Ok(BuildReport {
        outcomes: units.into_iter().map(|u| u.id).zip(outcomes).collect(),
        cycles,
        elapsed: started.elapsed(),
    })
}

/// A unit recompiles when its output is missing, its source is newer than
/// its output, or anything in its transitive closure is.
fn needs_rebuild(unit: &CompilationUnit, manifest: &BuildManifest, closure: &Closure) -> bool {
    let Ok(out_mtime) = fs::metadata(&unit.output).and_then(|m| m.modified()) else {
        return true;
    };
    let Some(source) = manifest.source(&unit.id) else {
        return true;
    };
    if source.mtime > out_mtime {
        return true;
    }
    closure
        .deps
        .iter()
        .any(|dep| manifest.source(dep).is_some_and(|s| s.mtime > out_mtime))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::Path;
    use std::thread::sleep;
    use std::time::Duration;
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

    fn outcome_of<'a>(report: &'a BuildReport, id: &str) -> &'a UnitOutcome {
        &report
            .outcomes
            .iter()
            .find(|(unit, _)| unit == id)
            .unwrap()
            .1
    }

    #[test]
    fn test_first_build_compiles_everything() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", ".a { x: 1; }");
        write(dir.path(), "sass/b.scss", ".b { x: 2; }");
        let config = config_for(dir.path());

        let report = run_build(&config, false).unwrap();

        assert_eq!(report.compiled(), 2);
        assert_eq!(report.failed(), 0);
        assert!(dir.path().join("out/a.css").exists());
        assert!(dir.path().join("out/b.css").exists());
    }

    #[test]
    fn test_rebuild_without_changes_writes_nothing() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", ".a { x: 1; }");
        let config = config_for(dir.path());

        run_build(&config, false).unwrap();
        let report = run_build(&config, false).unwrap();

        assert_eq!(report.compiled(), 0);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn test_transitive_invalidation() {
        let dir = tempdir().unwrap();
        // b imports a; touching a must recompile both units
        write(dir.path(), "sass/a.scss", ".a { x: 1; }");
        write(dir.path(), "sass/b.scss", "@import \"a\";\n.b { x: 2; }");
        let config = config_for(dir.path());

        let report = run_build(&config, false).unwrap();
        assert_eq!(report.compiled(), 2);

        // Untouched rebuild: both skipped
        let report = run_build(&config, false).unwrap();
        assert_eq!(report.compiled(), 0);
        assert_eq!(report.skipped(), 2);

        // Touch only a.scss
        sleep(Duration::from_millis(20));
        write(dir.path(), "sass/a.scss", ".a { x: 9; }");

        let report = run_build(&config, false).unwrap();
        assert!(matches!(outcome_of(&report, "a.scss"), UnitOutcome::Compiled));
        assert!(matches!(outcome_of(&report, "b.scss"), UnitOutcome::Compiled));
    }

    #[test]
    fn test_touch_without_content_change_skips_write() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", ".a { x: 1; }");
        let config = config_for(dir.path());

        run_build(&config, false).unwrap();

        // Same content, newer mtime: recompiles but the hash matches
        sleep(Duration::from_millis(20));
        write(dir.path(), "sass/a.scss", ".a { x: 1; }");

        let report = run_build(&config, false).unwrap();
        assert!(matches!(outcome_of(&report, "a.scss"), UnitOutcome::Unchanged));
        assert_eq!(report.compiled(), 0);
    }

    #[test]
    fn test_partial_failure_continues() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/bad.scss", ".a { color: red");
        write(dir.path(), "sass/good.scss", ".b { x: 1; }");
        let config = config_for(dir.path());

        let report = run_build(&config, false).unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.compiled(), 1);
        assert!(dir.path().join("out/good.css").exists());
        assert!(!dir.path().join("out/bad.css").exists());

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.unit, "bad.scss");
    }

    #[test]
    fn test_cycle_reported_but_compiled() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", "@import \"b\";\n.a { x: 1; }");
        write(dir.path(), "sass/b.scss", "@import \"a\";\n.b { x: 2; }");
        let config = config_for(dir.path());

        let report = run_build(&config, false).unwrap();

        assert_eq!(report.cycles.len(), 2);
        assert_eq!(report.failed(), 0);
        assert!(dir.path().join("out/a.css").exists());
        assert!(dir.path().join("out/b.css").exists());
    }

    #[test]
    fn test_report_preserves_resolver_order() {
        let dir = tempdir().unwrap();
        for name in ["e", "c", "a", "d", "b"] {
            write(dir.path(), &format!("sass/{name}.scss"), ".x { y: z; }");
        }
        let config = config_for(dir.path());

        let report = run_build(&config, false).unwrap();
        let ids: Vec<_> = report.outcomes.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a.scss", "b.scss", "c.scss", "d.scss", "e.scss"]);
    }

    #[test]
    fn test_force_recompiles_fresh_units() {
        let dir = tempdir().unwrap();
        write(dir.path(), "sass/a.scss", ".a { x: 1; }");
        let config = config_for(dir.path());

        run_build(&config, false).unwrap();
        let report = run_build(&config, true).unwrap();

        // Forced: compiled again, but the identical hash skips the write
        assert!(matches!(outcome_of(&report, "a.scss"), UnitOutcome::Unchanged));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        assert!(run_build(&config, false).is_err());
    }
}
