//! File system watcher for automatic rebuilds.
//!
//! Monitors the source directory and config file for changes and triggers
//! build invocations. The manifest's mtime/closure invalidation makes each
//! invocation selective, so a touched partial recompiles exactly the units
//! whose closure contains it.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     Event Loop                         │
//! │                                                        │
//! │  ┌──────────┐    ┌──────────┐    ┌──────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│ handle_changes() │  │
//! │  │ events   │    │ (300ms)  │    │                  │  │
//! │  └──────────┘    └──────────┘    │  config → forced │  │
//! │                                  │  source → normal │  │
//! │                                  └──────────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```

use crate::{
    build::{self, ABORT},
    config::Config,
    log,
    logger::WatchStatus,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    env,
    path::{Path, PathBuf},
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;
const REBUILD_COOLDOWN_MS: u64 = 800;
/// Idle poll interval; bounds how long CTRL-C takes to be noticed.
const IDLE_TIMEOUT_MS: u64 = 500;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Config paths are already canonicalized, so incoming watcher paths must
/// be canonicalized before comparison.
fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// What a changed path means for the next rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    /// Config file: forces a full recompile.
    Config,
    /// Anything under the source root.
    Source,
    /// Outside watched directories; ignored.
    Unknown,
}

fn categorize_path(path: &Path, config: &Config) -> ChangeKind {
    let path = normalize_path(path);
    if path == config.config_path {
        ChangeKind::Config
    } else if path.starts_with(&config.build.source) {
        ChangeKind::Source
    } else {
        ChangeKind::Unknown
    }
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing and rebuild cooldown.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_rebuild: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    fn in_cooldown(&self) -> bool {
        self.last_rebuild
            .is_some_and(|t| t.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS))
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn mark_rebuild(&mut self) {
        self.last_rebuild = Some(Instant::now());
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_millis(IDLE_TIMEOUT_MS)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Process batched changes. Returns true when a build ran (for cooldown).
fn handle_changes(paths: &[PathBuf], config: &'static Config, status: &mut WatchStatus) -> bool {
    let mut config_changed = false;
    let mut source_changed = false;

    for path in paths {
        match categorize_path(path, config) {
            ChangeKind::Config => config_changed = true,
            ChangeKind::Source => source_changed = true,
            ChangeKind::Unknown => {}
        }
    }
    if !config_changed && !source_changed {
        return false;
    }
    if config_changed {
        log!("watch"; "config changed, forcing full recompile");
    }

    match build::run_build(config, config_changed) {
        Ok(report) if report.failed() > 0 => {
            let details: Vec<String> = report.failures().map(ToString::to_string).collect();
            status.error(
                &format!("{} unit(s) failed", report.failed()),
                &details.join("\n"),
            );
            false
        }
        Ok(report) if report.compiled() > 0 => {
            status.success(&format!("rebuilt {} stylesheet(s)", report.compiled()));
            true
        }
        Ok(_) => {
            status.unchanged("outputs up-to-date");
            true
        }
        Err(err) => {
            status.error("build failed", &format!("{err:#}"));
            false
        }
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

fn setup_watchers(watcher: &mut impl Watcher, config: &Config) -> Result<()> {
    let source = &config.build.source;
    watcher
        .watch(source, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch source: {}", source.display()))?;

    if config.config_path.exists() {
        watcher
            .watch(&config.config_path, RecursiveMode::NonRecursive)
            .with_context(|| {
                format!("Failed to watch config: {}", config.config_path.display())
            })?;
    }

    let root = config.get_root();
    let rel = |p: &Path| p.strip_prefix(root).unwrap_or(p).display().to_string();
    log!("watch"; "watching {}/ and {}", rel(source), rel(&config.config_path));
    eprintln!(); // Blank line to separate init logs from change events
    Ok(())
}

/// Deletions matter too: removing an imported partial must rebuild the
/// units whose closure contained it.
const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher with debouncing and live rebuild.
///
/// Returns when the channel disconnects or CTRL-C sets the abort flag.
pub fn watch_for_changes_blocking(config: &'static Config) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, config)?;

    let mut debouncer = Debouncer::new();
    let mut status = WatchStatus::new();

    loop {
        if ABORT.load(Ordering::Relaxed) {
            break;
        }
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) && !debouncer.in_cooldown() => {
                debouncer.add(event);
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                if handle_changes(&debouncer.take(), config, &mut status) {
                    debouncer.mark_rebuild();
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // Other cases: irrelevant events, timeout without ready, etc.
            _ => {}
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
