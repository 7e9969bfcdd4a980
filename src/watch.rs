//! File system watcher for the physical views directory.
//!
//! Edits under `[views].root` are mapped back to virtual view paths and
//! signalled on the change bus, so fallback views are live-edited the same
//! way stored pages are.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌────────────────────────────────────┐
//! │ notify   │───▶│ Debouncer│───▶│ handle_changes()                   │
//! │ events   │    │ (300ms)  │    │  Views/Shared/Foo.liquid           │
//! └──────────┘    └──────────┘    │    ──► "/Shared/Foo.liquid"        │
//!                                 │    ──► bus.signal("/shared/foo")   │
//!                                 └────────────────────────────────────┘
//! ```

use crate::{
    log,
    logger::WatchStatus,
    signal::ChangeBus,
    view::{PhysicalProvider, normalize, path::has_extension},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use walkdir::WalkDir;

const DEBOUNCE_MS: u64 = 300;

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Batches rapid file events.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
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

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

/// Signal every view path touched by `paths`. Returns the normalized paths
/// signalled, sorted.
fn handle_changes(
    paths: &[PathBuf],
    views: &PhysicalProvider,
    extension: &str,
    bus: &ChangeBus,
) -> Vec<String> {
    let mut normalized: Vec<String> = paths
        .iter()
        .filter_map(|path| views.virtual_path(path))
        .filter(|virtual_path| has_extension(virtual_path, extension))
        .map(|virtual_path| normalize(&virtual_path, extension))
        .collect::<FxHashSet<_>>()
        .into_iter()
        .collect();
    normalized.sort_unstable();

    for path in &normalized {
        let fired = bus.signal(path);
        if fired > 0 {
            log!("watch"; "{} changed, {} cached view(s) dropped", path, fired);
        }
    }
    normalized
}

/// Number of view files currently under `root`.
fn count_views(root: &Path, extension: &str) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| has_extension(name, extension))
        })
        .count()
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Watch `root` until the event channel closes.
pub fn watch_views_blocking(root: &Path, extension: &str, bus: &ChangeBus) -> Result<()> {
    if !root.is_dir() {
        log!("watch"; "{} does not exist, not watching", root.display());
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch views: {}", root.display()))?;
    log!("watch"; "{}/ ({} views)", root.display(), count_views(root, extension));

    let views = PhysicalProvider::new(root);
    let mut debouncer = Debouncer::new();
    let mut status = WatchStatus::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => status.error("watch error", &e.to_string()),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                let signalled = handle_changes(&debouncer.take(), &views, extension, bus);
                if !signalled.is_empty() {
                    status.success(&format!("reloaded: {}", signalled.join(", ")));
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // Other cases: irrelevant events, timeout without ready, etc.
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::VIEW_EXTENSION;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("Views/Foo.liquid.swp")));
        assert!(is_temp_file(Path::new("Views/Foo.liquid~")));
        assert!(is_temp_file(Path::new("Views/.Foo.liquid")));
        assert!(!is_temp_file(Path::new("Views/Foo.liquid")));
    }

    #[test]
    fn test_handle_changes_signals_normalized_paths() {
        let root = PathBuf::from("/srv/Views");
        let views = PhysicalProvider::new(&root);
        let bus = ChangeBus::new();

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        bus.get_token("/shared/foo").register(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        let paths = vec![
            root.join("Shared/Foo.liquid"),
            root.join("shared/foo.LIQUID"),
            root.join("Home/notes.txt"),
            PathBuf::from("/elsewhere/Bar.liquid"),
        ];
        let signalled = handle_changes(&paths, &views, VIEW_EXTENSION, &bus);

        assert_eq!(signalled, vec!["/shared/foo"]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debouncer_batches_until_quiet() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));

        let event = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("Views/Foo.liquid"))
            .add_path(PathBuf::from("Views/Foo.liquid.swp"));
        debouncer.add(event);
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_millis(DEBOUNCE_MS));

        debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS + 1));
        assert!(debouncer.ready());
        assert_eq!(debouncer.take(), vec![PathBuf::from("Views/Foo.liquid")]);
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_count_views() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("Shared")).unwrap();
        std::fs::write(dir.path().join("Shared/Foo.liquid"), "x").unwrap();
        std::fs::write(dir.path().join("Index.liquid"), "x").unwrap();
        std::fs::write(dir.path().join("readme.md"), "x").unwrap();
        assert_eq!(count_views(dir.path(), VIEW_EXTENSION), 2);
    }
}
