//! Watches a storage file for writes made by other processes.
//!
//! The store's own writes are recorded in a short-lived registry so the
//! watcher does not report them back as external changes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use once_cell::sync::Lazy;

const DEBOUNCE_DURATION_MS: u64 = 200;
const WRITE_SUPPRESSION_WINDOW_MS: u64 = 300;

pub type ChangeCallback = Box<dyn Fn() + Send + 'static>;

static WRITE_REGISTRY: Lazy<Mutex<HashMap<PathBuf, Instant>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn registry_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn record_internal_write(path: &Path) {
    if let Ok(mut registry) = WRITE_REGISTRY.lock() {
        registry.insert(registry_key(path), Instant::now());
    }
}

/// True when `path` was written by this process within the suppression window.
pub fn is_internal_write(path: &Path) -> bool {
    let window = Duration::from_millis(WRITE_SUPPRESSION_WINDOW_MS);
    let Ok(mut registry) = WRITE_REGISTRY.lock() else {
        return false;
    };
    registry.retain(|_, written| written.elapsed() < window);
    registry.contains_key(&registry_key(path))
}

/// Debounced watcher on one file. Dropping it stops the watch.
pub struct ChangeWatcher {
    debouncer: Debouncer<RecommendedWatcher>,
    watched_dir: PathBuf,
}

impl ChangeWatcher {
    /// Watches the parent directory of `target` rather than the file itself,
    /// since atomic replacement swaps the inode on every write.
    pub fn new(target: PathBuf, on_change: ChangeCallback) -> Result<Self, notify::Error> {
        let watched_dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = channel::<Result<Vec<DebouncedEvent>, notify::Error>>();
        let debouncer = new_debouncer(Duration::from_millis(DEBOUNCE_DURATION_MS), tx)?;

        std::thread::spawn(move || handle_events(rx, target, on_change));

        let mut watcher = Self {
            debouncer,
            watched_dir,
        };
        watcher
            .debouncer
            .watcher()
            .watch(&watcher.watched_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(
            target: "watch",
            path = %watcher.watched_dir.display(),
            "File watcher started"
        );
        Ok(watcher)
    }

    pub fn watched_dir(&self) -> &Path {
        &self.watched_dir
    }
}

fn handle_events(
    rx: Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    target: PathBuf,
    on_change: ChangeCallback,
) {
    let Some(file_name) = target.file_name().map(|name| name.to_os_string()) else {
        return;
    };

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let touched = events
                    .iter()
                    .any(|event| event.path.file_name() == Some(file_name.as_os_str()));
                if !touched {
                    continue;
                }
                if is_internal_write(&target) {
                    tracing::debug!(
                        target: "watch",
                        path = %target.display(),
                        "Event suppressed (self-write)"
                    );
                    continue;
                }
                tracing::debug!(
                    target: "watch",
                    path = %target.display(),
                    "External change detected"
                );
                on_change();
            }
            Ok(Err(err)) => {
                tracing::error!(target: "watch", error = %err, "Watcher error");
            }
            Err(_) => {
                tracing::debug!(
                    target: "watch",
                    "Watcher channel closed, stopping event handler"
                );
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn recorded_writes_are_suppressed() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ideas-stack-data.json");
        fs::write(&path, "[]").expect("write");
        assert!(!is_internal_write(&path));
        record_internal_write(&path);
        assert!(is_internal_write(&path));
    }

    #[test]
    fn external_write_triggers_callback() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ideas-stack-data.json");
        fs::write(&path, "[]").expect("seed");

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let watcher = ChangeWatcher::new(
            path.clone(),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .expect("watcher");
        assert_eq!(watcher.watched_dir(), dir.path());

        std::thread::sleep(Duration::from_millis(100));
        fs::write(&path, "[1]").expect("external write");

        let deadline = Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ideas-stack-data.json");

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _watcher = ChangeWatcher::new(
            path,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .expect("watcher");

        std::thread::sleep(Duration::from_millis(100));
        fs::write(dir.path().join("notes.txt"), "hello").expect("write other");
        std::thread::sleep(Duration::from_millis(800));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
