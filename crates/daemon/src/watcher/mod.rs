// File watcher: fsevents/inotify → save detection → session save handler.
//
// Each qualifying event is dispatched synchronously on the OS watcher's
// thread, so saves of one path are handled in delivery order and a slow push
// holds back later events instead of queueing them.

pub mod filter;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

pub use filter::{WatchFilter, WatchFilterError};

/// Guards dispatch. `open` is checked under `in_flight`, which is held for the
/// whole duration of one handler call, so once `open` is cleared no handler
/// starts, and taking `in_flight` afterwards waits out the one that is running.
struct DispatchGate {
    open: AtomicBool,
    in_flight: Mutex<()>,
}

impl DispatchGate {
    fn opened() -> Arc<Self> {
        Arc::new(Self { open: AtomicBool::new(true), in_flight: Mutex::new(()) })
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Watches the workspace tree and calls a save handler for every qualifying
/// modification.
pub struct FileWatcher {
    watcher: Option<RecommendedWatcher>,
    gate: Arc<DispatchGate>,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    ///
    /// `on_save` runs on the watcher thread, driven to completion on the
    /// current tokio runtime before the next event is looked at. Must be
    /// called from within a tokio runtime.
    pub fn start<F, Fut>(root: &Path, filter: WatchFilter, on_save: F) -> Result<Self>
    where
        F: Fn(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = ()>,
    {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;
        let runtime = Handle::try_current().context("file watcher must start inside a tokio runtime")?;

        let gate = DispatchGate::opened();
        let dispatch_gate = Arc::clone(&gate);
        let root_for_filter = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in saved_paths(&event, &root_for_filter, &filter) {
                    runtime.block_on(async {
                        let _in_flight = dispatch_gate.in_flight.lock().await;
                        if !dispatch_gate.is_open() {
                            trace!(path = %path.display(), "watcher stopped, dropping save event");
                            return;
                        }
                        on_save(path).await;
                    });
                }
            }
            Err(e) => {
                error!(error = %e, "file watcher error");
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch directory: {}", root.display()))?;

        info!(path = %root.display(), "file watcher started");
        Ok(Self { watcher: Some(watcher), gate, root })
    }

    /// The canonicalized root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop dispatching and release the OS watcher.
    ///
    /// Waits for an in-flight save handler to return. Once this returns no
    /// handler call happens, even for events the OS had already buffered.
    pub async fn stop(mut self) {
        self.gate.close();
        let _ = self.gate.in_flight.lock().await;
        self.watcher.take();
        info!(path = %self.root.display(), "file watcher stopped");
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if self.watcher.is_none() {
            return;
        }
        self.gate.close();
        if self.gate.in_flight.try_lock().is_err() {
            debug!("file watcher dropped during an in-flight save");
        }
    }
}

/// Paths in `event` that count as a document save.
///
/// Content modifications and renames onto a path (write-temp-then-rename
/// saves) qualify; metadata, access, create and remove events do not.
fn saved_paths(event: &Event, root: &Path, filter: &WatchFilter) -> Vec<PathBuf> {
    let candidates: &[PathBuf] = match &event.kind {
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => &event.paths,
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => &event.paths,
            // Source then destination.
            RenameMode::Both => event.paths.get(1..).unwrap_or_default(),
            RenameMode::From => return Vec::new(),
            RenameMode::Any | RenameMode::Other => &event.paths,
        },
        EventKind::Modify(ModifyKind::Metadata(_)) => {
            trace!("skipping metadata-only modify event");
            return Vec::new();
        }
        _ => {
            trace!(kind = ?event.kind, "skipping non-save event");
            return Vec::new();
        }
    };

    candidates
        .iter()
        .filter(|p| {
            if p.starts_with(root) {
                true
            } else {
                warn!(path = %p.display(), "ignoring event outside watch root");
                false
            }
        })
        .filter(|p| filter.matches(p))
        .filter(|p| {
            if p.is_dir() {
                debug!(path = %p.display(), "ignoring directory event");
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}
