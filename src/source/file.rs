//! File-backed desired state with hot reload.
//!
//! The containing directory is watched rather than the file itself so that
//! atomic replacements (rename over, or a ConfigMap `..data` symlink swap)
//! are seen. A modification-time poll covers platforms or mounts where no
//! events arrive.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

use crate::config::load_document;
use crate::routing::{DesiredEndpoint, LiveTable};
use crate::source::{sync_logged, ConfigSource, SourceError};

/// Kubernetes writes ConfigMap volumes through this symlink.
const ATOMIC_SWAP_MARKER: &str = "..data";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct FileSource {
    path: PathBuf,
    debounce: Duration,
    poll_interval: Duration,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_intervals(mut self, debounce: Duration, poll_interval: Duration) -> Self {
        self.debounce = debounce;
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
    }

    /// Whether `event` can change the document.
    pub fn is_relevant(&self, event: &Event) -> bool {
        if matches!(
            event.kind,
            EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
        ) {
            return false;
        }

        let file_name = self.path.file_name();
        event.paths.iter().any(|path| {
            let name = path.file_name();
            name == file_name || name == Some(OsStr::new(ATOMIC_SWAP_MARKER))
        })
    }

    fn start_watcher(&self, tx: mpsc::UnboundedSender<Event>) -> Result<RecommendedWatcher, SourceError> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(error) => tracing::error!(error = %error, "Watch error"),
            },
            notify::Config::default(),
        )?;
        watcher.watch(self.directory(), RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Vec<DesiredEndpoint>, SourceError> {
        let specs = load_document(&self.path)?;
        let file = self.path.display();
        Ok(specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| DesiredEndpoint::new(format!("{file}[{index}]"), spec))
            .collect())
    }

    async fn watch(self: Arc<Self>, live: LiveTable, mut shutdown: broadcast::Receiver<()>) {
        let (tx, mut events) = mpsc::unbounded_channel();
        let _watcher = match self.start_watcher(tx) {
            Ok(watcher) => {
                tracing::info!(path = %self.directory().display(), "Endpoints watcher started");
                Some(watcher)
            }
            Err(error) => {
                tracing::warn!(error = %error, "File watcher unavailable, polling only");
                None
            }
        };

        let mut last_modified = self.modified();
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(source = self.name(), "Watch loop stopped");
                    break;
                }
                Some(event) = events.recv() => {
                    if !self.is_relevant(&event) {
                        continue;
                    }
                    tokio::time::sleep(self.debounce).await;
                    while events.try_recv().is_ok() {}

                    tracing::info!(path = %self.path.display(), "Endpoints file change detected, reloading");
                    last_modified = self.modified();
                    sync_logged(self.as_ref(), &live).await;
                }
                _ = poll.tick() => {
                    let modified = self.modified();
                    if modified != last_modified {
                        tracing::info!(path = %self.path.display(), "Endpoints file modification time changed, reloading");
                        last_modified = modified;
                        sync_logged(self.as_ref(), &live).await;
                    }
                }
            }
        }
    }
}
