use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::scanner::TEMP_SUFFIX;
use super::{IndexStore, RebuildSummary};
use crate::errors::GraphResult;

/// Watches a graph directory and rebuilds the index once changes settle.
///
/// The background thread stops when the watcher is dropped: dropping the
/// `RecommendedWatcher` closes the event channel.
pub struct GraphWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl GraphWatcher {
    /// Start watching `root` recursively.
    ///
    /// Relevant events are collected until `debounce` passes without a new one,
    /// then `store.rebuild_index(root)` runs once and `on_rebuild` receives the summary.
    pub fn start<F>(root: &Path, store: Arc<IndexStore>, debounce: Duration, on_rebuild: F) -> GraphResult<Self>
    where
        F: Fn(&RebuildSummary) + Send + 'static,
    {
        let root = root.to_path_buf();
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            tx,
            Config::default().with_poll_interval(Duration::from_millis(300)),
        )?;
        watcher.watch(root.as_path(), RecursiveMode::Recursive)?;

        // Poll a few times per debounce window so the quiet period is measured closely.
        let tick = (debounce / 4).max(Duration::from_millis(10));
        let root_clone = root.clone();
        thread::spawn(move || {
            let mut last_event: Option<Instant> = None;
            let mut changed: usize = 0;

            loop {
                match rx.recv_timeout(tick) {
                    Ok(Ok(event)) => {
                        let relevant = event
                            .paths
                            .iter()
                            .filter(|p| should_process_path(p, &root_clone))
                            .count();
                        if relevant > 0 {
                            changed += relevant;
                            last_event = Some(Instant::now());
                        }
                    }
                    Ok(Err(e)) => {
                        log::warn!("[graph/watcher] File watcher error: {}", e);
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        let settled = last_event.is_some_and(|at| at.elapsed() >= debounce);
                        if !settled {
                            continue;
                        }
                        log::debug!("[graph/watcher] {} changed paths settled, rebuilding", changed);
                        last_event = None;
                        changed = 0;

                        match store.rebuild_index(&root_clone) {
                            Ok(summary) => on_rebuild(&summary),
                            Err(e) => log::warn!("[graph/watcher] Rebuild failed: {}", e),
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        log::debug!("[graph/watcher] Event channel closed, stopping");
                        break;
                    }
                }
            }
        });

        log::info!("[graph/watcher] Watching {:?} (debounce {:?})", root, debounce);
        Ok(GraphWatcher { _watcher: watcher, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Markdown files outside hidden and `bak` directories, excluding atomic-write temp files.
fn should_process_path(path: &Path, root: &Path) -> bool {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if file_name.ends_with(TEMP_SUFFIX) {
        return false;
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if extension != "md" {
        return false;
    }

    let relative = path.strip_prefix(root).unwrap_or(path);
    !relative.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || name == "bak"
        }
        _ => false,
    })
}
