//! Configuration file watcher for hot reload.
//!
//! Watches the directory containing the config file (so atomic
//! write-then-rename updates are still observed) and emits a freshly parsed
//! [`AppConfig`] on every relevant change. Parse failures keep the previous
//! configuration in effect.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;

/// Watches the configuration file and emits re-parsed configs on change.
pub struct ConfigWatcher {
    path: PathBuf,
    reload_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for the given config file.
    ///
    /// Returns the watcher and the receiver for reload events.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                reload_tx,
            },
            reload_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The returned [`RecommendedWatcher`] must be kept alive for the watch
    /// to stay active.
    pub fn run(self) -> Result<RecommendedWatcher> {
        let path = self.path.clone();
        let tx = self.reload_tx;

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &path, &tx),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;

        // Watch the parent directory: editors and our own source-list editor
        // replace the file via rename, which would orphan a file-level watch.
        let watch_dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

        info!(path = %self.path.display(), "watching configuration file for changes");
        Ok(watcher)
    }
}

/// Handle a single filesystem event: reload the config if it targets our file.
fn handle_fs_event(event: &Event, config_path: &Path, tx: &mpsc::UnboundedSender<AppConfig>) {
    let is_relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    if !is_relevant {
        return;
    }

    let target_name = config_path.file_name();
    if !event.paths.iter().any(|p| p.file_name() == target_name) {
        return;
    }

    match AppConfig::load(config_path) {
        Ok(config) => {
            info!(path = %config_path.display(), "configuration file changed, reloading");
            let _ = tx.send(config);
        }
        Err(e) => {
            warn!(
                path = %config_path.display(),
                error = %e,
                "failed to reload configuration, keeping previous version"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::fs;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn event_for_config_file_emits_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "sub-urls:\n  - https://a.example/sub\n");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let event = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone());
        handle_fs_event(&event, &path, &tx);

        let config = rx.try_recv().unwrap();
        assert_eq!(config.sub_urls, vec!["https://a.example/sub"]);
    }

    #[test]
    fn event_for_other_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "sub-urls: []\n");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(dir.path().join("other.yaml"));
        handle_fs_event(&event, &path, &tx);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unparsable_config_keeps_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "sub-urls: [unclosed\n");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let event = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone());
        handle_fs_event(&event, &path, &tx);

        assert!(rx.try_recv().is_err(), "no reload event for a bad config");
    }
}
