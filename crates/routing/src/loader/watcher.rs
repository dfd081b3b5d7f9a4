//! Filesystem watcher that signals when the config file changes.

use std::ffi::OsString;
use std::path::Path;

use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::error::Result;

/// Call `on_change` whenever `path` is written, created or renamed into place.
///
/// The parent directory is watched so editors that replace the file
/// atomically are still seen. Keep the returned watcher alive for as long
/// as events are wanted.
pub fn watch_config_file<F>(path: &Path, on_change: F) -> Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    let file_name = path.file_name().map(|n| n.to_os_string());
    let shown = path.display().to_string();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_config_change(&event, file_name.as_ref()) {
                info!(path = %shown, "config file changed");
                on_change();
            }
        }
        Err(e) => warn!(error = %e, "config watcher error"),
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "watching config file for changes");
    Ok(watcher)
}

pub(super) fn is_config_change(event: &Event, file_name: Option<&OsString>) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name().map(|n| n.to_os_string()).as_ref() == file_name)
}
