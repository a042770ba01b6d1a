//! Filesystem events in, scheduler notifications out.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use drafter_core::paths::STATE_DIR;

use crate::error::DaemonError;
use crate::scheduler::Scheduler;

/// How long shutdown waits for the notify backend to release its thread.
pub const WATCHER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

const VCS_DIR: &str = ".git";

pub fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Paths inside `.git` or drafter's own state directory never trigger a cycle.
pub fn is_ignored_path(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|c| match c {
        Component::Normal(name) => name == VCS_DIR || name == STATE_DIR,
        _ => false,
    })
}

/// True when at least one path in `event` should restart the idle timer.
pub fn should_schedule(root: &Path, event: &Event) -> bool {
    is_relevant_event_kind(&event.kind)
        && event
            .paths
            .iter()
            .any(|path| !is_ignored_path(root, path) && !path.is_dir())
}

/// Watch `root` recursively until shutdown, notifying `scheduler` per qualifying event.
pub(crate) async fn watch_task(
    root: PathBuf,
    scheduler: Scheduler,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    // FSEvents reports real paths (/private/var/... on macOS).
    let root = fs::canonicalize(&root).unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    tracing::info!(root = %root.display(), "watching for changes");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    Ok(event) if should_schedule(&root, &event) => {
                        tracing::trace!(paths = ?event.paths, "change observed");
                        scheduler.notify();
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "watcher event error"),
                }
            }
        }
    }

    scheduler.cancel();
    let release = tokio::task::spawn_blocking(move || drop(watcher));
    if tokio::time::timeout(WATCHER_JOIN_TIMEOUT, release).await.is_err() {
        tracing::warn!("file watcher did not stop in time");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn access_events_are_not_relevant() {
        assert!(!is_relevant_event_kind(&EventKind::Access(AccessKind::Any)));
        assert!(is_relevant_event_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_event_kind(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_relevant_event_kind(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn metadata_directories_are_ignored() {
        let root = Path::new("/repo");
        assert!(is_ignored_path(root, Path::new("/repo/.git/index")));
        assert!(is_ignored_path(root, Path::new("/repo/.drafter/audit.jsonl")));
        assert!(is_ignored_path(root, Path::new("/repo/sub/.git/HEAD")));
        assert!(!is_ignored_path(root, Path::new("/repo/src/main.rs")));
        assert!(!is_ignored_path(root, Path::new("/repo/.gitignore")));
    }

    #[test]
    fn directories_do_not_schedule() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir(root.join("nested")).unwrap();
        std::fs::write(root.join("file.txt"), "x").unwrap();

        let kind = EventKind::Create(CreateKind::Any);
        assert!(!should_schedule(root, &event(kind, &root.join("nested"))));
        assert!(should_schedule(root, &event(kind, &root.join("file.txt"))));
        assert!(!should_schedule(
            root,
            &event(EventKind::Access(AccessKind::Any), &root.join("file.txt"))
        ));
    }
}
