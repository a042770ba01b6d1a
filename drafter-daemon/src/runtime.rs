use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use drafter_core::DrafterConfig;
use drafter_cycle::{push_allowed, CycleEngine, CycleReport};

use crate::error::{io_err, DaemonError};
use crate::log_rotation::{rotate_repo_log, Rotation};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::status::{self, StatusStore};
use crate::watcher;

const ROTATION_INTERVAL: Duration = Duration::from_secs(5);

/// Start the watcher runtime and block the current thread until it exits.
pub fn start_blocking(root: &Path, config: DrafterConfig) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(root.to_path_buf(), config))
}

/// Watch `root`, run cycles as the scheduler allows, and serve status until
/// Ctrl-C. A failing cycle is logged; it never stops the runtime.
pub async fn run(root: PathBuf, config: DrafterConfig) -> Result<(), DaemonError> {
    let scheduler_config = SchedulerConfig {
        idle: config.idle_duration()?,
        batch_window: config.batch_window_duration()?,
    };
    let store = StatusStore::default();
    let engine = Arc::new(Mutex::new(drafter_cycle::open(&root, config.clone())));
    let scheduler = Scheduler::new(
        scheduler_config,
        cycle_job(engine, store.clone(), config.clone()),
    );
    let listener = status::bind(config.status_port).await?;

    tracing::info!(
        root = %root.display(),
        mode = %config.mode,
        idle = %config.idle,
        batch_window = %config.batch_window,
        "drafter watcher started",
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let root = root.clone();
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let result = watcher::watch_task(root, scheduler, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let status_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = status::serve(listener, store, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let root = root.clone();
        tokio::spawn(async move {
            let result = rotation_task(root, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, stopping watcher");
                        let _ = shutdown.send(());
                        Ok(())
                    }
                    Err(err) => Err(DaemonError::Runtime(format!("ctrl-c handler failed: {err}"))),
                }
            }
        })
    };

    let (watcher_result, status_result, rotation_result, signal_result) =
        tokio::join!(watcher_handle, status_handle, rotation_handle, signal_handle);

    scheduler.cancel();
    handle_join("watcher", watcher_result)?;
    handle_join("status_server", status_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// The scheduled job: one cycle under the engine lock, then publish.
///
/// Holding the lock for the whole cycle serialises runs that outlast the batch
/// window, so two cycles never share the index.
fn cycle_job(
    engine: Arc<Mutex<CycleEngine>>,
    store: StatusStore,
    config: DrafterConfig,
) -> impl Fn() + Send + Sync + 'static {
    move || {
        let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
        let mode = engine.config().mode;
        let confirm = |report: &CycleReport| push_allowed(&config, report);
        match engine.execute_with(mode, &confirm) {
            Ok(report) => store.publish(report.record()),
            Err(err) => tracing::error!(error = %err, "cycle failed"),
        }
    }
}

async fn rotation_task(
    root: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(ROTATION_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let root = root.clone();
                tokio::task::spawn_blocking(move || rotate_repo_log(&root, Rotation::default()))
                    .await
                    .ok();
            }
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!("{task} task join failure: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use drafter_core::{DiffStat, Mode};
    use drafter_cycle::CycleStatus;
    use drafter_plan::Planner;
    use drafter_vcs::{Vcs, VcsError};

    /// Clean worktree that counts how often, and how concurrently, it was asked.
    #[derive(Clone, Default)]
    struct Quiet {
        calls: Arc<AtomicUsize>,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Vcs for Quiet {
        fn changed_files(&self) -> Result<Vec<String>, VcsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        fn diff(&self, _: bool, _: &[String]) -> Result<String, VcsError> {
            Ok(String::new())
        }
        fn diff_stat(&self) -> Result<DiffStat, VcsError> {
            Ok(DiffStat::default())
        }
        fn current_branch(&self) -> Result<String, VcsError> {
            Ok("main".into())
        }
        fn stage(&self, _: &[String]) -> Result<(), VcsError> {
            unreachable!("clean tree never stages")
        }
        fn reset_index(&self) -> Result<(), VcsError> {
            unreachable!("clean tree never resets")
        }
        fn commit(&self, _: &str) -> Result<(), VcsError> {
            unreachable!("clean tree never commits")
        }
        fn tag(&self, _: &str, _: &str) -> Result<(), VcsError> {
            unreachable!("clean tree never tags")
        }
        fn push(&self, _: &str, _: &str, _: bool) -> Result<(), VcsError> {
            unreachable!("clean tree never pushes")
        }
    }

    fn engine_over(vcs: &Quiet, dir: &Path, config: &DrafterConfig) -> Arc<Mutex<CycleEngine>> {
        Arc::new(Mutex::new(CycleEngine::new(
            dir,
            config.clone(),
            Box::new(vcs.clone()),
            Planner::heuristic_only(),
        )))
    }

    #[test]
    fn job_publishes_each_cycle() {
        let dir = tempfile::TempDir::new().unwrap();
        let vcs = Quiet::default();
        let mut config = DrafterConfig::default();
        config.mode = Mode::Commit;
        let store = StatusStore::default();
        let job = cycle_job(engine_over(&vcs, dir.path(), &config), store.clone(), config);

        assert_eq!(store.payload(), serde_json::json!({ "status": "idle" }));
        job();
        job();

        assert_eq!(vcs.calls.load(Ordering::SeqCst), 2);
        let latest = store.latest().unwrap();
        assert_eq!(latest.status, CycleStatus::NoChanges);
        assert_eq!(store.payload()["message"], "No changes detected.");
        assert!(dir.path().join(".drafter/audit.jsonl").exists());
    }

    #[test]
    fn concurrent_jobs_never_overlap() {
        let dir = tempfile::TempDir::new().unwrap();
        let vcs = Quiet {
            delay: Duration::from_millis(50),
            ..Quiet::default()
        };
        let mut config = DrafterConfig::default();
        config.mode = Mode::Commit;
        let job = Arc::new(cycle_job(
            engine_over(&vcs, dir.path(), &config),
            StatusStore::default(),
            config,
        ));

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let job = Arc::clone(&job);
                std::thread::spawn(move || (*job)())
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(vcs.calls.load(Ordering::SeqCst), 3);
        assert_eq!(vcs.peak.load(Ordering::SeqCst), 1);
    }
}
