//! Debounce plus batch-window scheduling for cycles.
//!
//! A single slot holds the pending timer, a generation counter and the start
//! time of the last cycle, all under one mutex. Every [`Scheduler::notify`]
//! aborts the pending timer and arms a fresh idle timer. When a timer fires it
//! either runs the job or, if the previous cycle started less than
//! `batch_window` ago, re-arms itself for `max(window_remaining, idle)`.
//!
//! The job runs on the blocking pool, outside the lock, so new events keep
//! scheduling the next cycle while the current one runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quiet period required after the last event.
    pub idle: Duration,
    /// Minimum spacing between cycle starts.
    pub batch_window: Duration,
}

type Job = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Slot {
    pending: Option<JoinHandle<()>>,
    generation: u64,
    last_cycle_start: Option<Instant>,
}

struct Inner {
    config: SchedulerConfig,
    job: Job,
    slot: Mutex<Slot>,
    /// Run the job on the timer task instead of the blocking pool.
    #[cfg(test)]
    inline: bool,
}

/// Cheap to clone; clones share the slot. Must be used inside a tokio runtime.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, job: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                job: Arc::new(job),
                slot: Mutex::new(Slot::default()),
                #[cfg(test)]
                inline: false,
            }),
        }
    }

    #[cfg(test)]
    fn inline(config: SchedulerConfig, job: Job) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                job,
                slot: Mutex::new(Slot::default()),
                inline: true,
            }),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    /// Record a qualifying event: restart the idle timer.
    pub fn notify(&self) {
        let mut slot = self.lock();
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        slot.pending = Some(self.arm(generation, self.inner.config.idle));
    }

    /// Drop any pending timer. A cycle already running is left alone.
    pub fn cancel(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    /// True while a timer is armed.
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn arm(&self, generation: u64, delay: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire(generation).await;
        })
    }

    async fn fire(&self, generation: u64) {
        {
            let mut slot = self.lock();
            if slot.generation != generation {
                return;
            }

            let now = Instant::now();
            let SchedulerConfig { idle, batch_window } = self.inner.config;
            if let Some(last) = slot.last_cycle_start {
                let elapsed = now.duration_since(last);
                if elapsed < batch_window {
                    let delay = (batch_window - elapsed).max(idle);
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "batch window open, rescheduling");
                    // Replacing the handle detaches this task rather than aborting it.
                    slot.pending = Some(self.arm(generation, delay));
                    return;
                }
            }

            slot.last_cycle_start = Some(now);
            slot.pending = None;
        }

        let job = self.inner.job.clone();
        #[cfg(test)]
        if self.inner.inline {
            job();
            return;
        }
        if let Err(err) = tokio::task::spawn_blocking(move || job()).await {
            tracing::error!(error = %err, "cycle task panicked");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
