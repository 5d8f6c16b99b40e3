//! Background revalidation for mounted views.
//!
//! While a view is mounted its collections are revalidated on a fixed
//! interval and whenever the page goes from hidden back to visible. The
//! returned [`TriggerHandle`] owns the task; tearing it down (or dropping
//! it) stops all triggers.

use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use auberge_shared::constants::{
    DEFAULT_REVALIDATE_INTERVAL_SECS, MAX_REVALIDATE_INTERVAL_SECS, MIN_REVALIDATE_INTERVAL_SECS,
};
use auberge_shared::Collection;

use crate::store::CatalogStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    pub interval: Duration,
}

impl TriggerConfig {
    /// Interval in seconds, clamped to the supported polling range.
    pub fn with_interval_secs(secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(
                secs.clamp(MIN_REVALIDATE_INTERVAL_SECS, MAX_REVALIDATE_INTERVAL_SECS),
            ),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::with_interval_secs(DEFAULT_REVALIDATE_INTERVAL_SECS)
    }
}

pub struct InvalidationTriggers;

impl InvalidationTriggers {
    /// Start revalidating `collections` until the handle is torn down.
    pub fn mount(
        store: CatalogStore,
        collections: Vec<Collection>,
        config: TriggerConfig,
        mut visibility: watch::Receiver<Visibility>,
    ) -> TriggerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let period = config.interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut last = *visibility.borrow_and_update();
            let mut watching = true;

            debug!(?collections, interval_secs = period.as_secs(), "Invalidation triggers mounted");

            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => break,

                    _ = ticker.tick() => {
                        revalidate_all(&store, &collections, "interval");
                    }

                    changed = visibility.changed(), if watching => {
                        if changed.is_err() {
                            // visibility source is gone; keep polling on the timer
                            watching = false;
                            continue;
                        }
                        let now = *visibility.borrow_and_update();
                        if last == Visibility::Hidden && now == Visibility::Visible {
                            revalidate_all(&store, &collections, "visibility");
                        }
                        last = now;
                    }
                }
            }

            debug!(?collections, "Invalidation triggers torn down");
        });

        TriggerHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

fn revalidate_all(store: &CatalogStore, collections: &[Collection], cause: &'static str) {
    for &collection in collections {
        trace!(collection = %collection, cause, "Trigger fired");
        store.schedule_revalidation(collection);
    }
}

/// Owns a mounted trigger task. Dropping the handle aborts the task.
pub struct TriggerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TriggerHandle {
    /// Stop all triggers and wait for the task to exit.
    pub async fn teardown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
