//! Periodic driver: one sync cycle per interval tick until shutdown
//!
//! Cycles run on tokio's blocking pool and are awaited before the next tick
//! is taken, so two cycles never overlap. Ticks missed while a long cycle
//! runs are skipped rather than replayed.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::engine::{CycleReport, SyncEngine};
use crate::error::{Result, SyncError};
use crate::event::{EventSink, SyncEvent};

/// Runs a [`SyncEngine`] on a fixed interval, reporting to an event sink
pub struct Driver<S> {
    engine: Arc<SyncEngine>,
    sink: Arc<Mutex<S>>,
    interval: Duration,
}

impl<S> Driver<S>
where
    S: EventSink + Send + 'static,
{
    #[must_use]
    pub fn new(engine: SyncEngine, sink: S, interval: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            sink: Arc::new(Mutex::new(sink)),
            interval,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Lock the sink, e.g. to inspect recorded events
    pub fn sink(&self) -> MutexGuard<'_, S> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: &SyncEvent) {
        self.sink().record(event);
    }

    /// Run a single cycle, bracketed by started/completed events
    ///
    /// A failed cycle is recorded as [`SyncEvent::CycleFailed`] instead of
    /// completed.
    ///
    /// # Errors
    /// Returns the cycle's error after recording it
    pub async fn run_once(&self) -> Result<CycleReport> {
        self.record(&SyncEvent::Started);

        let engine = Arc::clone(&self.engine);
        let mut sink = Arc::clone(&self.sink);
        let result = tokio::task::spawn_blocking(move || engine.run_cycle(&mut sink))
            .await
            .unwrap_or_else(|e| Err(SyncError::Task(e.to_string())));

        match &result {
            Ok(_) => self.record(&SyncEvent::Completed),
            Err(err) => {
                error!("synchronization failed: {err}");
                self.record(&SyncEvent::CycleFailed {
                    error: err.to_string(),
                });
            }
        }

        result
    }

    /// Run cycles until `shutdown` resolves, then record the interruption
    ///
    /// The first cycle starts immediately. `shutdown` is checked before each
    /// cycle; a signal that arrives mid-cycle takes effect once the cycle has
    /// finished. A failed cycle does not stop the loop. Returns the number of
    /// cycles started.
    pub async fn run<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0;

        info!(
            source = %self.engine.source().display(),
            replica = %self.engine.replica().display(),
            interval_secs = self.interval.as_secs_f64(),
            "mirroring"
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    cycles += 1;
                    // Failures are already recorded; the next tick retries from scratch
                    let _ = self.run_once().await;
                }
            }
        }

        info!(cycles, "synchronization interrupted");
        self.record(&SyncEvent::Interrupted);
        cycles
    }
}
