//! Refresh scheduler
//!
//! Background task that polls at a fixed interval while the session is
//! authenticated. It does not wake at token expiry; an expired access token
//! is noticed within one interval.
//!
//! The task follows the `AuthState` watch channel: it is idle while
//! unauthenticated, starts a fresh interval when authentication begins, and
//! stops ticking as soon as authentication ends. Cancelling the handle (or
//! dropping it) stops the task.

use std::future::Future;
use std::time::Duration;

use authway_domain::AuthState;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::runtime::{self, MaybeSend, TaskHandle, Ticker};

/// Owner of a running scheduler task
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: Option<TaskHandle>,
}

impl SchedulerHandle {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.join().await;
        }
        info!("refresh scheduler stopped");
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns the polling task
#[derive(Debug, Clone, Copy)]
pub struct RefreshScheduler {
    period: Duration,
}

impl RefreshScheduler {
    /// # Arguments
    /// * `period` - Time between ticks while authenticated (must be non-zero)
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the task on the host runtime (tokio natively, the JS event loop
    /// on `wasm32`).
    ///
    /// `on_tick` runs once per interval while `state` reports an
    /// authenticated session. Ticks never overlap: a slow tick delays the
    /// next one.
    pub fn spawn<F, Fut>(&self, state: watch::Receiver<AuthState>, on_tick: F) -> SchedulerHandle
    where
        F: Fn() -> Fut + MaybeSend + 'static,
        Fut: Future<Output = ()> + MaybeSend + 'static,
    {
        let cancel = CancellationToken::new();
        let task = runtime::spawn(run(self.period, state, cancel.clone(), on_tick));
        info!(period = ?self.period, "refresh scheduler started");
        SchedulerHandle { cancel, task: Some(task) }
    }
}

async fn run<F, Fut>(
    period: Duration,
    mut state: watch::Receiver<AuthState>,
    cancel: CancellationToken,
    on_tick: F,
) where
    F: Fn() -> Fut + MaybeSend + 'static,
    Fut: Future<Output = ()> + MaybeSend + 'static,
{
    loop {
        if !state.borrow_and_update().is_authenticated() {
            tokio::select! {
                biased;

                () = cancel.cancelled() => return,
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
            }
        }

        debug!("session authenticated; polling for expiry");
        let mut ticker = Ticker::new(period);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => return,
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !state.borrow_and_update().is_authenticated() {
                        debug!("session ended; scheduler idle");
                        break;
                    }
                }
                () = ticker.tick() => {
                    debug!("refresh tick");
                    tokio::select! {
                        biased;

                        () = cancel.cancelled() => return,
                        () = on_tick() => {}
                    }
                }
            }
        }
    }
}
