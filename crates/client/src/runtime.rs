//! Host runtime glue
//!
//! Native hosts run the engine on tokio. In the browser (`wasm32`) there is
//! no tokio runtime: tasks are queued on the JS event loop with
//! `wasm-bindgen-futures`, timers come from `gloo-timers`, and futures are
//! not `Send` (reqwest's fetch futures hold JS values).
//!
//! [`MaybeSend`] and [`BoxFuture`] carry that difference so the rest of the
//! crate is written once.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;

/// `Send` on native targets, no bound on `wasm32`
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + ?Sized> MaybeSend for T {}

/// `Send` on native targets, no bound on `wasm32`
#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSend for T {}

#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

pub fn boxed<'a, F>(future: F) -> BoxFuture<'a, F::Output>
where
    F: Future + MaybeSend + 'a,
{
    Box::pin(future)
}

/// Marks the task finished when dropped, including on panic or when the
/// runtime drops the task.
struct Finished {
    flag: Arc<AtomicBool>,
    _exited: oneshot::Sender<()>,
}

impl Drop for Finished {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Handle to a spawned background task
#[derive(Debug)]
pub struct TaskHandle {
    finished: Arc<AtomicBool>,
    exited: oneshot::Receiver<()>,
}

impl TaskHandle {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Wait for the task to exit.
    pub async fn join(self) {
        // Only ever resolves as `Canceled`: the sender is dropped, never used.
        let _ = self.exited.await;
    }
}

/// Run `future` in the background on the host runtime.
///
/// Native: must be called from within a tokio runtime.
pub fn spawn<F>(future: F) -> TaskHandle
where
    F: Future<Output = ()> + MaybeSend + 'static,
{
    let finished = Arc::new(AtomicBool::new(false));
    let (tx, rx) = oneshot::channel();
    let guard = Finished { flag: Arc::clone(&finished), _exited: tx };
    let task = async move {
        let _guard = guard;
        future.await;
    };

    #[cfg(not(target_arch = "wasm32"))]
    drop(tokio::spawn(task));
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(task);

    TaskHandle { finished, exited: rx }
}

pub async fn sleep(duration: Duration) {
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
}

/// Fixed-period ticker whose first tick fires one period after creation.
/// A slow consumer delays later ticks instead of bursting.
#[derive(Debug)]
pub struct Ticker {
    #[cfg(not(target_arch = "wasm32"))]
    interval: tokio::time::Interval,
    #[cfg(target_arch = "wasm32")]
    period: Duration,
}

impl Ticker {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            use tokio::time::{interval_at, Instant, MissedTickBehavior};

            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Self { interval }
        }
        #[cfg(target_arch = "wasm32")]
        {
            Self { period }
        }
    }

    pub async fn tick(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        self.interval.tick().await;
        #[cfg(target_arch = "wasm32")]
        sleep(self.period).await;
    }
}
