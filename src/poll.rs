//! Fixed-interval background polling.
//!
//! Discussion threads and dashboard stats stay fresh through repeating
//! timers. A `Poller` owns its tokio task and aborts it when dropped, so
//! a view that tears down stops receiving updates instead of leaking a
//! timer into an unmounted screen.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Poll cadence for discussion threads
pub const DISCUSSION_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Poll cadence for dashboard stats
pub const DASHBOARD_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Handle to a repeating background task. Dropping the handle cancels
/// the task.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Spawn a task that runs `tick` every `interval`.
    ///
    /// The first tick fires after one full interval, matching a view
    /// that renders freshly-fetched data once before polling.
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // interval's first tick completes immediately; skip it
            timer.tick().await;
            loop {
                timer.tick().await;
                debug!("Poll tick");
                tick().await;
            }
        });

        Self { handle }
    }

    /// Stop polling now rather than at drop time.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
