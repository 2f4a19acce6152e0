//! Adaptive poll scheduler.
//!
//! Counts down once per second and fires a refetch when the countdown runs
//! out, doubling the wait each time (8s, 16s, 32s ... capped at 2048s).
//! Once the caller's `finished` predicate holds, the countdown parks at 1 and
//! nothing fires again. The ticking task lives exactly as long as its
//! [`AdaptivePoller`].

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// First wait is `2^INITIAL_EXPONENT` seconds.
pub const INITIAL_EXPONENT: u32 = 3;
pub const MAX_INTERVAL_SECS: u64 = 2048;
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Counting,
    Refetch,
    /// Countdown exhausted but the work is finished; nothing fired.
    Idle,
}

/// Countdown and backoff state, advanced one tick at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    interval: u64,
    remaining: u64,
    refetches: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        let interval = 1u64 << INITIAL_EXPONENT;
        Self {
            interval,
            remaining: interval,
            refetches: 0,
        }
    }
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds until the next refetch. Never below 1.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Length of the current wait in seconds.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn refetches(&self) -> u32 {
        self.refetches
    }

    pub fn tick(&mut self, finished: bool) -> Tick {
        if self.remaining > 1 {
            self.remaining -= 1;
            return Tick::Counting;
        }
        if finished {
            return Tick::Idle;
        }

        self.refetches += 1;
        self.interval = (self.interval * 2).min(MAX_INTERVAL_SECS);
        self.remaining = self.interval;
        Tick::Refetch
    }
}

type RefetchFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Running scheduler. Dropping it stops the ticking task.
pub struct AdaptivePoller {
    refetch: RefetchFn,
    state: watch::Receiver<Backoff>,
    task: Option<JoinHandle<()>>,
}

impl AdaptivePoller {
    /// Start ticking. `refetch` is spawned, not awaited, whenever the
    /// countdown runs out while `finished()` is false; its errors are its
    /// own business.
    pub fn spawn<R, Fut, P>(refetch: R, finished: P) -> Self
    where
        R: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        P: Fn() -> bool + Send + 'static,
    {
        let refetch: RefetchFn = Arc::new(move || refetch().boxed());
        let (state_tx, state) = watch::channel(Backoff::new());

        let tick_refetch = Arc::clone(&refetch);
        let task = tokio::spawn(async move {
            let mut backoff = Backoff::new();
            let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if backoff.tick(finished()) == Tick::Refetch {
                    metrics::counter!("assignment_refetches_total").increment(1);
                    tracing::debug!(
                        refetches = backoff.refetches(),
                        next_interval_secs = backoff.interval(),
                        "Countdown elapsed, refetching"
                    );
                    tokio::spawn(tick_refetch());
                }
                state_tx.send_replace(backoff.clone());
            }
        });

        Self {
            refetch,
            state,
            task: Some(task),
        }
    }

    /// Seconds until the next scheduled refetch.
    pub fn countdown(&self) -> u64 {
        self.state.borrow().remaining()
    }

    pub fn interval(&self) -> u64 {
        self.state.borrow().interval()
    }

    /// Live view of the countdown, updated every tick.
    pub fn subscribe(&self) -> watch::Receiver<Backoff> {
        self.state.clone()
    }

    /// Refetch right away. The countdown and backoff are left untouched.
    pub fn check_now(&self) {
        tokio::spawn((self.refetch)());
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stop ticking. Calling it again does nothing.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Poll scheduler stopped");
        }
    }
}

impl Drop for AdaptivePoller {
    fn drop(&mut self) {
        self.cancel();
    }
}
