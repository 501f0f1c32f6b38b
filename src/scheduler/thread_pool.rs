use std::time::Duration;

use futures::executor::ThreadPool;

use super::{ImmediateScheduler, Invocable, ScheduledItem, Scheduler, SchedulerError};
use crate::disposable::{BoxedCancelable, BoxedDisposable};

/// Runs work on a `futures` thread pool. Work scheduled through it may run
/// concurrently; delays are timed with `futures-time`.
#[derive(Clone, Debug)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// A scheduler over a new pool with one worker per CPU.
  pub fn new() -> Result<Self, SchedulerError> {
    ThreadPool::new().map(Self::with_pool).map_err(SchedulerError::ThreadPool)
  }

  pub fn with_pool(pool: ThreadPool) -> Self { Self { pool } }
}

impl ImmediateScheduler for ThreadPoolScheduler {
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    let item = ScheduledItem::new(state, action);
    let token = item.cancel_handle();
    self.pool.spawn_ok(async move { item.invoke() });
    Box::new(token)
  }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule_relative<S, F>(&self, state: S, due: Duration, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    let item = ScheduledItem::new(state, action);
    let token = item.cancel_handle();
    self.pool.spawn_ok(async move {
      futures_time::task::sleep(due.into()).await;
      item.invoke();
    });
    Box::new(token)
  }
}
