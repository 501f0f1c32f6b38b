use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  time::Duration,
};

use once_cell::sync::Lazy;

use super::{
  serial_dispatch::{dispatch_item, rejected},
  ImmediateScheduler, Scheduler, SerialDispatchQueue, SerialDispatchQueueScheduler,
};
use crate::disposable::{BoxedCancelable, BoxedDisposable, SingleAssignmentDisposable};

static MAIN_SCHEDULER: Lazy<MainScheduler> =
  Lazy::new(|| MainScheduler::new(SerialDispatchQueue::main()));

/// Schedules work onto a serial queue, usually the main queue.
///
/// When `schedule` is called from the queue's own worker and nothing else
/// scheduled through this instance is still waiting, the action runs
/// inline instead of being marshaled. Anything else is enqueued, which
/// keeps the relative order of all work scheduled through the instance.
///
/// Relative scheduling always goes through the queue.
#[derive(Clone, Debug)]
pub struct MainScheduler {
  queue: SerialDispatchQueue,
  number_enqueued: Arc<AtomicUsize>,
}

impl MainScheduler {
  /// A scheduler for `queue`, which must be serial.
  pub fn new(queue: SerialDispatchQueue) -> Self {
    Self { queue, number_enqueued: Arc::new(AtomicUsize::new(0)) }
  }

  /// The shared scheduler of the main queue.
  pub fn instance() -> Self { MAIN_SCHEDULER.clone() }

  /// A scheduler for the main queue that never takes the inline path.
  pub fn async_instance() -> SerialDispatchQueueScheduler {
    SerialDispatchQueueScheduler::new(SerialDispatchQueue::main())
  }

  pub fn queue(&self) -> &SerialDispatchQueue { &self.queue }

  /// Assert that the caller runs on this scheduler's queue.
  ///
  /// # Panics
  ///
  /// Panics with `message`, or a default message, when called from any
  /// other thread.
  pub fn ensure_executing_on_scheduler(&self, message: Option<&str>) {
    if !self.queue.is_current() {
      panic!(
        "{}",
        message.unwrap_or("executing on a background thread, expected the scheduler's queue")
      );
    }
  }
}

/// Decrements the enqueued counter even if the inline action panics.
struct Dequeued<'a>(&'a AtomicUsize);

impl Drop for Dequeued<'_> {
  fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

impl ImmediateScheduler for MainScheduler {
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    let previous = self.number_enqueued.fetch_add(1, Ordering::SeqCst);

    if self.queue.is_current() && previous == 0 {
      tracing::trace!(queue = self.queue.label(), "running scheduled work inline");
      let disposable = {
        let _dequeued = Dequeued(&self.number_enqueued);
        action(state)
      };
      let token = SingleAssignmentDisposable::new();
      token.set_disposable(disposable);
      return Box::new(token);
    }

    let counter = self.number_enqueued.clone();
    let finished = move || {
      counter.fetch_sub(1, Ordering::SeqCst);
    };
    match dispatch_item(&self.queue, None, state, action, finished) {
      Ok(token) => Box::new(token),
      Err(err) => {
        self.number_enqueued.fetch_sub(1, Ordering::SeqCst);
        rejected(&err)
      }
    }
  }
}

impl Scheduler for MainScheduler {
  fn schedule_relative<S, F>(&self, state: S, due: Duration, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    match dispatch_item(&self.queue, Some(due), state, action, || {}) {
      Ok(token) => Box::new(token),
      Err(err) => rejected(&err),
    }
  }
}
