//! Scheduler abstractions.
//!
//! A scheduler decides *where* and *when* a unit of work runs. Every
//! scheduling operation returns a [`Cancelable`](crate::disposable::Cancelable)
//! token; disposing it before the work starts prevents the work from
//! running, disposing it afterwards disposes whatever the work returned.
//!
//! | Scheduler | Runs work |
//! |-----------|-----------|
//! | [`CurrentThreadScheduler`] | on the calling thread, trampolined |
//! | [`SerialDispatchQueueScheduler`] | on a serial queue's worker thread, always marshaled |
//! | [`MainScheduler`] | on the main queue, inline when already there and idle |
//! | [`ThreadPoolScheduler`] | on a `futures` thread pool |
//! | [`TokioScheduler`] | on a tokio runtime |
//! | [`TestScheduler`] | on the calling thread, in virtual time |
//!
//! Cancellation is cooperative: it is checked right before work starts and
//! never interrupts work that is already running.

use std::{io, time::Duration};

use crate::disposable::{BoxedCancelable, BoxedDisposable};

mod current_thread;
mod dispatch_queue;
mod main_scheduler;
mod recursive;
mod scheduled_item;
mod serial_dispatch;
mod test_scheduler;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
mod thread_pool;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use current_thread::CurrentThreadScheduler;
pub use dispatch_queue::{QueueOptions, SerialDispatchQueue};
pub use main_scheduler::MainScheduler;
pub use recursive::{AnyRecursiveScheduler, RecursiveImmediateScheduler};
pub use scheduled_item::{Invocable, ScheduledItem};
pub use serial_dispatch::SerialDispatchQueueScheduler;
pub use test_scheduler::TestScheduler;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use thread_pool::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

// ==================== Errors ====================

/// Failures of scheduler infrastructure.
///
/// Scheduling operations themselves never fail: when work cannot be
/// marshaled they log a warning and return an already disposed token.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  #[error("failed to spawn the worker thread of dispatch queue `{label}`")]
  Spawn {
    label: String,
    #[source]
    source: io::Error,
  },
  #[error("dispatch queue `{0}` is no longer running")]
  QueueClosed(String),
  #[error("failed to build the thread pool")]
  ThreadPool(#[source] io::Error),
}

// ==================== Traits ====================

/// Schedules work to run as soon as possible.
pub trait ImmediateScheduler {
  /// Schedule `action` to run with `state`.
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static;

  /// Schedule `action` and let it reschedule itself through the `recurse`
  /// callback it receives. Each step goes back through this scheduler, so
  /// recursion does not grow the stack on a trampolining or marshaling
  /// scheduler. Disposing the returned token cancels the pending step.
  fn schedule_recursive<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    Self: Clone + Send + Sync + Sized + 'static,
    S: Send + 'static,
    F: Fn(S, &dyn Fn(S)) + Send + Sync + 'static,
  {
    let recursive = RecursiveImmediateScheduler::new(self.clone(), action);
    recursive.schedule(state);
    Box::new(recursive)
  }
}

/// Schedules work now or after a relative delay.
pub trait Scheduler: ImmediateScheduler {
  /// Schedule `action` to run with `state` once `due` has elapsed.
  fn schedule_relative<S, F>(&self, state: S, due: Duration, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static;

  /// Schedule `action` after `due` and let it reschedule itself, with or
  /// without a delay, through the [`AnyRecursiveScheduler`] it receives.
  /// Disposing the returned token cancels the whole recursion.
  fn schedule_recursive_relative<S, F>(&self, state: S, due: Duration, action: F) -> BoxedCancelable
  where
    Self: Clone + Send + Sync + Sized + 'static,
    S: Send + 'static,
    F: Fn(S, &AnyRecursiveScheduler<S, Self>) + Send + Sync + 'static,
  {
    let recursive = AnyRecursiveScheduler::new(self.clone(), action);
    recursive.schedule_relative(state, due);
    Box::new(recursive)
  }
}
