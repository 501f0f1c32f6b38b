use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, task::AbortHandle};

use super::{ImmediateScheduler, Invocable, ScheduledItem, Scheduler};
use crate::disposable::{
  BoxedCancelable, BoxedDisposable, Cancelable, Disposable, SingleAssignmentDisposable,
};

/// Runs work as tasks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle } }

  /// A scheduler for the runtime the caller runs in.
  ///
  /// # Panics
  ///
  /// Panics when called outside of a tokio runtime.
  pub fn current() -> Self { Self::new(Handle::current()) }

  fn spawn<S, F>(&self, item: ScheduledItem<S, F>, due: Option<Duration>) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    let token = item.cancel_handle();
    let task = self.handle.spawn(async move {
      if let Some(due) = due {
        tokio::time::sleep(due).await;
      }
      item.invoke();
    });
    Box::new(TaskDisposable { token, task: task.abort_handle() })
  }
}

/// Cancels the item and aborts its task, so a pending delay does not keep
/// the runtime busy.
struct TaskDisposable {
  token: Arc<SingleAssignmentDisposable>,
  task: AbortHandle,
}

impl Disposable for TaskDisposable {
  fn dispose(&self) {
    self.token.dispose();
    self.task.abort();
  }
}

impl Cancelable for TaskDisposable {
  fn is_disposed(&self) -> bool { self.token.is_disposed() }
}

impl ImmediateScheduler for TokioScheduler {
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    self.spawn(ScheduledItem::new(state, action), None)
  }
}

impl Scheduler for TokioScheduler {
  fn schedule_relative<S, F>(&self, state: S, due: Duration, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    self.spawn(ScheduledItem::new(state, action), Some(due))
  }
}
