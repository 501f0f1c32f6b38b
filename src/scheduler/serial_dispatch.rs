use std::{sync::Arc, time::Duration};

use super::{
  ImmediateScheduler, Invocable, ScheduledItem, Scheduler, SchedulerError, SerialDispatchQueue,
};
use crate::disposable::{
  BooleanDisposable, BoxedCancelable, BoxedDisposable, SingleAssignmentDisposable,
};

/// Runs work on a [`SerialDispatchQueue`], always by enqueueing it, even
/// when called from the queue's own worker.
#[derive(Clone, Debug)]
pub struct SerialDispatchQueueScheduler {
  queue: SerialDispatchQueue,
}

impl SerialDispatchQueueScheduler {
  pub fn new(queue: SerialDispatchQueue) -> Self { Self { queue } }

  /// Start a dedicated queue named `label` and schedule onto it.
  pub fn with_label(label: impl Into<String>) -> Result<Self, SchedulerError> {
    SerialDispatchQueue::new(label).map(Self::new)
  }

  pub fn queue(&self) -> &SerialDispatchQueue { &self.queue }
}

/// Enqueue `action` on `queue`, after `delay` if given. `finished` runs on
/// the worker right after the item, whether or not it was cancelled.
pub(crate) fn dispatch_item<S, F>(
  queue: &SerialDispatchQueue, delay: Option<Duration>, state: S, action: F,
  finished: impl FnOnce() + Send + 'static,
) -> Result<Arc<SingleAssignmentDisposable>, SchedulerError>
where
  S: Send + 'static,
  F: FnOnce(S) -> BoxedDisposable + Send + 'static,
{
  let item = ScheduledItem::new(state, action);
  let token = item.cancel_handle();
  let job = move || {
    item.invoke();
    finished();
  };
  match delay {
    Some(delay) => queue.dispatch_after(delay, job)?,
    None => queue.dispatch(job)?,
  }
  Ok(token)
}

/// The token handed out when work could not be enqueued.
pub(crate) fn rejected(err: &SchedulerError) -> BoxedCancelable {
  tracing::warn!(%err, "dropping scheduled work");
  Box::new(BooleanDisposable::disposed())
}

impl ImmediateScheduler for SerialDispatchQueueScheduler {
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    match dispatch_item(&self.queue, None, state, action, || {}) {
      Ok(token) => Box::new(token),
      Err(err) => rejected(&err),
    }
  }
}

impl Scheduler for SerialDispatchQueueScheduler {
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
