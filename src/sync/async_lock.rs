use std::{collections::VecDeque, mem, thread};

use super::SpinLock;
use crate::{disposable::Disposable, scheduler::Invocable};

struct AsyncLockState<I> {
  queue: VecDeque<I>,
  is_executing: bool,
  has_faulted: bool,
}

/// A lock with handoff semantics.
///
/// If nobody holds the lock, the submitted action runs immediately on the
/// submitting thread. If somebody holds it, the action is queued and the
/// current holder runs it, in submission order, before letting go. Queued
/// work may therefore run on a different thread than the one that submitted
/// it, but never concurrently with other work of the same lock, and no
/// submitter ever blocks.
///
/// Once disposed, pending work is discarded and new submissions are
/// dropped.
///
/// ```rust
/// use rxcore::sync::AsyncLock;
/// use std::sync::{Arc, Mutex};
///
/// let lock: AsyncLock<Box<dyn FnOnce() + Send>> = AsyncLock::default();
/// let log = Arc::new(Mutex::new(vec![]));
/// let c_log = log.clone();
/// lock.invoke(Box::new(move || c_log.lock().unwrap().push(1)));
/// assert_eq!(*log.lock().unwrap(), vec![1]);
/// ```
pub struct AsyncLock<I> {
  state: SpinLock<AsyncLockState<I>>,
}

impl<I> Default for AsyncLock<I> {
  fn default() -> Self {
    Self {
      state: SpinLock::new(AsyncLockState {
        queue: VecDeque::new(),
        is_executing: false,
        has_faulted: false,
      }),
    }
  }
}

impl<I: Invocable> AsyncLock<I> {
  pub fn new() -> Self { Self::default() }

  /// Run `action` now if the lock is free, otherwise hand it to the current
  /// executor. When this call became the executor it only returns once the
  /// queue is drained.
  pub fn invoke(&self, action: I) {
    let Some(first) = self.enqueue(action) else {
      // Queued (or dropped because faulted); somebody else's concern now.
      return;
    };

    let _executor = ExecutorGuard(self);
    first.invoke();
    while let Some(next) = self.dequeue() {
      next.invoke();
    }
  }

  fn enqueue(&self, action: I) -> Option<I> {
    let mut state = self.state.lock();
    if state.has_faulted {
      return None;
    }
    if state.is_executing {
      state.queue.push_back(action);
      return None;
    }
    state.is_executing = true;
    Some(action)
  }

  fn dequeue(&self) -> Option<I> {
    let mut state = self.state.lock();
    let next = state.queue.pop_front();
    if next.is_none() {
      state.is_executing = false;
    }
    next
  }
}

impl<I> AsyncLock<I> {
  pub fn is_disposed(&self) -> bool { self.state.lock().has_faulted }
}

impl<I: Send> Disposable for AsyncLock<I> {
  fn dispose(&self) {
    let pending = self.state.calculate_locked(|state| {
      state.has_faulted = true;
      mem::take(&mut state.queue)
    });
    tracing::trace!(discarded = pending.len(), "async lock disposed");
    drop(pending);
  }
}

/// Hands the lock back if an action unwinds out of the executor loop, so a
/// later submitter can drain what is left.
struct ExecutorGuard<'a, I>(&'a AsyncLock<I>);

impl<I> Drop for ExecutorGuard<'_, I> {
  fn drop(&mut self) {
    if thread::panicking() {
      self.0.state.perform_locked(|state| state.is_executing = false);
    }
  }
}
