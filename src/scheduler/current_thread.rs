use std::{cell::RefCell, collections::VecDeque};

use super::{ImmediateScheduler, Invocable, ScheduledItem};
use crate::disposable::{BoxedCancelable, BoxedDisposable};

type Job = Box<dyn FnOnce()>;

thread_local! {
  // `Some` while a trampoline is draining on this thread.
  static TRAMPOLINE: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Runs work on the calling thread, one item at a time.
///
/// The outermost `schedule` on a thread runs its action inline and then
/// drains everything scheduled while it ran, in FIFO order. Nested
/// `schedule` calls only enqueue, so an action that keeps scheduling more
/// work never grows the stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
  /// Whether a call to `schedule` on this thread would run its action
  /// inline, i.e. no trampoline is draining yet.
  pub fn is_schedule_required() -> bool { TRAMPOLINE.with(|queue| queue.borrow().is_none()) }

  fn try_enqueue<I: Invocable + 'static>(item: I) -> Result<(), I> {
    TRAMPOLINE.with(|queue| match queue.borrow_mut().as_mut() {
      Some(queue) => {
        queue.push_back(Box::new(move || item.invoke()));
        Ok(())
      }
      None => Err(item),
    })
  }

  fn next_job() -> Option<Job> {
    TRAMPOLINE.with(|queue| queue.borrow_mut().as_mut().and_then(VecDeque::pop_front))
  }
}

/// Owns the trampoline of the current thread; tears it down even if an
/// action panics.
struct TrampolineGuard;

impl TrampolineGuard {
  fn install() -> Self {
    TRAMPOLINE.with(|queue| *queue.borrow_mut() = Some(VecDeque::new()));
    TrampolineGuard
  }
}

impl Drop for TrampolineGuard {
  fn drop(&mut self) {
    let abandoned = TRAMPOLINE.with(|queue| queue.borrow_mut().take());
    drop(abandoned);
  }
}

impl ImmediateScheduler for CurrentThreadScheduler {
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    let item = ScheduledItem::new(state, action);
    let token = item.cancel_handle();
    let Err(item) = Self::try_enqueue(item) else {
      return Box::new(token);
    };

    let _trampoline = TrampolineGuard::install();
    item.invoke();
    while let Some(job) = Self::next_job() {
      job();
    }
    Box::new(token)
  }
}
