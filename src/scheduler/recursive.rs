//! Self-rescheduling actions.
//!
//! Each step of a recursion is scheduled as a separate item. While a step
//! is pending, its token sits in a [`CompositeDisposable`] so that
//! disposing the recursion cancels it; once the step starts, the token is
//! taken out again. Every step tracks where it is with a [`ScheduleState`]:
//! the step may run (and finish) before `schedule` even returns its token,
//! in which case the token is never added.

use std::{cell::RefCell, mem, sync::Arc, time::Duration};

use super::{ImmediateScheduler, Scheduler};
use crate::{
  disposable::{self, Cancelable, CompositeDisposable, Disposable, DisposeKey},
  sync::{ReentrantLock, SpinLock},
};

#[derive(Clone, Copy, Debug)]
enum ScheduleState {
  Initial,
  Added(DisposeKey),
  Done,
}

type Step = Arc<SpinLock<ScheduleState>>;

fn new_step() -> Step { Arc::new(SpinLock::new(ScheduleState::Initial)) }

// ==================== AnyRecursiveScheduler ====================

type RecursiveAction<S, Sch> = Arc<dyn Fn(S, &AnyRecursiveScheduler<S, Sch>) + Send + Sync>;

struct RecursiveInner<S, Sch> {
  // Guards the action and every step transition. Reentrant because an
  // inline-running step may schedule the next one while the lock is held.
  lock: ReentrantLock<RefCell<Option<RecursiveAction<S, Sch>>>>,
  group: CompositeDisposable,
  scheduler: Sch,
}

/// A handle through which a recursive action reschedules itself, now or
/// after a delay, on the underlying [`Scheduler`].
///
/// ```rust
/// use std::time::Duration;
///
/// use rxcore::prelude::*;
///
/// TestScheduler::init();
/// let token = TestScheduler.schedule_recursive_relative(
///   0,
///   Duration::from_millis(10),
///   |count, recurse| {
///     if count < 3 {
///       recurse.schedule_relative(count + 1, Duration::from_millis(10));
///     }
///   },
/// );
/// TestScheduler::flush();
/// assert_eq!(TestScheduler::now(), Duration::from_millis(40));
/// token.dispose();
/// ```
pub struct AnyRecursiveScheduler<S, Sch> {
  inner: Arc<RecursiveInner<S, Sch>>,
}

impl<S, Sch> Clone for AnyRecursiveScheduler<S, Sch> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<S, Sch> AnyRecursiveScheduler<S, Sch>
where
  S: Send + 'static,
  Sch: Scheduler + Send + Sync + 'static,
{
  pub fn new<F>(scheduler: Sch, action: F) -> Self
  where
    F: Fn(S, &AnyRecursiveScheduler<S, Sch>) + Send + Sync + 'static,
  {
    let action: RecursiveAction<S, Sch> = Arc::new(action);
    Self {
      inner: Arc::new(RecursiveInner {
        lock: ReentrantLock::new(RefCell::new(Some(action))),
        group: CompositeDisposable::new(),
        scheduler,
      }),
    }
  }

  /// Schedule the next step as soon as possible.
  pub fn schedule(&self, state: S) { self.schedule_step(state, None) }

  /// Schedule the next step after `due`.
  pub fn schedule_relative(&self, state: S, due: Duration) { self.schedule_step(state, Some(due)) }

  fn schedule_step(&self, state: S, due: Option<Duration>) {
    let step = new_step();
    let this = self.clone();
    let c_step = step.clone();
    let run = move |state: S| {
      this.run_step(&c_step, state);
      disposable::empty()
    };
    let token = match due {
      Some(due) => self.inner.scheduler.schedule_relative(state, due, run),
      None => self.inner.scheduler.schedule(state, run),
    };

    self.inner.lock.perform_locked(|_| {
      let current = *step.lock();
      match current {
        ScheduleState::Initial => {
          let next = match self.inner.group.insert(token) {
            Some(key) => ScheduleState::Added(key),
            None => ScheduleState::Done,
          };
          *step.lock() = next;
        }
        ScheduleState::Added(_) => panic!("recursive scheduler: invalid schedule state"),
        ScheduleState::Done => {}
      }
    });
  }

  fn run_step(&self, step: &SpinLock<ScheduleState>, state: S) {
    if self.inner.group.is_disposed() {
      tracing::trace!("recursive scheduler disposed, dropping step");
      return;
    }

    let action = self.inner.lock.calculate_locked(|action| {
      let previous = mem::replace(&mut *step.lock(), ScheduleState::Done);
      if let ScheduleState::Added(key) = previous {
        self.inner.group.remove(key);
      }
      action.borrow().clone()
    });

    if let Some(action) = action {
      action(state, self);
    }
  }
}

impl<S, Sch: Send + Sync> Disposable for AnyRecursiveScheduler<S, Sch> {
  fn dispose(&self) {
    let action = self.inner.lock.calculate_locked(|action| action.borrow_mut().take());
    drop(action);
    self.inner.group.dispose();
  }
}

impl<S, Sch: Send + Sync> Cancelable for AnyRecursiveScheduler<S, Sch> {
  fn is_disposed(&self) -> bool { self.inner.group.is_disposed() }
}

// ==================== RecursiveImmediateScheduler ====================

type ImmediateAction<S> = Arc<dyn Fn(S, &dyn Fn(S)) + Send + Sync>;

struct ImmediateInner<S, Sch> {
  action: SpinLock<Option<ImmediateAction<S>>>,
  group: CompositeDisposable,
  scheduler: Sch,
}

/// The immediate-only counterpart of [`AnyRecursiveScheduler`]: the action
/// receives a plain `recurse` callback that schedules the next step without
/// delay.
pub struct RecursiveImmediateScheduler<S, Sch> {
  inner: Arc<ImmediateInner<S, Sch>>,
}

impl<S, Sch> Clone for RecursiveImmediateScheduler<S, Sch> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<S, Sch> RecursiveImmediateScheduler<S, Sch>
where
  S: Send + 'static,
  Sch: ImmediateScheduler + Send + Sync + 'static,
{
  pub fn new<F>(scheduler: Sch, action: F) -> Self
  where
    F: Fn(S, &dyn Fn(S)) + Send + Sync + 'static,
  {
    let action: ImmediateAction<S> = Arc::new(action);
    Self {
      inner: Arc::new(ImmediateInner {
        action: SpinLock::new(Some(action)),
        group: CompositeDisposable::new(),
        scheduler,
      }),
    }
  }

  /// Schedule the next step.
  pub fn schedule(&self, state: S) {
    let step = new_step();
    let this = self.clone();
    let c_step = step.clone();
    let token = self.inner.scheduler.schedule(state, move |state| {
      this.run_step(&c_step, state);
      disposable::empty()
    });

    // Insert first, then publish the key; a step that already ran makes
    // the freshly inserted token stale.
    let Some(key) = self.inner.group.insert(token) else {
      return;
    };
    let stale = self.inner.action.calculate_locked(|_| {
      let mut step = step.lock();
      match *step {
        ScheduleState::Initial => {
          *step = ScheduleState::Added(key);
          false
        }
        ScheduleState::Added(_) => panic!("recursive scheduler: invalid schedule state"),
        ScheduleState::Done => true,
      }
    });
    if stale {
      self.inner.group.remove(key);
    }
  }

  fn run_step(&self, step: &SpinLock<ScheduleState>, state: S) {
    if self.inner.group.is_disposed() {
      tracing::trace!("recursive scheduler disposed, dropping step");
      return;
    }

    let (previous, action) = self.inner.action.calculate_locked(|action| {
      let previous = mem::replace(&mut *step.lock(), ScheduleState::Done);
      (previous, action.clone())
    });
    if let ScheduleState::Added(key) = previous {
      self.inner.group.remove(key);
    }

    if let Some(action) = action {
      action(state, &|next| self.schedule(next));
    }
  }
}

impl<S, Sch: Send + Sync> Disposable for RecursiveImmediateScheduler<S, Sch> {
  fn dispose(&self) {
    let action = self.inner.action.calculate_locked(Option::take);
    drop(action);
    self.inner.group.dispose();
  }
}

impl<S, Sch: Send + Sync> Cancelable for RecursiveImmediateScheduler<S, Sch> {
  fn is_disposed(&self) -> bool { self.inner.group.is_disposed() }
}
