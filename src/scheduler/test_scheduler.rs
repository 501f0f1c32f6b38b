//! Virtual-time scheduler for deterministic tests.
//!
//! Time only moves when a test says so, so delayed and recursive work can be
//! stepped through without sleeping.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rxcore::prelude::*;
//!
//! TestScheduler::init();
//! TestScheduler.schedule_relative((), Duration::from_millis(100), |_| {
//!   println!("fired at {:?}", TestScheduler::now());
//!   disposable::empty()
//! });
//!
//! TestScheduler::advance_by(Duration::from_millis(99));
//! assert_eq!(TestScheduler::pending_count(), 1);
//! TestScheduler::advance_by(Duration::from_millis(1));
//! assert!(TestScheduler::is_empty());
//! ```
//!
//! The state is thread-local: every thread has its own clock and queue, so
//! tests running in parallel do not see each other's work.

use std::{cell::RefCell, cmp::Ordering, collections::BinaryHeap, time::Duration};

use super::{ImmediateScheduler, Invocable, ScheduledItem, Scheduler};
use crate::disposable::{BoxedCancelable, BoxedDisposable};

// ==================== Internal State ====================

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<VirtualTask>,
  next_task_id: usize,
  initialized: bool,
}

struct VirtualTask {
  scheduled_time: Duration,
  task_id: usize,
  job: Box<dyn FnOnce()>,
}

impl PartialEq for VirtualTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for VirtualTask {}

impl PartialOrd for VirtualTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for VirtualTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

thread_local! {
  static TEST_SCHEDULER_STATE: RefCell<TestSchedulerState>
    = RefCell::new(TestSchedulerState::default());
}

// ==================== TestScheduler ====================

/// A virtual time scheduler.
///
/// Zero-sized; all instances on a thread share that thread's clock and
/// queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestScheduler;

impl TestScheduler {
  /// Reset the clock to zero and drop all pending work. Call this at the
  /// start of every test.
  pub fn init() {
    let dropped = TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      state.virtual_time = Duration::ZERO;
      state.next_task_id = 0;
      state.initialized = true;
      std::mem::take(&mut state.task_queue)
    });
    // Pending jobs may own values whose drop touches the scheduler.
    drop(dropped);
  }

  fn ensure_initialized() {
    TEST_SCHEDULER_STATE.with(|state| {
      assert!(
        state.borrow().initialized,
        "TestScheduler::init() must be called before using the scheduler"
      );
    });
  }

  /// Current virtual time.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn now() -> Duration {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().virtual_time)
  }

  /// Number of queued jobs, cancelled ones included until their time comes.
  pub fn pending_count() -> usize {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().task_queue.len())
  }

  pub fn is_empty() -> bool {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().task_queue.is_empty())
  }

  /// Advance the clock by `duration`, running every job that falls due on
  /// the way in time order (FIFO for equal times).
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn advance_by(duration: Duration) {
    Self::ensure_initialized();
    let target_time = TEST_SCHEDULER_STATE.with(|state| state.borrow().virtual_time + duration);

    Self::execute_tasks_until(Some(target_time));

    TEST_SCHEDULER_STATE.with(|state| {
      state.borrow_mut().virtual_time = target_time;
    });
  }

  /// Run jobs until the queue is empty, moving the clock to each job's time.
  /// Jobs scheduled while flushing run too.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn flush() {
    Self::ensure_initialized();
    Self::execute_tasks_until(None);
  }

  fn execute_tasks_until(target_time: Option<Duration>) {
    loop {
      let task = TEST_SCHEDULER_STATE.with(|state| {
        let mut state = state.borrow_mut();
        let due = state
          .task_queue
          .peek()
          .is_some_and(|peek| target_time.is_none_or(|limit| peek.scheduled_time <= limit));
        if !due {
          return None;
        }
        let task = state.task_queue.pop()?;
        state.virtual_time = task.scheduled_time;
        Some(task)
      });

      let Some(task) = task else {
        break;
      };
      (task.job)();
    }
  }

  fn push(delay: Duration, job: Box<dyn FnOnce()>) {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      let task_id = state.next_task_id;
      state.next_task_id += 1;
      let scheduled_time = state.virtual_time + delay;
      state.task_queue.push(VirtualTask { scheduled_time, task_id, job });
    });
  }
}

impl ImmediateScheduler for TestScheduler {
  fn schedule<S, F>(&self, state: S, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    self.schedule_relative(state, Duration::ZERO, action)
  }
}

impl Scheduler for TestScheduler {
  fn schedule_relative<S, F>(&self, state: S, due: Duration, action: F) -> BoxedCancelable
  where
    S: Send + 'static,
    F: FnOnce(S) -> BoxedDisposable + Send + 'static,
  {
    let item = ScheduledItem::new(state, action);
    let token = item.cancel_handle();
    Self::push(due, Box::new(move || item.invoke()));
    Box::new(token)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    mem,
    sync::{Arc, Mutex},
  };

  use super::*;
  use crate::disposable::{self, Disposable};

  type Log = Arc<Mutex<Vec<(u64, &'static str)>>>;

  fn recorder() -> (Log, impl Fn(&'static str) + Clone + Send + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let c_log = log.clone();
    let record = move |tag: &'static str| {
      let at = TestScheduler::now().as_millis() as u64;
      c_log.lock().unwrap().push((at, tag));
    };
    (log, record)
  }

  // ==================== Basic Properties ====================

  #[rxcore_macro::test]
  fn zero_sized_and_copy() {
    assert_eq!(mem::size_of::<TestScheduler>(), 0);
    let s1 = TestScheduler;
    let _s2 = s1;
    let _s3 = s1;
  }

  #[rxcore_macro::test]
  fn init_resets_clock_and_queue() {
    TestScheduler::init();
    TestScheduler.schedule_relative((), Duration::from_millis(5), |_| disposable::empty());
    TestScheduler::advance_by(Duration::from_millis(1));
    assert_eq!(TestScheduler::now(), Duration::from_millis(1));
    assert_eq!(TestScheduler::pending_count(), 1);

    TestScheduler::init();
    assert_eq!(TestScheduler::now(), Duration::ZERO);
    assert!(TestScheduler::is_empty());
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "TestScheduler::init() must be called")]
  fn panics_without_init() {
    TEST_SCHEDULER_STATE.with(|s| s.borrow_mut().initialized = false);
    TestScheduler::now();
  }

  // ==================== Time Advancement ====================

  #[rxcore_macro::test]
  fn advance_by_is_cumulative() {
    TestScheduler::init();
    TestScheduler::advance_by(Duration::from_millis(100));
    TestScheduler::advance_by(Duration::from_millis(50));
    assert_eq!(TestScheduler::now(), Duration::from_millis(150));
  }

  #[rxcore_macro::test]
  fn runs_jobs_in_time_then_fifo_order() {
    TestScheduler::init();
    let (log, record) = recorder();

    for (delay, tag) in [(20, "c"), (10, "a"), (10, "b"), (0, "now")] {
      let record = record.clone();
      TestScheduler.schedule_relative((), Duration::from_millis(delay), move |_| {
        record(tag);
        disposable::empty()
      });
    }

    TestScheduler::advance_by(Duration::from_millis(10));
    assert_eq!(*log.lock().unwrap(), vec![(0, "now"), (10, "a"), (10, "b")]);

    TestScheduler::flush();
    assert_eq!(log.lock().unwrap().last(), Some(&(20, "c")));
    assert!(TestScheduler::is_empty());
  }

  #[rxcore_macro::test]
  fn flush_runs_work_scheduled_while_flushing() {
    TestScheduler::init();
    let (log, record) = recorder();

    let c_record = record.clone();
    TestScheduler.schedule_relative((), Duration::from_millis(5), move |_| {
      c_record("outer");
      TestScheduler.schedule_relative((), Duration::from_millis(5), move |_| {
        record("inner");
        disposable::empty()
      });
      disposable::empty()
    });

    TestScheduler::flush();
    assert_eq!(*log.lock().unwrap(), vec![(5, "outer"), (10, "inner")]);
  }

  #[rxcore_macro::test]
  fn cancelled_job_does_not_run() {
    TestScheduler::init();
    let (log, record) = recorder();

    let token = TestScheduler.schedule_relative((), Duration::from_millis(10), move |_| {
      record("cancelled");
      disposable::empty()
    });
    token.dispose();
    assert_eq!(TestScheduler::pending_count(), 1);

    TestScheduler::flush();
    assert!(log.lock().unwrap().is_empty());
    assert!(TestScheduler::is_empty());
  }
}
