//! Integration tests for schedulers, recursion and the handoff lock
//!
//! Real threads are used where the behavior depends on them; everything
//! time-based runs on the virtual clock.

use std::{
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    mpsc, Arc, Barrier, Mutex,
  },
  thread,
  time::Duration,
};

use rxcore::prelude::*;

type Action = Box<dyn FnOnce() + Send>;

// ==================== AsyncLock ====================

#[rxcore_macro::test]
fn async_lock_runs_every_action_once_and_never_concurrently() {
  const K: usize = 16;
  let lock = Arc::new(AsyncLock::<Action>::new());
  let runs = Arc::new(AtomicUsize::new(0));
  let running = Arc::new(AtomicBool::new(false));
  let barrier = Arc::new(Barrier::new(K));

  let handles: Vec<_> = (0..K)
    .map(|_| {
      let (lock, runs, running, barrier) =
        (lock.clone(), runs.clone(), running.clone(), barrier.clone());
      thread::spawn(move || {
        barrier.wait();
        lock.invoke(Box::new(move || {
          assert!(!running.swap(true, Ordering::SeqCst), "two actions ran at once");
          thread::yield_now();
          runs.fetch_add(1, Ordering::SeqCst);
          running.store(false, Ordering::SeqCst);
        }));
      })
    })
    .collect();
  handles.into_iter().for_each(|h| h.join().unwrap());

  assert_eq!(runs.load(Ordering::SeqCst), K);
}

#[rxcore_macro::test]
fn async_lock_drops_work_after_dispose() {
  let lock = AsyncLock::<Action>::new();
  lock.dispose();
  let ran = Arc::new(AtomicBool::new(false));
  let c_ran = ran.clone();
  lock.invoke(Box::new(move || c_ran.store(true, Ordering::SeqCst)));
  assert!(!ran.load(Ordering::SeqCst));
}

#[rxcore_macro::test]
fn async_lock_handoff_scenario() {
  let lock = Arc::new(AsyncLock::<Action>::new());
  let log = Arc::new(Mutex::new(Vec::new()));
  let (a_started_tx, a_started_rx) = mpsc::channel();
  let (release_a_tx, release_a_rx) = mpsc::channel::<()>();

  let c_lock = lock.clone();
  let c_log = log.clone();
  let a = thread::spawn(move || {
    let submitter = thread::current().id();
    let log = c_log.clone();
    c_lock.invoke(Box::new(move || {
      log.lock().unwrap().push(("A", thread::current().id()));
      a_started_tx.send(()).unwrap();
      release_a_rx.recv().unwrap();
    }));
    // B and C have already run by the time `invoke` returns.
    let names: Vec<_> = c_log.lock().unwrap().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, ["A", "B", "C"]);
    submitter
  });

  a_started_rx.recv().unwrap();
  for name in ["B", "C"] {
    let c_lock = lock.clone();
    let log = log.clone();
    thread::spawn(move || {
      c_lock.invoke(Box::new(move || log.lock().unwrap().push((name, thread::current().id()))));
    })
    .join()
    .unwrap();
  }
  release_a_tx.send(()).unwrap();
  let submitter = a.join().unwrap();

  assert!(log.lock().unwrap().iter().all(|(_, thread)| *thread == submitter));
}

// ==================== Recursive scheduling ====================

#[rxcore_macro::test]
fn recursion_runs_m_plus_one_times_on_every_scheduler() {
  const M: usize = 25;

  fn run<Sch: Scheduler + Clone + Send + Sync + 'static>(scheduler: Sch, drive: impl Fn()) {
    let runs = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let c_runs = runs.clone();
    let _token = scheduler.schedule_recursive_relative(0, Duration::ZERO, move |n, recurse| {
      c_runs.fetch_add(1, Ordering::SeqCst);
      if n < M {
        recurse.schedule(n + 1);
      } else {
        tx.lock().unwrap().send(()).unwrap();
      }
    });
    drive();
    rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), M + 1);
  }

  TestScheduler::init();
  run(TestScheduler, TestScheduler::flush);
  run(SerialDispatchQueueScheduler::with_label("recursion").unwrap(), || {});
  run(MainScheduler::instance(), || {});
  #[cfg(all(feature = "futures-scheduler", feature = "timer"))]
  run(ThreadPoolScheduler::new().unwrap(), || {});
}

#[rxcore_macro::test]
fn disposing_recursion_stops_pending_steps() {
  TestScheduler::init();
  let runs = Arc::new(AtomicUsize::new(0));
  let c_runs = runs.clone();
  let token = TestScheduler.schedule_recursive_relative(
    0u32,
    Duration::from_millis(10),
    move |n, recurse| {
      c_runs.fetch_add(1, Ordering::SeqCst);
      recurse.schedule_relative(n + 1, Duration::from_millis(10));
    },
  );

  TestScheduler::advance_by(Duration::from_millis(35));
  assert_eq!(runs.load(Ordering::SeqCst), 3);
  token.dispose();
  TestScheduler::advance_by(Duration::from_secs(1));
  assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[rxcore_macro::test]
fn immediate_recursion_on_trampoline_is_flat() {
  let depth = Arc::new(AtomicUsize::new(0));
  let max_depth = Arc::new(AtomicUsize::new(0));
  let (c_depth, c_max) = (depth.clone(), max_depth.clone());

  CurrentThreadScheduler.schedule_recursive(0, move |n: u32, recurse| {
    let now = c_depth.fetch_add(1, Ordering::SeqCst) + 1;
    c_max.fetch_max(now, Ordering::SeqCst);
    if n < 1_000 {
      recurse(n + 1);
    }
    c_depth.fetch_sub(1, Ordering::SeqCst);
  });

  assert_eq!(max_depth.load(Ordering::SeqCst), 1);
}

// ==================== Main scheduler ====================

#[rxcore_macro::test]
fn main_scheduler_marshals_from_other_threads() {
  let main = MainScheduler::instance();
  let (tx, rx) = mpsc::channel();
  let c_main = main.clone();
  main.schedule((), move |_| {
    c_main.ensure_executing_on_scheduler(None);
    tx.send(thread::current().name().map(str::to_owned)).unwrap();
    disposable::empty()
  });
  assert_eq!(rx.recv().unwrap().as_deref(), Some("rxcore.main"));
}

// ==================== Tokio ====================

#[cfg(feature = "tokio-scheduler")]
#[rxcore_macro::test(shared)]
async fn tokio_recursion_with_delays() {
  let scheduler = TokioScheduler::current();
  let (tx, rx) = std::sync::mpsc::channel();
  let tx = Mutex::new(tx);
  let _token =
    scheduler.schedule_recursive_relative(0, Duration::from_millis(1), move |n, recurse| {
      if n < 5 {
        recurse.schedule_relative(n + 1, Duration::from_millis(1));
      } else {
        tx.lock().unwrap().send(n).unwrap();
      }
    });
  let got = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(10)))
    .await
    .unwrap();
  assert_eq!(got, Ok(5));
}
