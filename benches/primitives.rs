use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use bencher::{benchmark_group, benchmark_main, Bencher};
use rxcore::prelude::*;

type Action = Box<dyn FnOnce() + Send>;

fn spin_lock(b: &mut Bencher) {
  let lock = SpinLock::new(0usize);
  b.iter(|| lock.perform_locked(|v| *v += 1));
}

fn reentrant_lock(b: &mut Bencher) {
  let lock = ReentrantLock::new(AtomicUsize::new(0));
  b.iter(|| {
    lock.perform_locked(|outer| {
      lock.perform_locked(|_| {
        outer.fetch_add(1, Ordering::Relaxed);
      })
    })
  });
}

fn single_assignment(b: &mut Bencher) {
  b.iter(|| {
    let single = SingleAssignmentDisposable::new();
    single.set_disposable(());
    single.dispose();
  });
}

fn composite_insert_remove(b: &mut Bencher) {
  let composite = CompositeDisposable::new();
  b.iter(|| {
    if let Some(key) = composite.insert(()) {
      composite.remove(key);
    }
  });
}

fn current_thread_schedule(b: &mut Bencher) {
  let runs = Arc::new(AtomicUsize::new(0));
  b.iter(|| {
    let runs = runs.clone();
    CurrentThreadScheduler.schedule((), move |_| {
      runs.fetch_add(1, Ordering::Relaxed);
      disposable::empty()
    })
  });
}

fn current_thread_recursion(b: &mut Bencher) {
  b.iter(|| {
    CurrentThreadScheduler.schedule_recursive(0u32, |n, recurse| {
      if n < 100 {
        recurse(n + 1);
      }
    })
  });
}

fn async_lock_uncontended(b: &mut Bencher) {
  let lock = AsyncLock::<Action>::new();
  let runs = Arc::new(AtomicUsize::new(0));
  b.iter(|| {
    let runs = runs.clone();
    lock.invoke(Box::new(move || {
      runs.fetch_add(1, Ordering::Relaxed);
    }));
  });
}

benchmark_group!(locks, spin_lock, reentrant_lock, async_lock_uncontended);
benchmark_group!(disposables, single_assignment, composite_insert_remove);
benchmark_group!(schedulers, current_thread_schedule, current_thread_recursion);
benchmark_main!(locks, disposables, schedulers);
