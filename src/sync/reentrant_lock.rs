use std::fmt::{Debug, Formatter};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// A lock the owning thread may acquire again while already holding it.
///
/// Needed around regions that call user code which may call back into the
/// same component (recursive scheduling, hook configuration). Guards only
/// give shared access; wrap the protected data in a `Cell` or `RefCell`
/// to mutate it.
///
/// A thread contending with another owner parks until the owner's outermost
/// guard is dropped.
pub struct ReentrantLock<T> {
  inner: ReentrantMutex<T>,
}

/// RAII guard of a [`ReentrantLock`]; releases one level of ownership on
/// drop. Not `Send`: ownership is tied to the acquiring thread.
pub type ReentrantLockGuard<'a, T> = ReentrantMutexGuard<'a, T>;

impl<T> ReentrantLock<T> {
  pub fn new(value: T) -> Self { Self { inner: ReentrantMutex::new(value) } }

  /// Acquire the lock, re-entering if this thread already owns it.
  pub fn lock(&self) -> ReentrantLockGuard<'_, T> { self.inner.lock() }

  /// Whether the calling thread currently holds the lock.
  pub fn is_held_by_current_thread(&self) -> bool { self.inner.is_owned_by_current_thread() }

  /// Run `f` with the lock held and return its result.
  #[inline]
  pub fn calculate_locked<R>(&self, f: impl FnOnce(&T) -> R) -> R { f(&self.lock()) }

  /// Run `f` with the lock held.
  #[inline]
  pub fn perform_locked(&self, f: impl FnOnce(&T)) { f(&self.lock()) }
}

impl<T: Default> Default for ReentrantLock<T> {
  fn default() -> Self { Self::new(T::default()) }
}

impl<T> Debug for ReentrantLock<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ReentrantLock").field("locked", &self.inner.is_locked()).finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::{Cell, RefCell},
    panic,
    sync::{mpsc, Arc},
    thread,
    time::Duration,
  };

  use super::*;

  #[rxcore_macro::test]
  fn same_thread_reenters() {
    let lock = ReentrantLock::new(Cell::new(0));
    let outer = lock.lock();
    outer.set(1);
    let depth = lock.calculate_locked(|v| {
      v.set(v.get() + 1);
      lock.calculate_locked(|v| {
        v.set(v.get() + 1);
        v.get()
      })
    });
    assert_eq!(depth, 3);
    assert!(lock.is_held_by_current_thread());
    drop(outer);
    assert!(!lock.is_held_by_current_thread());
  }

  #[rxcore_macro::test]
  fn other_thread_waits_for_outermost_release() {
    let lock = Arc::new(ReentrantLock::new(RefCell::new(Vec::new())));
    let (tx, rx) = mpsc::channel();

    let outer = lock.lock();
    let inner = lock.lock();
    outer.borrow_mut().push("owner");

    let c_lock = lock.clone();
    let waiter = thread::spawn(move || {
      tx.send(()).unwrap();
      c_lock.perform_locked(|v| v.borrow_mut().push("waiter"));
    });

    rx.recv().unwrap();
    drop(inner);
    thread::sleep(Duration::from_millis(20));
    // Still owned through `outer`.
    assert_eq!(*outer.borrow(), vec!["owner"]);
    drop(outer);

    waiter.join().unwrap();
    assert_eq!(*lock.lock().borrow(), vec!["owner", "waiter"]);
  }

  #[rxcore_macro::test]
  fn released_when_computation_panics() {
    let lock = Arc::new(ReentrantLock::new(Cell::new(0)));
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
      lock.perform_locked(|_| panic!("boom"));
    }));
    assert!(result.is_err());

    let c_lock = lock.clone();
    thread::spawn(move || c_lock.perform_locked(|v| v.set(5))).join().unwrap();
    assert_eq!(lock.lock().get(), 5);
  }

  #[rxcore_macro::test]
  fn shared_across_threads_for_send_values() {
    fn assert_sync<T: Sync>(_: &T) {}
    let lock = ReentrantLock::new(Cell::new(0));
    assert_sync(&lock);
    thread::scope(|s| {
      for _ in 0..4 {
        s.spawn(|| lock.perform_locked(|v| v.set(v.get() + 1)));
      }
    });
    assert_eq!(lock.lock().get(), 4);
  }
}
