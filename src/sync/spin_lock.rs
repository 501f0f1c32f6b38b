use std::{
  cell::UnsafeCell,
  fmt::{Debug, Formatter},
  hint,
  marker::PhantomData,
  ops::{Deref, DerefMut},
  sync::atomic::{AtomicBool, Ordering},
  thread,
};

/// Spins before the waiting thread starts yielding its time slice.
const SPINS_BEFORE_YIELD: u32 = 64;

/// A spinning gate for very short critical sections.
///
/// Waiters busy-wait instead of parking, so the protected region must be a
/// pure memory update: never run user callbacks (and never dispose anything)
/// while holding the guard. The lock is not reentrant; locking twice from
/// the same thread deadlocks.
pub struct SpinLock<T> {
  locked: AtomicBool,
  value: UnsafeCell<T>,
}

// SAFETY: access to `value` is serialized by `locked`.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
  pub const fn new(value: T) -> Self {
    Self { locked: AtomicBool::new(false), value: UnsafeCell::new(value) }
  }

  /// Acquire the gate. It is released when the guard is dropped, including
  /// while unwinding.
  pub fn lock(&self) -> SpinLockGuard<'_, T> {
    let mut spins = 0;
    while self
      .locked
      .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
      .is_err()
    {
      while self.locked.load(Ordering::Relaxed) {
        if spins < SPINS_BEFORE_YIELD {
          spins += 1;
          hint::spin_loop();
        } else {
          thread::yield_now();
        }
      }
    }
    SpinLockGuard { lock: self, _marker: PhantomData }
  }

  /// Run `f` with the gate held and return its result.
  #[inline]
  pub fn calculate_locked<R>(&self, f: impl FnOnce(&mut T) -> R) -> R { f(&mut self.lock()) }

  /// Run `f` with the gate held.
  #[inline]
  pub fn perform_locked(&self, f: impl FnOnce(&mut T)) { f(&mut self.lock()) }

  pub fn into_inner(self) -> T { self.value.into_inner() }
}

impl<T: Default> Default for SpinLock<T> {
  fn default() -> Self { Self::new(T::default()) }
}

impl<T> Debug for SpinLock<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SpinLock").field("locked", &self.locked.load(Ordering::Relaxed)).finish()
  }
}

/// RAII guard of a [`SpinLock`].
///
/// Sharing a guard across threads shares `&T`, so the guard is only `Sync`
/// when `T` is:
///
/// ```compile_fail
/// use std::{cell::Cell, thread};
///
/// use rxcore::sync::SpinLock;
///
/// let lock = SpinLock::new(Cell::new(0u8));
/// let guard = lock.lock();
/// let shared = &guard;
/// thread::scope(|s| {
///   s.spawn(move || shared.set(1));
/// });
/// ```
#[must_use]
pub struct SpinLockGuard<'a, T> {
  lock: &'a SpinLock<T>,
  // Borrows `T` exclusively: `Sync` only for `T: Sync`, `Send` only for `T: Send`.
  _marker: PhantomData<&'a mut T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
  type Target = T;

  // SAFETY: the guard proves exclusive access.
  fn deref(&self) -> &T { unsafe { &*self.lock.value.get() } }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
  // SAFETY: the guard proves exclusive access.
  fn deref_mut(&mut self) -> &mut T { unsafe { &mut *self.lock.value.get() } }
}

impl<T> Drop for SpinLockGuard<'_, T> {
  #[inline]
  fn drop(&mut self) { self.lock.locked.store(false, Ordering::Release); }
}
