//! The disposal model.
//!
//! A [`Disposable`] represents one releasable resource or cancelable piece
//! of work. Disposing is idempotent and thread-safe: the first call
//! releases, every later call is a no-op.
//!
//! | Type | Holds |
//! |------|-------|
//! | [`SingleAssignmentDisposable`] | at most one value, assigned exactly once |
//! | [`SerialDisposable`] | a replaceable value; replacing disposes the old one |
//! | [`RefCountDisposable`] | a value released after the primary and every dependent are disposed |
//! | [`CompositeDisposable`] | a keyed group disposed together |
//! | [`BinaryDisposable`] | two values disposed together |
//!
//! Containers always dispose their contents *after* releasing their own
//! lock, so user teardown code never runs inside a critical section.

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use crate::sync::{OnceFlag, SpinLock};

mod composite;
mod ref_count;
mod serial;
mod single_assignment;
mod subscription;

pub use composite::{CompositeDisposable, DisposeKey};
pub use ref_count::RefCountDisposable;
pub use serial::SerialDisposable;
pub use single_assignment::SingleAssignmentDisposable;
pub use subscription::{SubscriptionDisposable, SynchronizedUnsubscribe};

// ==================== Traits ====================

/// Release a resource. Must be idempotent and safe to call from any thread.
pub trait Disposable: Send + Sync {
  fn dispose(&self);
}

/// A [`Disposable`] that can report whether it has been disposed.
pub trait Cancelable: Disposable {
  fn is_disposed(&self) -> bool;
}

/// Owned, type-erased disposable.
pub type BoxedDisposable = Box<dyn Disposable>;

/// Owned, type-erased cancelable, returned by every scheduling operation.
pub type BoxedCancelable = Box<dyn Cancelable>;

/// Shared, type-erased disposable.
pub type SharedDisposable = Arc<dyn Disposable>;

impl Disposable for () {
  #[inline]
  fn dispose(&self) {}
}

impl<T: Disposable + ?Sized> Disposable for Box<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }
}

impl<T: Cancelable + ?Sized> Cancelable for Box<T> {
  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

impl<T: Disposable + ?Sized> Disposable for Arc<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }
}

impl<T: Cancelable + ?Sized> Cancelable for Arc<T> {
  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

impl Debug for dyn Disposable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("dyn Disposable") }
}

impl Debug for dyn Cancelable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("dyn Cancelable").field("is_disposed", &self.is_disposed()).finish()
  }
}

// ==================== Constructors ====================

/// A disposable that does nothing.
#[inline]
pub fn empty() -> BoxedDisposable { Box::new(()) }

/// A disposable that runs `teardown` the first time it is disposed.
pub fn create<F>(teardown: F) -> AnonymousDisposable<F>
where
  F: FnOnce() + Send,
{
  AnonymousDisposable { teardown: SpinLock::new(Some(teardown)), disposed: OnceFlag::new() }
}

// ==================== AnonymousDisposable ====================

/// Runs a teardown closure once. See [`create`].
pub struct AnonymousDisposable<F> {
  teardown: SpinLock<Option<F>>,
  disposed: OnceFlag,
}

impl<F: FnOnce() + Send> Disposable for AnonymousDisposable<F> {
  fn dispose(&self) {
    if self.disposed.set() {
      let teardown = self.teardown.calculate_locked(Option::take);
      if let Some(teardown) = teardown {
        teardown();
      }
    }
  }
}

impl<F: FnOnce() + Send> Cancelable for AnonymousDisposable<F> {
  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.is_set() }
}

// ==================== BooleanDisposable ====================

/// Holds nothing; only remembers whether it was disposed.
#[derive(Debug, Default)]
pub struct BooleanDisposable(OnceFlag);

impl BooleanDisposable {
  pub fn new() -> Self { Self::default() }

  /// A token that starts out disposed, handed out when work was rejected
  /// before it could be scheduled.
  pub fn disposed() -> Self {
    let this = Self::default();
    this.0.set();
    this
  }
}

impl Disposable for BooleanDisposable {
  #[inline]
  fn dispose(&self) { self.0.set(); }
}

impl Cancelable for BooleanDisposable {
  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_set() }
}

// ==================== BinaryDisposable ====================

/// Disposes two disposables together, once.
pub struct BinaryDisposable<D1, D2> {
  first: D1,
  second: D2,
  disposed: OnceFlag,
}

impl<D1, D2> BinaryDisposable<D1, D2> {
  pub fn new(first: D1, second: D2) -> Self { Self { first, second, disposed: OnceFlag::new() } }
}

impl<D1: Disposable, D2: Disposable> Disposable for BinaryDisposable<D1, D2> {
  fn dispose(&self) {
    if self.disposed.set() {
      self.first.dispose();
      self.second.dispose();
    }
  }
}

impl<D1: Disposable, D2: Disposable> Cancelable for BinaryDisposable<D1, D2> {
  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.is_set() }
}
