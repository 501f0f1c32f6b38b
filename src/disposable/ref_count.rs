use std::sync::Arc;

use super::{empty, BoxedDisposable, Cancelable, Disposable};
use crate::sync::{decrement_checked, increment_checked, OnceFlag, SpinLock};

struct RefCountState {
  disposable: Option<BoxedDisposable>,
  primary_disposed: bool,
  count: usize,
}

/// Shares one underlying disposable between a primary owner and any number
/// of dependents.
///
/// The underlying disposable is released exactly once, as soon as both the
/// primary has been disposed and every handle returned by
/// [`retain`](RefCountDisposable::retain) has been disposed, in whichever
/// order those happen.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let shared = RefCountDisposable::new(disposable::create(|| println!("released")));
/// let dependent = shared.retain();
/// shared.dispose();
/// assert!(!shared.is_disposed());
/// dependent.dispose(); // prints "released"
/// assert!(shared.is_disposed());
/// ```
#[derive(Clone)]
pub struct RefCountDisposable(Arc<SpinLock<RefCountState>>);

impl RefCountDisposable {
  pub fn new(disposable: impl Disposable + 'static) -> Self {
    Self(Arc::new(SpinLock::new(RefCountState {
      disposable: Some(Box::new(disposable)),
      primary_disposed: false,
      count: 0,
    })))
  }

  /// Hand out a dependent handle that keeps the underlying disposable alive
  /// until it is disposed. Once the underlying disposable is released this
  /// returns a no-op disposable.
  ///
  /// # Panics
  ///
  /// Panics if the dependent count would overflow.
  pub fn retain(&self) -> BoxedDisposable {
    let retained = self.0.calculate_locked(|state| {
      if state.disposable.is_some() {
        increment_checked(&mut state.count, "RefCountDisposable increment failed");
        true
      } else {
        false
      }
    });

    if retained {
      Box::new(RefCountInnerDisposable { parent: self.clone(), is_disposed: OnceFlag::new() })
    } else {
      empty()
    }
  }

  /// Number of live dependents.
  pub fn count(&self) -> usize { self.0.lock().count }

  fn release(&self) {
    let to_dispose = self.0.calculate_locked(|state| {
      state.disposable.as_ref()?;
      decrement_checked(&mut state.count, "RefCountDisposable decrement on release failed");
      if state.primary_disposed && state.count == 0 {
        state.disposable.take()
      } else {
        None
      }
    });

    if let Some(disposable) = to_dispose {
      disposable.dispose();
    }
  }
}

impl Disposable for RefCountDisposable {
  /// Dispose the primary. The underlying disposable is released now if no
  /// dependent is alive, otherwise when the last one is disposed.
  fn dispose(&self) {
    let to_dispose = self.0.calculate_locked(|state| {
      if state.disposable.is_none() || state.primary_disposed {
        return None;
      }
      state.primary_disposed = true;
      if state.count == 0 {
        state.disposable.take()
      } else {
        None
      }
    });

    if let Some(disposable) = to_dispose {
      disposable.dispose();
    }
  }
}

impl Cancelable for RefCountDisposable {
  /// Whether the underlying disposable has been released.
  fn is_disposed(&self) -> bool { self.0.lock().disposable.is_none() }
}

/// Dependent handle returned by [`RefCountDisposable::retain`]; releases its
/// reference at most once.
struct RefCountInnerDisposable {
  parent: RefCountDisposable,
  is_disposed: OnceFlag,
}

impl Disposable for RefCountInnerDisposable {
  fn dispose(&self) {
    if self.is_disposed.set() {
      self.parent.release();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::thread;

  use super::*;
  use crate::disposable::test_util::CountingDisposable;

  #[rxcore_macro::test]
  fn primary_first_then_dependents() {
    let base = CountingDisposable::default();
    let rc = RefCountDisposable::new(base.clone());
    let h1 = rc.retain();
    let h2 = rc.retain();
    assert_eq!(rc.count(), 2);

    rc.dispose();
    assert_eq!(base.count(), 0);
    h1.dispose();
    assert_eq!(base.count(), 0);
    assert!(!rc.is_disposed());
    h2.dispose();
    assert_eq!(base.count(), 1);
    assert!(rc.is_disposed());
  }

  #[rxcore_macro::test]
  fn dependents_first_then_primary() {
    let base = CountingDisposable::default();
    let rc = RefCountDisposable::new(base.clone());
    let handles: Vec<_> = (0..3).map(|_| rc.retain()).collect();
    handles.iter().for_each(|h| h.dispose());
    assert_eq!(base.count(), 0);

    rc.dispose();
    assert_eq!(base.count(), 1);
    rc.dispose();
    assert_eq!(base.count(), 1);
  }

  #[rxcore_macro::test]
  fn no_dependents_releases_on_primary() {
    let base = CountingDisposable::default();
    let rc = RefCountDisposable::new(base.clone());
    rc.dispose();
    assert_eq!(base.count(), 1);
    assert!(rc.is_disposed());
  }

  #[rxcore_macro::test]
  fn disposing_a_handle_twice_counts_once() {
    let base = CountingDisposable::default();
    let rc = RefCountDisposable::new(base.clone());
    let h1 = rc.retain();
    let h2 = rc.retain();
    h1.dispose();
    h1.dispose();
    assert_eq!(rc.count(), 1);

    rc.dispose();
    assert_eq!(base.count(), 0);
    h2.dispose();
    assert_eq!(base.count(), 1);
  }

  #[rxcore_macro::test]
  fn retain_after_release_is_a_no_op() {
    let base = CountingDisposable::default();
    let rc = RefCountDisposable::new(base.clone());
    rc.dispose();
    let late = rc.retain();
    assert_eq!(rc.count(), 0);
    late.dispose();
    assert_eq!(base.count(), 1);
  }

  #[rxcore_macro::test]
  fn retain_while_primary_disposed_but_alive() {
    let base = CountingDisposable::default();
    let rc = RefCountDisposable::new(base.clone());
    let h1 = rc.retain();
    rc.dispose();
    let h2 = rc.retain();
    h1.dispose();
    assert_eq!(base.count(), 0);
    h2.dispose();
    assert_eq!(base.count(), 1);
  }

  #[rxcore_macro::test]
  fn concurrent_release_in_any_order() {
    for _ in 0..50 {
      let base = CountingDisposable::default();
      let rc = RefCountDisposable::new(base.clone());
      let handles: Vec<_> = (0..8).map(|_| rc.retain()).collect();
      let threads: Vec<_> = handles
        .into_iter()
        .map(|h| {
          thread::spawn(move || {
            h.dispose();
            h.dispose();
          })
        })
        .collect();
      let c_rc = rc.clone();
      let primary = thread::spawn(move || c_rc.dispose());
      threads.into_iter().for_each(|t| t.join().unwrap());
      primary.join().unwrap();
      assert_eq!(base.count(), 1);
    }
  }
}
