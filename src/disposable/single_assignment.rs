use super::{BoxedDisposable, Cancelable, Disposable};
use crate::sync::{AtomicBits, SpinLock};

const DISPOSED: u8 = 0b01;
const DISPOSABLE_SET: u8 = 0b10;

/// A disposable whose underlying resource can be assigned exactly once.
///
/// - Assigning a second time is a bug in the caller and panics.
/// - Assigning after [`dispose`](Disposable::dispose) disposes the assigned
///   value immediately instead of storing it.
/// - Disposing before anything was assigned only marks this disposed.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let token = SingleAssignmentDisposable::new();
/// token.dispose();
/// // Arrives late, released right away.
/// token.set_disposable(disposable::create(|| println!("released")));
/// assert!(token.is_disposed());
/// ```
#[derive(Default)]
pub struct SingleAssignmentDisposable {
  state: AtomicBits,
  disposable: SpinLock<Option<BoxedDisposable>>,
}

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  /// Assign the underlying disposable.
  ///
  /// # Panics
  ///
  /// Panics if a disposable was already assigned.
  pub fn set_disposable(&self, disposable: impl Disposable + 'static) {
    let previous = self.state.fetch_or(DISPOSABLE_SET);
    if previous & DISPOSABLE_SET != 0 {
      panic!("SingleAssignmentDisposable: disposable was already assigned");
    }
    if previous & DISPOSED != 0 {
      disposable.dispose();
      return;
    }

    *self.disposable.lock() = Some(Box::new(disposable));

    // A `dispose` racing with us may have run between publishing the set bit
    // and storing the value; whoever takes the value out disposes it.
    if self.state.is_set(DISPOSED) {
      self.take_and_dispose();
    }
  }

  fn take_and_dispose(&self) {
    let disposable = self.disposable.calculate_locked(Option::take);
    if let Some(disposable) = disposable {
      disposable.dispose();
    }
  }
}

impl Disposable for SingleAssignmentDisposable {
  fn dispose(&self) {
    let previous = self.state.fetch_or(DISPOSED);
    if previous & DISPOSED != 0 {
      return;
    }
    if previous & DISPOSABLE_SET != 0 {
      self.take_and_dispose();
    }
  }
}

impl Cancelable for SingleAssignmentDisposable {
  #[inline]
  fn is_disposed(&self) -> bool { self.state.is_set(DISPOSED) }
}
