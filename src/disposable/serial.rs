use std::{mem, sync::Arc};

use super::{Cancelable, Disposable, SharedDisposable};
use crate::sync::SpinLock;

#[derive(Default)]
struct SerialState {
  current: Option<SharedDisposable>,
  is_disposed: bool,
}

/// A disposable whose underlying resource can be replaced.
///
/// Assigning a new value disposes the previous one. Once this is disposed,
/// every later assignment is disposed immediately and never stored.
#[derive(Default)]
pub struct SerialDisposable {
  state: SpinLock<SerialState>,
}

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  /// The current underlying disposable, or a no-op one if none is set.
  pub fn disposable(&self) -> SharedDisposable {
    self.state.calculate_locked(|state| state.current.clone()).unwrap_or_else(|| Arc::new(()))
  }

  /// Replace the underlying disposable, disposing the previous one.
  pub fn set_disposable(&self, disposable: impl Disposable + 'static) {
    let disposable: SharedDisposable = Arc::new(disposable);
    let to_dispose = self.state.calculate_locked(|state| {
      if state.is_disposed {
        Some(disposable)
      } else {
        mem::replace(&mut state.current, Some(disposable))
      }
    });

    if let Some(old) = to_dispose {
      old.dispose();
    }
  }
}

impl Disposable for SerialDisposable {
  fn dispose(&self) {
    let current = self.state.calculate_locked(|state| {
      if state.is_disposed {
        None
      } else {
        state.is_disposed = true;
        state.current.take()
      }
    });

    if let Some(current) = current {
      current.dispose();
    }
  }
}

impl Cancelable for SerialDisposable {
  fn is_disposed(&self) -> bool { self.state.lock().is_disposed }
}
