use std::sync::Arc;

use crate::disposable::{BoxedDisposable, Cancelable, SingleAssignmentDisposable};

/// A unit of work that runs at most once.
pub trait Invocable {
  fn invoke(self);
}

impl<'a> Invocable for Box<dyn FnOnce() + Send + 'a> {
  #[inline]
  fn invoke(self) { self() }
}

/// An action bound to its state, plus the token that cancels it.
///
/// [`invoke`](Invocable::invoke) skips the action if the token was already
/// disposed; otherwise the disposable the action returns is assigned to the
/// token, so disposing the token later releases it (or releases it right
/// away if the token got disposed while the action was running).
pub struct ScheduledItem<S, F> {
  state: S,
  action: F,
  disposable: Arc<SingleAssignmentDisposable>,
}

impl<S, F> ScheduledItem<S, F>
where
  F: FnOnce(S) -> BoxedDisposable,
{
  pub fn new(state: S, action: F) -> Self {
    Self { state, action, disposable: Arc::new(SingleAssignmentDisposable::new()) }
  }

  /// The cancellation token of this item; hand it to whoever scheduled it.
  pub fn cancel_handle(&self) -> Arc<SingleAssignmentDisposable> { self.disposable.clone() }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.disposable.is_disposed() }
}

impl<S, F> Invocable for ScheduledItem<S, F>
where
  F: FnOnce(S) -> BoxedDisposable,
{
  fn invoke(self) {
    let Self { state, action, disposable } = self;
    if disposable.is_disposed() {
      return;
    }
    disposable.set_disposable(action(state));
  }
}
