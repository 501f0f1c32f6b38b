use std::sync::{Arc, Weak};

use super::Disposable;

/// An owner that can drop one of its registrations by key.
pub trait SynchronizedUnsubscribe: Send + Sync {
  type DisposeKey: Copy + Send + Sync;

  fn synchronized_unsubscribe(&self, key: Self::DisposeKey);
}

/// A token that unregisters `key` from its owner when disposed.
///
/// The token does not keep the owner alive: if the owner has already been
/// dropped, disposing is a no-op. This lets a collection hand out
/// cancellation tokens without the tokens extending its lifetime.
pub struct SubscriptionDisposable<T: SynchronizedUnsubscribe> {
  owner: Weak<T>,
  key: T::DisposeKey,
}

impl<T: SynchronizedUnsubscribe> SubscriptionDisposable<T> {
  pub fn new(owner: &Arc<T>, key: T::DisposeKey) -> Self {
    Self { owner: Arc::downgrade(owner), key }
  }
}

impl<T: SynchronizedUnsubscribe> Disposable for SubscriptionDisposable<T> {
  fn dispose(&self) {
    if let Some(owner) = self.owner.upgrade() {
      owner.synchronized_unsubscribe(self.key);
    }
  }
}
