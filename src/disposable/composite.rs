use smallvec::SmallVec;

use super::{BoxedDisposable, Cancelable, Disposable, SynchronizedUnsubscribe};
use crate::sync::SpinLock;

/// Key of an entry inside a [`CompositeDisposable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisposeKey(usize);

/// ID-keyed storage for the entries of a [`CompositeDisposable`].
///
/// `SmallVec<[_; 2]>` avoids a heap allocation for the common case of zero
/// to two entries (a recursive scheduler rarely has more than one step in
/// flight).
struct Entries {
  next_id: usize,
  items: SmallVec<[(usize, BoxedDisposable); 2]>,
}

impl Entries {
  fn add(&mut self, item: BoxedDisposable) -> DisposeKey {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, item));
    DisposeKey(id)
  }

  fn remove(&mut self, key: DisposeKey) -> Option<BoxedDisposable> {
    self.items.iter().position(|(id, _)| *id == key.0).map(|pos| self.items.remove(pos).1)
  }
}

/// A group of disposables disposed together.
///
/// Entries are inserted with a key so they can be removed (and disposed)
/// individually. Once the group is disposed, inserting disposes the new
/// entry right away.
pub struct CompositeDisposable {
  // `None` once disposed.
  entries: SpinLock<Option<Entries>>,
}

impl Default for CompositeDisposable {
  fn default() -> Self {
    Self { entries: SpinLock::new(Some(Entries { next_id: 0, items: SmallVec::new() })) }
  }
}

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  /// Add a disposable to the group.
  ///
  /// Returns the key to [`remove`](Self::remove) it with, or `None` if the
  /// group is already disposed, in which case `disposable` has been
  /// disposed.
  pub fn insert(&self, disposable: impl Disposable + 'static) -> Option<DisposeKey> {
    let disposable: BoxedDisposable = Box::new(disposable);
    let rejected = self.entries.calculate_locked(|entries| match entries {
      Some(entries) => Ok(entries.add(disposable)),
      None => Err(disposable),
    });

    match rejected {
      Ok(key) => Some(key),
      Err(disposable) => {
        disposable.dispose();
        None
      }
    }
  }

  /// Remove the entry for `key` and dispose it. A no-op for unknown keys or
  /// a disposed group.
  pub fn remove(&self, key: DisposeKey) {
    let removed = self.entries.calculate_locked(|entries| entries.as_mut()?.remove(key));
    if let Some(disposable) = removed {
      disposable.dispose();
    }
  }

  /// Number of entries currently held.
  pub fn count(&self) -> usize {
    self.entries.calculate_locked(|entries| entries.as_ref().map_or(0, |e| e.items.len()))
  }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    let entries = self.entries.calculate_locked(Option::take);
    if let Some(entries) = entries {
      for (_, disposable) in entries.items {
        disposable.dispose();
      }
    }
  }
}

impl Cancelable for CompositeDisposable {
  fn is_disposed(&self) -> bool { self.entries.lock().is_none() }
}

impl SynchronizedUnsubscribe for CompositeDisposable {
  type DisposeKey = DisposeKey;

  fn synchronized_unsubscribe(&self, key: DisposeKey) { self.remove(key) }
}

impl std::fmt::Debug for CompositeDisposable {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let (disposed, count) = self.entries.calculate_locked(|entries| {
      (entries.is_none(), entries.as_ref().map_or(0, |e| e.items.len()))
    });
    f.debug_struct("CompositeDisposable")
      .field("is_disposed", &disposed)
      .field("count", &count)
      .finish()
  }
}
