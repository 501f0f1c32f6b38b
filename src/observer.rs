//! Observer trait and the termination guard
//!
//! An observer receives a sequence of [`Event`]s: any number of `Next`
//! values followed by at most one terminal `Error` or `Completed`.
//! [`ObserverBase`] enforces that grammar for any [`ObserverCore`], even
//! when events arrive concurrently from several threads.

use std::sync::Arc;

use crate::{disposable::Disposable, sync::OnceFlag};

// ============================================================================
// Event
// ============================================================================

/// One notification of a sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

impl<Item, Err> Event<Item, Err> {
  /// Whether this event terminates the sequence.
  #[inline]
  pub fn is_stop_event(&self) -> bool { !matches!(self, Event::Next(_)) }

  pub fn element(&self) -> Option<&Item> {
    match self {
      Event::Next(item) => Some(item),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&Err> {
    match self {
      Event::Error(err) => Some(err),
      _ => None,
    }
  }
}

// ============================================================================
// Observer Trait
// ============================================================================

/// The consumer of a sequence.
///
/// Takes `&self` so one observer can be shared between the threads that
/// produce events.
pub trait Observer<Item, Err> {
  fn on(&self, event: Event<Item, Err>);

  #[inline]
  fn on_next(&self, value: Item) { self.on(Event::Next(value)) }

  #[inline]
  fn on_error(&self, err: Err) { self.on(Event::Error(err)) }

  #[inline]
  fn on_completed(&self) { self.on(Event::Completed) }
}

impl<Item, Err, O> Observer<Item, Err> for Arc<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn on(&self, event: Event<Item, Err>) { (**self).on(event) }
}

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn on(&self, event: Event<Item, Err>) { (**self).on(event) }
}

// ============================================================================
// ObserverBase
// ============================================================================

/// Delivery routine wrapped by [`ObserverBase`]. Implementors see a
/// well-formed sequence and never need their own stop flag.
pub trait ObserverCore<Item, Err> {
  fn on_core(&self, event: Event<Item, Err>);
}

/// Guards an [`ObserverCore`] so that:
///
/// - `Next` is delivered only while the observer is not stopped (a value
///   racing with a terminal event on another thread may still get through;
///   producers are expected to serialize their events);
/// - the first terminal event stops the observer and is delivered, every
///   later one (including concurrent losers) is dropped;
/// - disposing stops the observer without delivering anything.
///
/// ```rust
/// use std::sync::Mutex;
///
/// use rxcore::prelude::*;
///
/// let seen = Mutex::new(Vec::new());
/// let observer = AnonymousObserver::from_fn(|event: Event<i32, ()>| {
///   seen.lock().unwrap().push(event);
/// });
/// observer.on_next(1);
/// observer.on_completed();
/// observer.on_next(2);
/// observer.on_error(());
/// assert_eq!(*seen.lock().unwrap(), [Event::Next(1), Event::Completed]);
/// ```
pub struct ObserverBase<C> {
  is_stopped: OnceFlag,
  core: C,
}

impl<C> ObserverBase<C> {
  pub fn new(core: C) -> Self { Self { is_stopped: OnceFlag::new(), core } }

  #[inline]
  pub fn is_stopped(&self) -> bool { self.is_stopped.is_set() }

  pub fn core(&self) -> &C { &self.core }
}

impl<Item, Err, C> Observer<Item, Err> for ObserverBase<C>
where
  C: ObserverCore<Item, Err>,
{
  fn on(&self, event: Event<Item, Err>) {
    let deliver = match event {
      Event::Next(_) => !self.is_stopped.is_set(),
      Event::Error(_) | Event::Completed => self.is_stopped.set(),
    };
    if deliver {
      self.core.on_core(event);
    }
  }
}

impl<C: Send + Sync> Disposable for ObserverBase<C> {
  fn dispose(&self) { self.is_stopped.set(); }
}

// ============================================================================
// AnonymousObserver - Closure adapter
// ============================================================================

/// [`ObserverCore`] that hands every event to a closure.
pub struct FnCore<F>(F);

impl<Item, Err, F> ObserverCore<Item, Err> for FnCore<F>
where
  F: Fn(Event<Item, Err>),
{
  #[inline]
  fn on_core(&self, event: Event<Item, Err>) { (self.0)(event) }
}

/// An observer built from a closure, with the [`ObserverBase`] guarantees.
pub type AnonymousObserver<F> = ObserverBase<FnCore<F>>;

impl<F> ObserverBase<FnCore<F>> {
  pub fn from_fn(f: F) -> Self { Self::new(FnCore(f)) }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Barrier, Mutex,
    },
    thread,
  };

  use super::*;

  #[derive(Default)]
  struct Counts {
    next: AtomicUsize,
    terminal: AtomicUsize,
  }

  impl ObserverCore<u32, &'static str> for Arc<Counts> {
    fn on_core(&self, event: Event<u32, &'static str>) {
      if event.is_stop_event() {
        self.terminal.fetch_add(1, Ordering::SeqCst);
      } else {
        self.next.fetch_add(1, Ordering::SeqCst);
      }
    }
  }

  #[rxcore_macro::test]
  fn event_accessors() {
    let next: Event<i32, &str> = Event::Next(1);
    assert!(!next.is_stop_event());
    assert_eq!(next.element(), Some(&1));
    assert!(Event::<i32, &str>::Error("e").is_stop_event());
    assert_eq!(Event::<i32, &str>::Error("e").error(), Some(&"e"));
    assert!(Event::<i32, &str>::Completed.is_stop_event());
  }

  #[rxcore_macro::test]
  fn first_terminal_event_wins() {
    let log = Mutex::new(Vec::new());
    let observer =
      AnonymousObserver::from_fn(|e: Event<i32, &'static str>| log.lock().unwrap().push(e));
    observer.on_next(1);
    observer.on_error("boom");
    observer.on_completed();
    observer.on_error("again");
    observer.on_next(2);
    assert!(observer.is_stopped());
    assert_eq!(*log.lock().unwrap(), [Event::Next(1), Event::Error("boom")]);
  }

  #[rxcore_macro::test]
  fn dispose_stops_delivery_silently() {
    let counts = Arc::new(Counts::default());
    let observer = ObserverBase::new(counts.clone());
    observer.on_next(1);
    observer.dispose();
    observer.on_next(2);
    observer.on_completed();
    assert_eq!(counts.next.load(Ordering::SeqCst), 1);
    assert_eq!(counts.terminal.load(Ordering::SeqCst), 0);
  }

  #[rxcore_macro::test]
  fn concurrent_events_deliver_one_terminal() {
    for _ in 0..20 {
      let counts = Arc::new(Counts::default());
      let observer = Arc::new(ObserverBase::new(counts.clone()));
      let barrier = Arc::new(Barrier::new(8));

      let handles: Vec<_> = (0..8)
        .map(|i| {
          let observer = observer.clone();
          let barrier = barrier.clone();
          thread::spawn(move || {
            barrier.wait();
            for v in 0..100 {
              observer.on_next(v);
            }
            match i % 2 {
              0 => observer.on_error("err"),
              _ => observer.on_completed(),
            }
            for v in 0..100 {
              observer.on_next(v);
            }
          })
        })
        .collect();
      handles.into_iter().for_each(|h| h.join().unwrap());

      assert_eq!(counts.terminal.load(Ordering::SeqCst), 1);
      // Values sent after a thread's own terminal call are always dropped.
      assert!(counts.next.load(Ordering::SeqCst) <= 8 * 100);
    }
  }

  #[rxcore_macro::test]
  fn arc_and_box_forward() {
    let counts = Arc::new(Counts::default());
    let boxed: Box<dyn Observer<u32, &'static str>> = Box::new(ObserverBase::new(counts.clone()));
    let shared = Arc::new(boxed);
    shared.on_next(3);
    shared.on_completed();
    assert_eq!(counts.next.load(Ordering::SeqCst), 1);
    assert_eq!(counts.terminal.load(Ordering::SeqCst), 1);
  }
}
