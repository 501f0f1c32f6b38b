//! The outer subscription boundary.
//!
//! [`ObservableType`] is what a source implements; [`SubscribeExt`] adds
//! closure-based subscription on top of it, with the unhandled-error
//! fallback of the [`hooks`](crate::hooks) module.

use std::{fmt::Debug, sync::Arc};

use crate::{
  disposable::{self, BinaryDisposable, BoxedDisposable, Disposable, SharedDisposable},
  hooks::{ErrorHooks, Hooks},
  observer::{AnonymousObserver, Event, Observer},
};

/// A source of events.
pub trait ObservableType<Item, Err> {
  /// Start delivering events to `observer`. Disposing the result stops the
  /// delivery.
  fn subscribe<O>(&self, observer: O) -> BoxedDisposable
  where
    O: Observer<Item, Err> + Send + Sync + 'static;
}

type NextHandler<Item> = Box<dyn Fn(Item) + Send + Sync>;
type ErrorHandler<Err> = Box<dyn Fn(Err) + Send + Sync>;
type CompletedHandler = Box<dyn Fn() + Send + Sync>;
type DisposedHandler = Box<dyn FnOnce() + Send>;

/// Closures for [`SubscribeExt::subscribe_with`]; every one is optional.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let handlers = SubscribeHandlers::<i32, String>::new()
///   .on_next(|v| println!("{v}"))
///   .on_error(|e| eprintln!("{e}"))
///   .on_disposed(|| println!("done"));
/// # drop(handlers);
/// ```
pub struct SubscribeHandlers<Item, Err> {
  on_next: Option<NextHandler<Item>>,
  on_error: Option<ErrorHandler<Err>>,
  on_completed: Option<CompletedHandler>,
  on_disposed: Option<DisposedHandler>,
  hooks: Option<ErrorHooks>,
}

impl<Item, Err> Default for SubscribeHandlers<Item, Err> {
  fn default() -> Self {
    Self { on_next: None, on_error: None, on_completed: None, on_disposed: None, hooks: None }
  }
}

impl<Item, Err> SubscribeHandlers<Item, Err> {
  pub fn new() -> Self { Self::default() }

  pub fn on_next(mut self, f: impl Fn(Item) + Send + Sync + 'static) -> Self {
    self.on_next = Some(Box::new(f));
    self
  }

  /// Without an error handler, errors go to the default error handler of
  /// the hooks.
  pub fn on_error(mut self, f: impl Fn(Err) + Send + Sync + 'static) -> Self {
    self.on_error = Some(Box::new(f));
    self
  }

  pub fn on_completed(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.on_completed = Some(Box::new(f));
    self
  }

  /// Runs once, after a terminal event or when the subscription is
  /// disposed, whichever comes first.
  pub fn on_disposed(mut self, f: impl FnOnce() + Send + 'static) -> Self {
    self.on_disposed = Some(Box::new(f));
    self
  }

  /// Report unhandled errors through `hooks` instead of a snapshot of the
  /// process-wide hooks taken at subscription time.
  pub fn with_hooks(mut self, hooks: ErrorHooks) -> Self {
    self.hooks = Some(hooks);
    self
  }
}

/// Closure-based subscription for every [`ObservableType`].
pub trait SubscribeExt<Item, Err>: ObservableType<Item, Err> {
  /// Subscribe with `handlers`.
  ///
  /// A terminal event runs its handler and then disposes the subscription's
  /// own resources (running `on_disposed`). An error without an `on_error`
  /// handler is reported to the default error handler, along with the call
  /// stack captured here if recording is enabled.
  fn subscribe_with(
    &self, handlers: SubscribeHandlers<Item, Err>,
  ) -> BinaryDisposable<BoxedDisposable, SharedDisposable>
  where
    Item: 'static,
    Err: Debug + 'static,
  {
    let SubscribeHandlers { on_next, on_error, on_completed, on_disposed, hooks } = handlers;
    let hooks = hooks.unwrap_or_else(Hooks::snapshot);
    let call_stack = hooks.capture_subscription_call_stack();

    let teardown: SharedDisposable = match on_disposed {
      Some(f) => Arc::new(disposable::create(f)),
      None => Arc::new(()),
    };
    let c_teardown = teardown.clone();

    let observer = AnonymousObserver::from_fn(move |event: Event<Item, Err>| match event {
      Event::Next(value) => {
        if let Some(f) = &on_next {
          f(value);
        }
      }
      Event::Error(err) => {
        match &on_error {
          Some(f) => f(err),
          None => hooks.report(&call_stack, &err),
        }
        c_teardown.dispose();
      }
      Event::Completed => {
        if let Some(f) = &on_completed {
          f();
        }
        c_teardown.dispose();
      }
    });

    BinaryDisposable::new(self.subscribe(observer), teardown)
  }
}

impl<T, Item, Err> SubscribeExt<Item, Err> for T where T: ObservableType<Item, Err> + ?Sized {}
