//! Process-wide error hooks.
//!
//! The settings are created with their defaults on first access and can be
//! read or replaced at any time from any thread. All access goes through
//! one reentrant lock, so a hook may itself read or change the hooks, even
//! from inside [`Hooks::configure`].
//!
//! Code that reports errors should not read the globals deep inside a
//! pipeline: take an [`ErrorHooks`] snapshot where the pipeline is set up
//! (see [`SubscribeHandlers::with_hooks`](crate::subscribe::SubscribeHandlers::with_hooks))
//! and report through it.

use std::{cell::RefCell, fmt::Debug, sync::Arc};

use once_cell::sync::Lazy;

use crate::sync::ReentrantLock;

/// Receives errors that reached a subscription without an error handler,
/// together with the call stack captured when it subscribed (empty unless
/// recording is enabled).
pub type DefaultErrorHandler = Arc<dyn Fn(&[String], &dyn Debug) + Send + Sync>;

/// Captures the call stack of a subscription.
pub type CaptureCallStack = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// A copy of the hook settings.
#[derive(Clone)]
pub struct ErrorHooks {
  pub default_error_handler: DefaultErrorHandler,
  pub capture_call_stack: CaptureCallStack,
  pub record_call_stack_on_error: bool,
}

impl Default for ErrorHooks {
  fn default() -> Self {
    Self {
      default_error_handler: Arc::new(log_unhandled_error),
      capture_call_stack: Arc::new(capture_backtrace),
      record_call_stack_on_error: false,
    }
  }
}

impl ErrorHooks {
  /// The call stack to attach to a new subscription; empty when recording
  /// is disabled.
  pub fn capture_subscription_call_stack(&self) -> Vec<String> {
    if self.record_call_stack_on_error { (self.capture_call_stack)() } else { Vec::new() }
  }

  /// Hand an unhandled error to the default error handler.
  pub fn report(&self, call_stack: &[String], error: &dyn Debug) {
    (self.default_error_handler)(call_stack, error)
  }
}

impl Debug for ErrorHooks {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ErrorHooks")
      .field("record_call_stack_on_error", &self.record_call_stack_on_error)
      .finish_non_exhaustive()
  }
}

fn log_unhandled_error(call_stack: &[String], error: &dyn Debug) {
  tracing::error!(error = ?error, call_stack = %call_stack.join("\n"), "unhandled error happened");
}

fn capture_backtrace() -> Vec<String> {
  if cfg!(debug_assertions) {
    std::backtrace::Backtrace::force_capture().to_string().lines().map(str::to_owned).collect()
  } else {
    Vec::new()
  }
}

static HOOKS: Lazy<ReentrantLock<RefCell<ErrorHooks>>> =
  Lazy::new(|| ReentrantLock::new(RefCell::new(ErrorHooks::default())));

/// Accessors for the process-wide hook settings.
pub struct Hooks;

impl Hooks {
  pub fn default_error_handler() -> DefaultErrorHandler {
    HOOKS.calculate_locked(|hooks| hooks.borrow().default_error_handler.clone())
  }

  pub fn set_default_error_handler(
    handler: impl Fn(&[String], &dyn Debug) + Send + Sync + 'static,
  ) {
    Self::update(|hooks| hooks.default_error_handler = Arc::new(handler));
  }

  pub fn custom_capture_subscription_call_stack() -> CaptureCallStack {
    HOOKS.calculate_locked(|hooks| hooks.borrow().capture_call_stack.clone())
  }

  pub fn set_custom_capture_subscription_call_stack(
    capture: impl Fn() -> Vec<String> + Send + Sync + 'static,
  ) {
    Self::update(|hooks| hooks.capture_call_stack = Arc::new(capture));
  }

  /// Whether subscriptions capture their call stack for error reports.
  /// Off by default.
  pub fn record_call_stack_on_error() -> bool {
    HOOKS.calculate_locked(|hooks| hooks.borrow().record_call_stack_on_error)
  }

  pub fn set_record_call_stack_on_error(record: bool) {
    Self::update(|hooks| hooks.record_call_stack_on_error = record);
  }

  /// A copy of the current settings.
  pub fn snapshot() -> ErrorHooks { HOOKS.calculate_locked(|hooks| hooks.borrow().clone()) }

  /// Change several settings at once. Other threads see either all of the
  /// changes or none of them.
  pub fn configure(f: impl FnOnce(&mut ErrorHooks)) { Self::update(f) }

  /// Restore the defaults.
  pub fn reset() { Self::update(|hooks| *hooks = ErrorHooks::default()) }

  /// Run `f` on a copy of the settings, then write back only the fields it
  /// changed. `f` may read or set the hooks itself; those nested writes
  /// stay in place unless `f` changes the same field.
  fn update(f: impl FnOnce(&mut ErrorHooks)) {
    HOOKS.perform_locked(|hooks| {
      let before = hooks.borrow().clone();
      let mut next = before.clone();
      f(&mut next);
      let replaced = hooks.borrow_mut().merge_changes(&before, next);
      // Released outside the borrow: dropping a closure may read the hooks.
      drop(replaced);
    });
  }
}

impl ErrorHooks {
  /// Apply the fields in which `next` differs from `before`, returning the
  /// values they replace.
  fn merge_changes(&mut self, before: &ErrorHooks, next: ErrorHooks) -> ErrorHooks {
    let mut replaced = self.clone();
    if !Arc::ptr_eq(&next.default_error_handler, &before.default_error_handler) {
      replaced.default_error_handler =
        std::mem::replace(&mut self.default_error_handler, next.default_error_handler);
    }
    if !Arc::ptr_eq(&next.capture_call_stack, &before.capture_call_stack) {
      replaced.capture_call_stack =
        std::mem::replace(&mut self.capture_call_stack, next.capture_call_stack);
    }
    if next.record_call_stack_on_error != before.record_call_stack_on_error {
      self.record_call_stack_on_error = next.record_call_stack_on_error;
    }
    replaced
  }
}
