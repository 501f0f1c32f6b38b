//! # rxcore: the concurrency core of Reactive Extensions
//!
//! Disposal, locking and scheduling primitives that a reactive library is
//! built on. No operators live here.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::mpsc;
//!
//! use rxcore::prelude::*;
//!
//! let scheduler = SerialDispatchQueueScheduler::with_label("worker").unwrap();
//! let (tx, rx) = mpsc::channel();
//!
//! let token = scheduler.schedule_recursive(0, move |n, recurse| {
//!   if n < 10 {
//!     recurse(n + 1);
//!   } else {
//!     tx.send(n).unwrap();
//!   }
//! });
//! assert_eq!(rx.recv().unwrap(), 10);
//! token.dispose();
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Disposable`] / [`Cancelable`] | Idempotent, thread-safe release of a resource |
//! | [`ObserverBase`] | Enforces at most one terminal event per observer |
//! | [`ImmediateScheduler`] / [`Scheduler`] | Where and when work runs, returning a cancel token |
//! | [`SpinLock`] / [`ReentrantLock`] / [`AsyncLock`] | Mutual exclusion for the pieces above |
//! | [`Hooks`] | Process-wide handling of unhandled errors |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): [`ThreadPoolScheduler`] on a `futures` thread pool
//! - **`timer`** (default): `futures-time` delays for the thread-pool scheduler
//! - **`tokio-scheduler`**: [`TokioScheduler`] on a tokio runtime
//!
//! [`Disposable`]: disposable::Disposable
//! [`Cancelable`]: disposable::Cancelable
//! [`ObserverBase`]: observer::ObserverBase
//! [`ImmediateScheduler`]: scheduler::ImmediateScheduler
//! [`Scheduler`]: scheduler::Scheduler
//! [`SpinLock`]: sync::SpinLock
//! [`ReentrantLock`]: sync::ReentrantLock
//! [`AsyncLock`]: sync::AsyncLock
//! [`Hooks`]: hooks::Hooks
//! [`ThreadPoolScheduler`]: scheduler::ThreadPoolScheduler
//! [`TokioScheduler`]: scheduler::TokioScheduler

pub mod disposable;
pub mod hooks;
pub mod observer;
pub mod prelude;
pub mod scheduler;
pub mod subscribe;
pub mod sync;

// Bring README into Cargo-driven doctests.
#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
