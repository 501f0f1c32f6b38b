//! Prelude module for convenient imports
//!
//! Brings the traits into scope together with the types most code needs.
//! The `disposable` module itself is exported so that `disposable::empty()`
//! and `disposable::create(..)` read naturally.

// Disposables
pub use crate::disposable::{
  self, BinaryDisposable, BooleanDisposable, BoxedCancelable, BoxedDisposable, Cancelable,
  CompositeDisposable, Disposable, RefCountDisposable, SerialDisposable, SharedDisposable,
  SingleAssignmentDisposable,
};
// Hooks
pub use crate::hooks::{ErrorHooks, Hooks};
// Observer
pub use crate::observer::{AnonymousObserver, Event, Observer, ObserverBase, ObserverCore};
// Schedulers
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  AnyRecursiveScheduler, CurrentThreadScheduler, ImmediateScheduler, MainScheduler, Scheduler,
  SchedulerError, SerialDispatchQueue, SerialDispatchQueueScheduler, TestScheduler,
};
// Subscription boundary
pub use crate::subscribe::{ObservableType, SubscribeExt, SubscribeHandlers};
// Locks
pub use crate::sync::{AsyncLock, ReentrantLock, SpinLock};
