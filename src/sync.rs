//! Mutual-exclusion primitives used by the disposables and schedulers.
//!
//! | Type | Blocking | Reentrant | Used by |
//! |------|----------|-----------|---------|
//! | [`SpinLock`] | busy-waits | no | serial / ref-count disposables, [`AsyncLock`] |
//! | [`ReentrantLock`] | parks on contention | same thread only | recursive scheduling, hooks |
//! | [`AsyncLock`] | never | n/a (hands work off) | serializing action streams |
//!
//! Pick the spin gate for pure memory updates that never call out to user
//! code. Pick the reentrant lock when the protected region may run a user
//! callback that tries to come back in.

mod async_lock;
mod atomic;
mod reentrant_lock;
mod spin_lock;

pub use async_lock::AsyncLock;
pub use atomic::{decrement_checked, increment_checked, AtomicBits, OnceFlag};
pub use reentrant_lock::{ReentrantLock, ReentrantLockGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
