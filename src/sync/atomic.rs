use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ==================== OnceFlag ====================

/// A boolean that can be raised once.
///
/// [`OnceFlag::set`] reports whether *this* call performed the
/// `false -> true` transition, so "check the flag, then act" collapses into
/// one atomic step: only the winning caller acts.
#[derive(Debug, Default)]
pub struct OnceFlag(AtomicBool);

impl OnceFlag {
  pub const fn new() -> Self { Self(AtomicBool::new(false)) }

  /// Raise the flag. Returns `true` only for the caller that raised it.
  #[inline]
  pub fn set(&self) -> bool {
    self.0.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
  }

  #[inline]
  pub fn is_set(&self) -> bool { self.0.load(Ordering::Acquire) }
}

// ==================== AtomicBits ====================

/// A small word of independent flag bits.
///
/// Only ever gains bits; [`AtomicBits::fetch_or`] returns the word as it was
/// before the call so the caller can tell which bits it was first to set.
#[derive(Debug, Default)]
pub struct AtomicBits(AtomicU8);

impl AtomicBits {
  pub const fn new() -> Self { Self(AtomicU8::new(0)) }

  #[inline]
  pub fn fetch_or(&self, bits: u8) -> u8 { self.0.fetch_or(bits, Ordering::SeqCst) }

  #[inline]
  pub fn load(&self) -> u8 { self.0.load(Ordering::SeqCst) }

  #[inline]
  pub fn is_set(&self, bits: u8) -> bool { self.load() & bits == bits }
}

// ==================== Checked counters ====================

/// Increment a counter protected by the caller's lock.
///
/// # Panics
///
/// Overflowing the counter is a contract violation of the caller and panics
/// with `what` in the message.
#[inline]
pub fn increment_checked(counter: &mut usize, what: &str) -> usize {
  match counter.checked_add(1) {
    Some(v) => {
      *counter = v;
      v
    }
    None => panic!("{what}: counter overflow"),
  }
}

/// Decrement a counter protected by the caller's lock.
///
/// # Panics
///
/// Going below zero means a release without a matching retain and panics
/// with `what` in the message.
#[inline]
pub fn decrement_checked(counter: &mut usize, what: &str) -> usize {
  match counter.checked_sub(1) {
    Some(v) => {
      *counter = v;
      v
    }
    None => panic!("{what}: counter is lower than 0"),
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
    thread,
  };

  use super::*;

  #[rxcore_macro::test]
  fn once_flag_first_caller_wins() {
    let flag = OnceFlag::new();
    assert!(!flag.is_set());
    assert!(flag.set());
    assert!(!flag.set());
    assert!(flag.is_set());
  }

  #[rxcore_macro::test]
  fn once_flag_single_winner_across_threads() {
    let flag = Arc::new(OnceFlag::new());
    let winners = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let flag = flag.clone();
        let winners = winners.clone();
        thread::spawn(move || {
          if flag.set() {
            winners.fetch_add(1, Ordering::SeqCst);
          }
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(winners.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn bits_report_previous_word() {
    let bits = AtomicBits::new();
    assert_eq!(bits.fetch_or(0b01), 0);
    assert_eq!(bits.fetch_or(0b10), 0b01);
    assert!(bits.is_set(0b11));
  }

  #[rxcore_macro::test]
  fn checked_counters() {
    let mut c = 0;
    assert_eq!(increment_checked(&mut c, "test"), 1);
    assert_eq!(decrement_checked(&mut c, "test"), 0);
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "counter is lower than 0")]
  fn decrement_below_zero_panics() {
    let mut c = 0;
    decrement_checked(&mut c, "test");
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "counter overflow")]
  fn increment_past_capacity_panics() {
    let mut c = usize::MAX;
    increment_checked(&mut c, "test");
  }
}
