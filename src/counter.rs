//! Reference counters used by [`SharedHolder`](crate::shared::SharedHolder).
//!
//! The holder never touches the count directly; it goes through [`RefCounter`]
//! so the same holder code runs with a single-threaded [`LocalCount`] or a
//! thread-safe [`AtomicCount`].

use std::cell::Cell;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::error::HolderError;

mod sealed {
    pub trait Sealed {}
}

/// RefCounter: shared counter co-owned by every holder aliasing a resource
///
/// The holder frees memory on the numbers a counter reports, so the trait is
/// sealed: [`LocalCount`] and [`AtomicCount`] are the only implementations.
///
/// ```compile_fail
/// use holders::{HolderError, RefCounter};
///
/// struct AlwaysZero;
///
/// impl RefCounter for AlwaysZero {
///     const KIND: &'static str = "always-zero";
///     fn with_count(_: usize) -> Self { AlwaysZero }
///     fn current(&self) -> usize { 0 }
///     fn increment(&self) -> usize { 0 }
///     fn decrement(&self) -> Result<usize, HolderError> { Ok(0) }
///     fn try_claim_unique(&self) -> bool { true }
/// }
/// ```
pub trait RefCounter: sealed::Sealed {
    /// Label used in log lines and error messages.
    const KIND: &'static str;

    fn with_count(initial: usize) -> Self;

    fn current(&self) -> usize;

    /// Adds one owner and returns the new count.
    fn increment(&self) -> usize;

    /// Removes one owner and returns the new count. Never goes below zero.
    fn decrement(&self) -> Result<usize, HolderError>;

    /// Moves the count from 1 to 0 if the caller is the only owner.
    fn try_claim_unique(&self) -> bool;
}

//==============================================================================
// Single-threaded counter
//==============================================================================

/// LocalCount: plain counter for holders confined to one thread
///
/// `Cell` is not `Sync`, so holders built on it can't cross threads.
#[derive(Debug)]
pub struct LocalCount(Cell<usize>);

impl sealed::Sealed for LocalCount {}

impl RefCounter for LocalCount {
    const KIND: &'static str = "shared";

    fn with_count(initial: usize) -> Self {
        LocalCount(Cell::new(initial))
    }

    fn current(&self) -> usize {
        self.0.get()
    }

    fn increment(&self) -> usize {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }

    fn decrement(&self) -> Result<usize, HolderError> {
        match self.0.get() {
            0 => Err(HolderError::double_release(Self::KIND)),
            count => {
                self.0.set(count - 1);
                Ok(count - 1)
            }
        }
    }

    fn try_claim_unique(&self) -> bool {
        if self.0.get() == 1 {
            self.0.set(0);
            true
        } else {
            false
        }
    }
}

//==============================================================================
// Thread-safe counter
//==============================================================================

/// AtomicCount: counter for holders cloned and dropped across threads
#[derive(Debug)]
pub struct AtomicCount(AtomicUsize);

impl sealed::Sealed for AtomicCount {}

impl RefCounter for AtomicCount {
    const KIND: &'static str = "sync-shared";

    fn with_count(initial: usize) -> Self {
        AtomicCount(AtomicUsize::new(initial))
    }

    fn current(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn increment(&self) -> usize {
        // A new alias is made from an existing one, so no ordering is needed here.
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn decrement(&self) -> Result<usize, HolderError> {
        let previous = self
            .0
            .fetch_update(Ordering::Release, Ordering::Relaxed, |count| count.checked_sub(1))
            .map_err(|_| HolderError::double_release(Self::KIND))?;

        if previous == 1 {
            // Every other owner's use of the resource happens-before the release.
            fence(Ordering::Acquire);
        }
        Ok(previous - 1)
    }

    fn try_claim_unique(&self) -> bool {
        self.0
            .compare_exchange(1, 0, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}
