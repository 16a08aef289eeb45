//! Blocking counting semaphore.
//!
//! A waiter blocks on a condition variable (a futex wait on Linux) until a
//! permit is released, which is the state the contention scenario exists to
//! produce.
//!
//! # Invariants
//!
//! - The count never exceeds the initial count: permits are only created by
//!   a successful acquire and each is released exactly once, on drop.
//! - The count never goes negative: acquire waits while it is zero.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Counting semaphore with RAII permits
#[derive(Debug)]
pub struct CountingSemaphore {
    initial: usize,
    count: Mutex<usize>,
    cv: Condvar,
}

impl CountingSemaphore {
    /// Create a semaphore holding `initial` permits.
    ///
    /// # Panics
    ///
    /// Panics if `initial` is 0, since nothing could ever be acquired.
    pub fn new(initial: usize) -> Self {
        assert!(initial > 0, "CountingSemaphore needs at least one permit");
        Self {
            initial,
            count: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    /// A semaphore with count 1, used as a mutex.
    pub fn binary() -> Self {
        Self::new(1)
    }

    // The count is a plain integer updated in single statements, so a
    // poisoned guard still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Snapshot of the currently available permits.
    pub fn available(&self) -> usize {
        *self.lock()
    }

    /// Take one permit, blocking while none is available.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        let mut count = self.lock();
        while *count == 0 {
            count = self.cv.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
        SemaphorePermit { semaphore: self }
    }

    /// Take one permit if available without blocking.
    pub fn try_acquire(&self) -> Option<SemaphorePermit<'_>> {
        let mut count = self.lock();
        if *count == 0 {
            return None;
        }
        *count -= 1;
        Some(SemaphorePermit { semaphore: self })
    }

    fn release(&self) {
        let mut count = self.lock();
        debug_assert!(
            *count < self.initial,
            "semaphore released past its initial count"
        );
        *count += 1;
        drop(count);
        self.cv.notify_one();
    }
}

/// A held permit; dropping it releases the permit
#[must_use = "dropping the permit releases it immediately"]
#[derive(Debug)]
pub struct SemaphorePermit<'a> {
    semaphore: &'a CountingSemaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
