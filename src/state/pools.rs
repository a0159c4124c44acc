//! Admission pools for the two priority classes
//!
//! Each class has one long-lived pool for the life of the process. Capacity
//! changes are applied to that pool in place instead of swapping in a new
//! one, so slots handed out before a resize are still counted against the
//! pool they came from:
//! - Growing adds permits, first cancelling any outstanding shrink debt
//! - Shrinking retires idle permits at once and records the rest as debt
//! - A released slot pays one unit of debt by retiring its permit

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Requester category; each has its own pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityClass {
    Paying,
    NonPaying,
}

impl PriorityClass {
    /// Maps the `paying` query flag to a class
    pub fn from_paying_flag(paying: bool) -> Self {
        if paying {
            Self::Paying
        } else {
            Self::NonPaying
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paying => "paying",
            Self::NonPaying => "non-paying",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from slot acquisition
///
/// Maps tokio's closed-semaphore error. The pools never close their
/// semaphores, so this is not produced while the process runs; callers still
/// get an error value instead of a panic if that ever changes.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Admission pool for {0} requests is closed")]
    Closed(PriorityClass),
}

#[derive(Debug)]
struct Accounting {
    capacity: usize,
    /// Permits still to retire after a shrink
    debt: usize,
}

#[derive(Debug)]
struct PoolInner {
    class: PriorityClass,
    semaphore: Arc<Semaphore>,
    accounting: Mutex<Accounting>,
    in_flight: AtomicUsize,
}

impl PoolInner {
    fn accounting(&self) -> MutexGuard<'_, Accounting> {
        self.accounting.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A bounded pool admitting at most `capacity` concurrent crawls of one class
#[derive(Debug, Clone)]
pub struct AdmissionPool {
    inner: Arc<PoolInner>,
}

impl AdmissionPool {
    pub fn new(class: PriorityClass, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                class,
                semaphore: Arc::new(Semaphore::new(capacity)),
                accounting: Mutex::new(Accounting { capacity, debt: 0 }),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Waits until a slot is free and takes it
    ///
    /// Waiters are served in arrival order. There is no timeout.
    pub async fn acquire(&self) -> Result<WorkerSlot, AdmissionError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AdmissionError::Closed(self.inner.class))?;
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);

        Ok(WorkerSlot {
            class: self.inner.class,
            permit: Some(permit),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Takes a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<WorkerSlot> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok()?;
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);

        Some(WorkerSlot {
            class: self.inner.class,
            permit: Some(permit),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Changes the capacity in place
    pub fn resize(&self, new_capacity: usize) {
        let mut accounting = self.inner.accounting();
        let old_capacity = accounting.capacity;

        if new_capacity > old_capacity {
            let grow = new_capacity - old_capacity;
            let repaid = grow.min(accounting.debt);
            accounting.debt -= repaid;
            self.inner.semaphore.add_permits(grow - repaid);
        } else if new_capacity < old_capacity {
            let shrink = old_capacity - new_capacity;
            let retired = self.inner.semaphore.forget_permits(shrink);
            accounting.debt += shrink - retired;
        }

        accounting.capacity = new_capacity;
        tracing::debug!(
            "Resized {} pool: {} -> {} (debt {})",
            self.inner.class,
            old_capacity,
            new_capacity,
            accounting.debt
        );
    }

    pub fn class(&self) -> PriorityClass {
        self.inner.class
    }

    pub fn capacity(&self) -> usize {
        self.inner.accounting().capacity
    }

    /// Slots currently held by crawls
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Slots that could be taken without waiting
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }
}

/// Admission token held by one crawl
///
/// Dropping the slot releases it. A crawl that owns its slot therefore gives
/// it back on every exit path, including early returns and panics.
#[derive(Debug)]
pub struct WorkerSlot {
    class: PriorityClass,
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<PoolInner>,
}

impl WorkerSlot {
    pub fn class(&self) -> PriorityClass {
        self.class
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        self.pool.in_flight.fetch_sub(1, Ordering::SeqCst);

        // settle the permit under the lock so a concurrent resize sees it
        let mut accounting = self.pool.accounting();
        if accounting.debt > 0 {
            accounting.debt -= 1;
            permit.forget();
        } else {
            drop(permit);
        }
    }
}

/// The paying and non-paying pools
#[derive(Debug, Clone)]
pub struct AdmissionPools {
    paying: AdmissionPool,
    non_paying: AdmissionPool,
}

impl AdmissionPools {
    pub fn new(paying_capacity: usize, non_paying_capacity: usize) -> Self {
        Self {
            paying: AdmissionPool::new(PriorityClass::Paying, paying_capacity),
            non_paying: AdmissionPool::new(PriorityClass::NonPaying, non_paying_capacity),
        }
    }

    pub fn pool(&self, class: PriorityClass) -> &AdmissionPool {
        match class {
            PriorityClass::Paying => &self.paying,
            PriorityClass::NonPaying => &self.non_paying,
        }
    }

    pub async fn acquire(&self, class: PriorityClass) -> Result<WorkerSlot, AdmissionError> {
        self.pool(class).acquire().await
    }

    pub fn resize(&self, class: PriorityClass, new_capacity: usize) {
        self.pool(class).resize(new_capacity);
    }

    pub fn capacity(&self, class: PriorityClass) -> usize {
        self.pool(class).capacity()
    }

    pub fn in_flight(&self, class: PriorityClass) -> usize {
        self.pool(class).in_flight()
    }
}
