use crate::state::PoolConfiguration;
use std::sync::atomic::{AtomicI64, Ordering};

/// Remaining crawls permitted in the current window
///
/// This is a soft gate: requests check `is_available` before admission and
/// every dispatched crawl decrements afterwards, so concurrent requests can
/// drive the value below zero. That overshoot is accepted and wiped by the
/// next `recompute`.
#[derive(Debug)]
pub struct RateBudget {
    remaining: AtomicI64,
}

impl RateBudget {
    /// Creates a budget with `limit` crawls remaining
    pub fn new(limit: i64) -> Self {
        Self {
            remaining: AtomicI64::new(limit),
        }
    }

    /// Creates a full budget for a pool configuration
    pub fn for_config(config: &PoolConfiguration) -> Self {
        Self::new(config.hourly_limit())
    }

    /// Records one dispatched crawl, returning the new remaining count
    ///
    /// Unbounded below.
    pub fn decrement(&self) -> i64 {
        self.remaining.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Whether another crawl may be admitted
    pub fn is_available(&self) -> bool {
        self.remaining() > 0
    }

    /// Resets the budget to `pages_per_hour × total pool capacity`
    pub fn recompute(&self, config: &PoolConfiguration) -> i64 {
        let limit = config.hourly_limit();
        self.remaining.store(limit, Ordering::SeqCst);
        limit
    }

    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config(paying: u32, non_paying: u32, pages_per_hour: u32) -> PoolConfiguration {
        PoolConfiguration {
            paying_workers: paying,
            non_paying_workers: non_paying,
            pages_per_hour,
        }
    }

    #[test]
    fn test_initial_budget_from_config() {
        let budget = RateBudget::for_config(&config(5, 2, 10));
        assert_eq!(budget.remaining(), 70);
        assert!(budget.is_available());
    }

    #[test]
    fn test_decrement_by_exactly_one() {
        let budget = RateBudget::new(3);
        assert_eq!(budget.decrement(), 2);
        assert_eq!(budget.decrement(), 1);
        assert_eq!(budget.remaining(), 1);
    }

    #[test]
    fn test_unavailable_at_zero_and_below() {
        let budget = RateBudget::new(1);
        budget.decrement();
        assert!(!budget.is_available());

        // no guard: an unchecked decrement goes negative
        assert_eq!(budget.decrement(), -1);
        assert!(!budget.is_available());
    }

    #[test]
    fn test_recompute_restores_full_budget() {
        let budget = RateBudget::for_config(&config(5, 2, 10));
        for _ in 0..75 {
            budget.decrement();
        }
        assert_eq!(budget.remaining(), -5);

        assert_eq!(budget.recompute(&config(5, 2, 20)), 140);
        assert_eq!(budget.remaining(), 140);
    }

    #[test]
    fn test_zero_speed_disables_crawling() {
        let budget = RateBudget::for_config(&config(5, 2, 0));
        assert!(!budget.is_available());
    }

    #[test]
    fn test_concurrent_decrements_are_not_lost() {
        let budget = Arc::new(RateBudget::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let budget = Arc::clone(&budget);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        budget.decrement();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(budget.remaining(), 200);
    }
}
