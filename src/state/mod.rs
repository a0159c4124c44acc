//! Process-wide shared state for crawl admission
//!
//! # Components
//!
//! - `RateBudget`: remaining crawls in the current window
//! - `AdmissionPools`: bounded concurrency per priority class
//! - `CompletionRegistry`: URL completion flags between workers and requests
//! - `ConfigManager`: pool sizes and speed, persisted in the cache service

mod budget;
mod pools;
mod registry;
mod settings;

// Re-export main types
pub use budget::RateBudget;
pub use pools::{AdmissionError, AdmissionPool, AdmissionPools, PriorityClass, WorkerSlot};
pub use registry::{CompletionRegistry, CompletionWatch};
pub use settings::{
    ConfigManager, PoolConfiguration, SettingsError, NON_PAYING_WORKERS_KEY, PAGES_PER_HOUR_KEY,
    PAYING_WORKERS_KEY,
};

use tokio::sync::{Mutex, MutexGuard};

/// State shared by request handlers, crawl workers and the budget reset task
#[derive(Debug)]
pub struct SharedState {
    pub budget: RateBudget,
    pub pools: AdmissionPools,
    pub registry: CompletionRegistry,
    config: Mutex<PoolConfiguration>,
}

impl SharedState {
    pub fn new(config: PoolConfiguration) -> Self {
        Self {
            budget: RateBudget::for_config(&config),
            pools: AdmissionPools::new(
                config.capacity(PriorityClass::Paying),
                config.capacity(PriorityClass::NonPaying),
            ),
            registry: CompletionRegistry::new(),
            config: Mutex::new(config),
        }
    }

    pub async fn pool_configuration(&self) -> PoolConfiguration {
        *self.config.lock().await
    }

    /// Restores the full budget for the current configuration
    pub async fn reset_budget(&self) -> i64 {
        let config = self.config.lock().await;
        self.budget.recompute(&config)
    }

    pub(crate) async fn lock_config(&self) -> MutexGuard<'_, PoolConfiguration> {
        self.config.lock().await
    }

    /// Brings pools and budget in line with `config`
    ///
    /// Callers hold the configuration lock.
    pub(crate) fn apply(&self, config: &PoolConfiguration) {
        for class in [PriorityClass::Paying, PriorityClass::NonPaying] {
            self.pools.resize(class, config.capacity(class));
        }
        self.budget.recompute(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_state_matches_config() {
        let shared = SharedState::new(PoolConfiguration {
            paying_workers: 4,
            non_paying_workers: 1,
            pages_per_hour: 3,
        });

        assert_eq!(shared.pools.capacity(PriorityClass::Paying), 4);
        assert_eq!(shared.pools.capacity(PriorityClass::NonPaying), 1);
        assert_eq!(shared.budget.remaining(), 15);
        assert_eq!(shared.registry.pending(), 0);
    }

    #[tokio::test]
    async fn test_reset_budget_uses_current_config() {
        let shared = SharedState::new(PoolConfiguration::default());
        for _ in 0..10 {
            shared.budget.decrement();
        }
        assert_eq!(shared.budget.remaining(), 60);

        assert_eq!(shared.reset_budget().await, 70);
        assert_eq!(shared.budget.remaining(), 70);
    }
}
