//! Entry point used by external triggers (cron endpoint, scheduler job).

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{info, warn};

use crate::{
    engine::{CheckEngine, CycleReport},
    error::Result,
    retention::RetentionPolicy,
};

/// Guards against two cycles running at once. `try_acquire` yields a token
/// on success and `None` when someone else holds the lock.
#[async_trait]
pub trait CycleLock: Send + Sync {
    async fn try_acquire(&self) -> Result<Option<String>>;

    async fn release(&self, token: &str) -> Result<()>;

    /// Synchronous release for a cycle that was dropped before finishing.
    /// Backends whose lease expires on its own can leave this as a no-op.
    fn abandon(&self, _token: &str) {}
}

/// Single-process guard.
#[derive(Default)]
pub struct LocalCycleLock {
    held: AtomicBool,
}

impl LocalCycleLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CycleLock for LocalCycleLock {
    async fn try_acquire(&self) -> Result<Option<String>> {
        let acquired = self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        Ok(acquired.then(|| "local".to_string()))
    }

    async fn release(&self, _token: &str) -> Result<()> {
        self.held.store(false, Ordering::Release);
        Ok(())
    }

    fn abandon(&self, _token: &str) {
        self.held.store(false, Ordering::Release);
    }
}

/// Held for the length of one cycle. Dropping it without [`LockLease::release`]
/// (the trigger future was cancelled) abandons the lock instead of leaking it.
struct LockLease {
    lock: Arc<dyn CycleLock>,
    token: Option<String>,
}

impl LockLease {
    async fn release(mut self) {
        if let Some(token) = self.token.take() {
            if let Err(e) = self.lock.release(&token).await {
                warn!("Failed to release cycle lock: {}", e);
            }
        }
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            warn!("Check cycle cancelled before completion, abandoning cycle lock");
            self.lock.abandon(&token);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Ran(CycleReport),
    /// Another cycle holds the lock.
    Skipped,
}

pub struct CycleRunner {
    engine: Arc<CheckEngine>,
    lock: Arc<dyn CycleLock>,
    retention: RetentionPolicy,
}

impl CycleRunner {
    pub fn new(engine: Arc<CheckEngine>, lock: Arc<dyn CycleLock>, retention: RetentionPolicy) -> Self {
        Self {
            engine,
            lock,
            retention,
        }
    }

    pub fn engine(&self) -> &Arc<CheckEngine> {
        &self.engine
    }

    pub async fn trigger(&self) -> Result<TriggerOutcome> {
        let lease = match self.lock.try_acquire().await {
            Ok(Some(token)) => Some(LockLease {
                lock: self.lock.clone(),
                token: Some(token),
            }),
            Ok(None) => {
                info!("Check cycle already running, skipping this trigger");
                return Ok(TriggerOutcome::Skipped);
            }
            Err(e) => {
                warn!("Cycle lock unavailable, running without it: {}", e);
                None
            }
        };

        let result = self.run_and_prune().await;

        if let Some(lease) = lease {
            lease.release().await;
        }

        result.map(TriggerOutcome::Ran)
    }

    async fn run_and_prune(&self) -> Result<CycleReport> {
        let report = self.engine.run_cycle().await?;

        if let Err(e) = self.retention.prune(self.engine.store().as_ref(), Utc::now()).await {
            warn!("Failed to prune check history: {}", e);
        }

        Ok(report)
    }
}
