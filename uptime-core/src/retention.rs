use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::{config::RetentionConfig, error::Result, store::MonitorStore};

/// How long check history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    Unbounded,
    MaxAgeDays(u32),
}

impl RetentionPolicy {
    pub fn from_config(config: &RetentionConfig) -> Self {
        match config.check_days {
            0 => RetentionPolicy::Unbounded,
            days => RetentionPolicy::MaxAgeDays(days),
        }
    }

    /// Checks strictly older than this are expired.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RetentionPolicy::Unbounded => None,
            RetentionPolicy::MaxAgeDays(days) => Some(now - Duration::days(i64::from(*days))),
        }
    }

    pub async fn prune(&self, store: &dyn MonitorStore, now: DateTime<Utc>) -> Result<u64> {
        let Some(cutoff) = self.cutoff(now) else {
            return Ok(0);
        };

        let removed = store.delete_checks_before(cutoff).await?;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned expired monitor checks");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::MonitorCheck, store::MemoryStore};
    use uuid::Uuid;

    fn check_at(timestamp: DateTime<Utc>) -> MonitorCheck {
        MonitorCheck {
            id: Uuid::new_v4(),
            monitor_id: Uuid::new_v4(),
            success: true,
            response_time: 10,
            status_code: Some(200),
            error: None,
            timestamp,
        }
    }

    #[test]
    fn zero_days_means_unbounded() {
        assert_eq!(
            RetentionPolicy::from_config(&RetentionConfig { check_days: 0 }),
            RetentionPolicy::Unbounded
        );
        assert_eq!(
            RetentionPolicy::from_config(&RetentionConfig { check_days: 30 }),
            RetentionPolicy::MaxAgeDays(30)
        );
    }

    #[tokio::test]
    async fn test_prune_removes_only_expired_checks() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_check(check_at(now - Duration::days(31))).unwrap();
        store.insert_check(check_at(now - Duration::days(29))).unwrap();
        store.insert_check(check_at(now)).unwrap();

        let removed = RetentionPolicy::MaxAgeDays(30).prune(&store, now).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.checks().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_keeps_everything() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_check(check_at(now - Duration::days(3650))).unwrap();

        let removed = RetentionPolicy::Unbounded.prune(&store, now).await.unwrap();

        assert_eq!(removed, 0);
        assert_eq!(store.checks().unwrap().len(), 1);
    }
}
