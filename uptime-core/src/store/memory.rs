use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

use super::MonitorStore;
use crate::{
    error::{Error, Result},
    models::{ContactList, Monitor, MonitorCheck, MonitorStatus, StatusPage, StatusTransition},
};

#[derive(Default)]
struct Tables {
    monitors: Vec<Monitor>,
    checks: Vec<MonitorCheck>,
    contact_lists: Vec<ContactList>,
    status_pages: Vec<StatusPage>,
    transitions: Vec<StatusTransition>,
}

/// Process-local store. Keeps insertion order, which is also the order
/// monitors come back in.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_monitor_queries: AtomicBool,
    fail_check_writes: AtomicBool,
    fail_contact_lists: AtomicBool,
    fail_transitions: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }

    pub fn insert_monitor(&self, monitor: Monitor) -> Result<()> {
        self.tables()?.monitors.push(monitor);
        Ok(())
    }

    pub fn insert_contact_list(&self, list: ContactList) -> Result<()> {
        self.tables()?.contact_lists.push(list);
        Ok(())
    }

    pub fn insert_status_page(&self, page: StatusPage) -> Result<()> {
        self.tables()?.status_pages.push(page);
        Ok(())
    }

    pub fn insert_check(&self, check: MonitorCheck) -> Result<()> {
        self.tables()?.checks.push(check);
        Ok(())
    }

    pub fn monitor(&self, id: Uuid) -> Result<Option<Monitor>> {
        Ok(self.tables()?.monitors.iter().find(|m| m.id == id).cloned())
    }

    pub fn checks(&self) -> Result<Vec<MonitorCheck>> {
        Ok(self.tables()?.checks.clone())
    }

    pub fn transitions(&self) -> Result<Vec<StatusTransition>> {
        Ok(self.tables()?.transitions.clone())
    }

    pub fn fail_monitor_queries(&self, fail: bool) {
        self.fail_monitor_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_check_writes(&self, fail: bool) {
        self.fail_check_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_contact_lists(&self, fail: bool) {
        self.fail_contact_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_transitions(&self, fail: bool) {
        self.fail_transitions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn find_monitors_by_status(&self, statuses: &[MonitorStatus]) -> Result<Vec<Monitor>> {
        if self.fail_monitor_queries.load(Ordering::SeqCst) {
            return Err(Error::internal("monitor query unavailable"));
        }
        Ok(self
            .tables()?
            .monitors
            .iter()
            .filter(|m| statuses.contains(&m.status))
            .cloned()
            .collect())
    }

    async fn find_monitors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Monitor>> {
        if self.fail_monitor_queries.load(Ordering::SeqCst) {
            return Err(Error::internal("monitor query unavailable"));
        }
        Ok(self
            .tables()?
            .monitors
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn create_check(&self, check: &MonitorCheck) -> Result<()> {
        if self.fail_check_writes.load(Ordering::SeqCst) {
            return Err(Error::internal("check write rejected"));
        }
        self.tables()?.checks.push(check.clone());
        Ok(())
    }

    async fn update_monitor_status(
        &self,
        monitor_id: Uuid,
        status: MonitorStatus,
        last_check: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.tables()?;
        let monitor = tables
            .monitors
            .iter_mut()
            .find(|m| m.id == monitor_id)
            .ok_or_else(|| Error::not_found(format!("monitor {}", monitor_id)))?;
        monitor.status = status;
        monitor.last_check = Some(last_check);
        monitor.updated_at = Utc::now();
        Ok(())
    }

    async fn find_contact_lists(&self, ids: &[Uuid]) -> Result<Vec<ContactList>> {
        if self.fail_contact_lists.load(Ordering::SeqCst) {
            return Err(Error::internal("contact lists unavailable"));
        }
        Ok(self
            .tables()?
            .contact_lists
            .iter()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect())
    }

    async fn record_transition(&self, transition: &StatusTransition) -> Result<()> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(Error::internal("transition log unavailable"));
        }
        self.tables()?.transitions.push(transition.clone());
        Ok(())
    }

    async fn find_checks_since(&self, monitor_id: Uuid, since: DateTime<Utc>) -> Result<Vec<MonitorCheck>> {
        let mut checks: Vec<MonitorCheck> = self
            .tables()?
            .checks
            .iter()
            .filter(|c| c.monitor_id == monitor_id && c.timestamp >= since)
            .cloned()
            .collect();
        checks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(checks)
    }

    async fn delete_checks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables()?;
        let before = tables.checks.len();
        tables.checks.retain(|c| c.timestamp >= cutoff);
        Ok((before - tables.checks.len()) as u64)
    }

    async fn find_status_page(&self, slug: &str) -> Result<Option<StatusPage>> {
        Ok(self
            .tables()?
            .status_pages
            .iter()
            .find(|p| p.slug == slug)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn monitor(status: MonitorStatus) -> Monitor {
        let mut monitor = Monitor::new("m", "https://example.com", 60, 30).unwrap();
        monitor.status = status;
        monitor
    }

    #[tokio::test]
    async fn test_status_filter_excludes_paused() {
        let store = MemoryStore::new();
        store.insert_monitor(monitor(MonitorStatus::Up)).unwrap();
        store.insert_monitor(monitor(MonitorStatus::Paused)).unwrap();
        store.insert_monitor(monitor(MonitorStatus::Down)).unwrap();

        let active = store.find_monitors_by_status(&MonitorStatus::ACTIVE).await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|m| m.status != MonitorStatus::Paused));
    }

    #[tokio::test]
    async fn test_checks_since_newest_first() {
        let store = MemoryStore::new();
        let m = monitor(MonitorStatus::Up);
        let now = Utc::now();
        for minutes in [30, 5, 90] {
            store
                .insert_check(MonitorCheck {
                    id: Uuid::new_v4(),
                    monitor_id: m.id,
                    success: true,
                    response_time: 10,
                    status_code: Some(200),
                    error: None,
                    timestamp: now - Duration::minutes(minutes),
                })
                .unwrap();
        }

        let checks = store.find_checks_since(m.id, now - Duration::hours(1)).await.unwrap();
        assert_eq!(checks.len(), 2);
        assert!(checks[0].timestamp > checks[1].timestamp);
    }
}
