use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{ContactList, Monitor, MonitorCheck, MonitorStatus, StatusPage, StatusTransition},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence operations the check engine and the read endpoints rely on.
/// Each call is expected to be individually atomic; nothing spans calls.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn find_monitors_by_status(&self, statuses: &[MonitorStatus]) -> Result<Vec<Monitor>>;

    async fn find_monitors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Monitor>>;

    async fn create_check(&self, check: &MonitorCheck) -> Result<()>;

    async fn update_monitor_status(
        &self,
        monitor_id: Uuid,
        status: MonitorStatus,
        last_check: DateTime<Utc>,
    ) -> Result<()>;

    async fn find_contact_lists(&self, ids: &[Uuid]) -> Result<Vec<ContactList>>;

    async fn record_transition(&self, transition: &StatusTransition) -> Result<()>;

    /// Newest first.
    async fn find_checks_since(&self, monitor_id: Uuid, since: DateTime<Utc>) -> Result<Vec<MonitorCheck>>;

    /// Returns the number of checks removed.
    async fn delete_checks_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn find_status_page(&self, slug: &str) -> Result<Option<StatusPage>>;
}
