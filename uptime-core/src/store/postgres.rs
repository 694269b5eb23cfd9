use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

use super::MonitorStore;
use crate::{
    db::DatabasePool,
    error::Result,
    models::{
        AlertTargets, Branding, ContactList, Monitor, MonitorCheck, MonitorStatus, StatusPage,
        StatusTransition,
    },
};

const MONITOR_COLUMNS: &str = "id, name, url, monitor_type, interval_secs, timeout_secs, status, last_check, \
     alert_emails, alert_phones, alert_webhooks, contact_list_ids, created_at, updated_at";

const CHECK_COLUMNS: &str = "id, monitor_id, success, response_time, status_code, error, checked_at";

pub struct PgStore {
    db: DatabasePool,
}

impl PgStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

fn monitor_from_row(row: &PgRow) -> Result<Monitor> {
    let kind: String = row.try_get("monitor_type")?;
    let status: String = row.try_get("status")?;

    Ok(Monitor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        kind: kind.parse()?,
        interval: row.try_get("interval_secs")?,
        timeout: row.try_get("timeout_secs")?,
        status: status.parse()?,
        last_check: row.try_get("last_check")?,
        alerts: AlertTargets {
            email: row.try_get("alert_emails")?,
            phone: row.try_get("alert_phones")?,
            webhook: row.try_get("alert_webhooks")?,
        },
        contact_lists: row.try_get("contact_list_ids")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn check_from_row(row: &PgRow) -> Result<MonitorCheck> {
    Ok(MonitorCheck {
        id: row.try_get("id")?,
        monitor_id: row.try_get("monitor_id")?,
        success: row.try_get("success")?,
        response_time: row.try_get("response_time")?,
        status_code: row.try_get("status_code")?,
        error: row.try_get("error")?,
        timestamp: row.try_get("checked_at")?,
    })
}

fn contact_list_from_row(row: &PgRow) -> Result<ContactList> {
    Ok(ContactList {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        emails: row.try_get("emails")?,
        phones: row.try_get("phones")?,
        webhooks: row.try_get("webhooks")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn status_page_from_row(row: &PgRow) -> Result<StatusPage> {
    Ok(StatusPage {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        monitors: row.try_get("monitor_ids")?,
        branding: Branding {
            logo: row.try_get("logo")?,
            primary_color: row.try_get("primary_color")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MonitorStore for PgStore {
    async fn find_monitors_by_status(&self, statuses: &[MonitorStatus]) -> Result<Vec<Monitor>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM monitors WHERE status = ANY($1)",
            MONITOR_COLUMNS
        ))
        .bind(statuses)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(monitor_from_row).collect()
    }

    async fn find_monitors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Monitor>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM monitors WHERE id = ANY($1)",
            MONITOR_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(monitor_from_row).collect()
    }

    async fn create_check(&self, check: &MonitorCheck) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO monitor_checks (id, monitor_id, success, response_time, status_code, error, checked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(check.id)
        .bind(check.monitor_id)
        .bind(check.success)
        .bind(check.response_time)
        .bind(check.status_code)
        .bind(&check.error)
        .bind(check.timestamp)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_monitor_status(
        &self,
        monitor_id: Uuid,
        status: MonitorStatus,
        last_check: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE monitors SET status = $2, last_check = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(monitor_id)
        .bind(status.as_str())
        .bind(last_check)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_contact_lists(&self, ids: &[Uuid]) -> Result<Vec<ContactList>> {
        let rows = sqlx::query(
            "SELECT id, name, description, emails, phones, webhooks, created_at, updated_at \
             FROM contact_lists WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(contact_list_from_row).collect()
    }

    async fn record_transition(&self, transition: &StatusTransition) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO status_transitions (id, monitor_id, from_status, to_status, check_id, error, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(transition.id)
        .bind(transition.monitor_id)
        .bind(transition.from_status.as_str())
        .bind(transition.to_status.as_str())
        .bind(transition.check_id)
        .bind(&transition.error)
        .bind(transition.occurred_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_checks_since(&self, monitor_id: Uuid, since: DateTime<Utc>) -> Result<Vec<MonitorCheck>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM monitor_checks WHERE monitor_id = $1 AND checked_at >= $2 ORDER BY checked_at DESC",
            CHECK_COLUMNS
        ))
        .bind(monitor_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(check_from_row).collect()
    }

    async fn delete_checks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM monitor_checks WHERE checked_at < $1")
            .bind(cutoff)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_status_page(&self, slug: &str) -> Result<Option<StatusPage>> {
        let row = sqlx::query(
            "SELECT id, slug, title, description, monitor_ids, logo, primary_color, created_at, updated_at \
             FROM status_pages WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(status_page_from_row).transpose()
    }
}
