use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{Branding, MonitorCheck, MonitorKind, MonitorStatus},
    store::MonitorStore,
};

/// Checks shown per monitor on a status page.
pub const STATUS_PAGE_RECENT_CHECKS: usize = 90;

/// Percentage of successful checks; 100 when there is no data.
pub fn uptime_percentage(checks: &[MonitorCheck]) -> f64 {
    if checks.is_empty() {
        return 100.0;
    }
    let successful = checks.iter().filter(|c| c.success).count();
    successful as f64 / checks.len() as f64 * 100.0
}

/// Mean response time of successful checks in milliseconds.
pub fn average_response_time(checks: &[MonitorCheck]) -> f64 {
    let times: Vec<f64> = checks
        .iter()
        .filter(|c| c.success)
        .map(|c| f64::from(c.response_time))
        .collect();
    if times.is_empty() {
        return 0.0;
    }
    times.iter().sum::<f64>() / times.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub monitor_id: Uuid,
    pub uptime_24h: f64,
    pub uptime_7d: f64,
    pub uptime_30d: f64,
    pub avg_response_time: f64,
    pub total_checks: usize,
    pub successful_checks: usize,
    pub failed_checks: usize,
    pub last_updated: DateTime<Utc>,
}

impl MonitorStats {
    /// `checks_30d` must cover the last 30 days; shorter windows are cut from it.
    pub fn from_checks(monitor_id: Uuid, checks_30d: &[MonitorCheck], now: DateTime<Utc>) -> Self {
        let since = |d: Duration| -> Vec<MonitorCheck> {
            checks_30d
                .iter()
                .filter(|c| c.timestamp >= now - d)
                .cloned()
                .collect()
        };

        let successful_checks = checks_30d.iter().filter(|c| c.success).count();
        Self {
            monitor_id,
            uptime_24h: uptime_percentage(&since(Duration::hours(24))),
            uptime_7d: uptime_percentage(&since(Duration::days(7))),
            uptime_30d: uptime_percentage(checks_30d),
            avg_response_time: average_response_time(checks_30d),
            total_checks: checks_30d.len(),
            successful_checks,
            failed_checks: checks_30d.len() - successful_checks,
            last_updated: now,
        }
    }
}

pub async fn monitor_stats(store: &dyn MonitorStore, monitor_id: Uuid, now: DateTime<Utc>) -> Result<MonitorStats> {
    let checks = store.find_checks_since(monitor_id, now - Duration::days(30)).await?;
    Ok(MonitorStats::from_checks(monitor_id, &checks, now))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageMonitor {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MonitorKind,
    pub status: MonitorStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub uptime_24h: f64,
    pub recent_checks: Vec<MonitorCheck>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageView {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub branding: Branding,
    pub monitors: Vec<StatusPageMonitor>,
}

/// Aggregates a status page for public display. Unknown monitor ids are
/// dropped; page order is kept.
pub async fn status_page_view(
    store: &dyn MonitorStore,
    slug: &str,
    now: DateTime<Utc>,
) -> Result<Option<StatusPageView>> {
    let Some(page) = store.find_status_page(slug).await? else {
        return Ok(None);
    };

    let monitors = store.find_monitors_by_ids(&page.monitors).await?;
    let mut entries = Vec::with_capacity(page.monitors.len());
    for id in &page.monitors {
        let Some(monitor) = monitors.iter().find(|m| m.id == *id) else {
            continue;
        };
        let checks = store.find_checks_since(monitor.id, now - Duration::hours(24)).await?;
        entries.push(StatusPageMonitor {
            id: monitor.id,
            name: monitor.name.clone(),
            url: monitor.url.clone(),
            kind: monitor.kind,
            status: monitor.status,
            last_check: monitor.last_check,
            uptime_24h: uptime_percentage(&checks),
            recent_checks: checks.into_iter().take(STATUS_PAGE_RECENT_CHECKS).collect(),
        });
    }

    Ok(Some(StatusPageView {
        slug: page.slug,
        title: page.title,
        description: page.description,
        branding: page.branding,
        monitors: entries,
    }))
}
