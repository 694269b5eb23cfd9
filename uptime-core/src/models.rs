use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    probe::ProbeOutcome,
};

pub const MIN_INTERVAL_SECS: i32 = 30;
pub const MIN_TIMEOUT_SECS: i32 = 5;
pub const MAX_TIMEOUT_SECS: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Paused,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Paused => "paused",
        }
    }

    /// Statuses the check cycle picks up.
    pub const ACTIVE: [MonitorStatus; 2] = [MonitorStatus::Up, MonitorStatus::Down];
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            "paused" => Ok(MonitorStatus::Paused),
            other => Err(Error::validation(format!("unknown monitor status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    Http,
    Https,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Http => "http",
            MonitorKind::Https => "https",
        }
    }
}

impl FromStr for MonitorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(MonitorKind::Http),
            "https" => Ok(MonitorKind::Https),
            other => Err(Error::validation(format!("unsupported monitor type: {}", other))),
        }
    }
}

/// Recipients configured directly on a monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTargets {
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub phone: Vec<String>,
    #[serde(default)]
    pub webhook: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MonitorKind,
    /// Seconds between checks.
    pub interval: i32,
    /// Probe timeout in seconds.
    pub timeout: i32,
    pub status: MonitorStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub alerts: AlertTargets,
    pub contact_lists: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    /// Builds a validated monitor. New monitors start paused and unchecked.
    pub fn new(name: impl Into<String>, url: impl Into<String>, interval: i32, timeout: i32) -> Result<Self> {
        let name = name.into();
        let url = url.into();

        if name.trim().is_empty() {
            return Err(Error::validation("name is required"));
        }
        let parsed = url::Url::parse(&url)
            .map_err(|e| Error::validation(format!("invalid url {}: {}", url, e)))?;
        let kind = parsed.scheme().parse::<MonitorKind>()?;
        if interval < MIN_INTERVAL_SECS {
            return Err(Error::validation(format!(
                "interval must be at least {} seconds",
                MIN_INTERVAL_SECS
            )));
        }
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&timeout) {
            return Err(Error::validation(format!(
                "timeout must be between {} and {} seconds",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            url,
            kind,
            interval,
            timeout,
            status: MonitorStatus::Paused,
            last_check: None,
            alerts: AlertTargets::default(),
            contact_lists: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_alerts(mut self, alerts: AlertTargets) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_contact_lists(mut self, contact_lists: Vec<Uuid>) -> Self {
        self.contact_lists = contact_lists;
        self
    }

    /// A monitor that was never checked is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let last_check = self.last_check.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let elapsed_ms = (now - last_check).num_milliseconds();
        elapsed_ms >= i64::from(self.interval) * 1000
    }
}

/// One executed probe. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCheck {
    pub id: Uuid,
    pub monitor_id: Uuid,
    pub success: bool,
    /// Milliseconds.
    pub response_time: i32,
    pub status_code: Option<i32>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MonitorCheck {
    pub fn from_outcome(monitor_id: Uuid, outcome: &ProbeOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitor_id,
            success: outcome.success,
            response_time: i32::try_from(outcome.response_time_ms).unwrap_or(i32::MAX),
            status_code: outcome.status_code.map(i32::from),
            error: outcome.error_message.clone(),
            timestamp: outcome.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactList {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub webhooks: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactList {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            emails: Vec::new(),
            phones: Vec::new(),
            webhooks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub logo: Option<String>,
    pub primary_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPage {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    /// Display order.
    pub monitors: Vec<Uuid>,
    pub branding: Branding,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A change of cached monitor status caused by a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub id: Uuid,
    pub monitor_id: Uuid,
    pub from_status: MonitorStatus,
    pub to_status: MonitorStatus,
    pub check_id: Uuid,
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_monitor_starts_paused() {
        let monitor = Monitor::new("Homepage", "https://example.com", 60, 30).unwrap();
        assert_eq!(monitor.status, MonitorStatus::Paused);
        assert_eq!(monitor.kind, MonitorKind::Https);
        assert!(monitor.last_check.is_none());
    }

    #[test]
    fn new_monitor_rejects_out_of_range_settings() {
        assert!(Monitor::new("a", "https://example.com", 29, 30).is_err());
        assert!(Monitor::new("a", "https://example.com", 60, 4).is_err());
        assert!(Monitor::new("a", "https://example.com", 60, 61).is_err());
        assert!(Monitor::new("", "https://example.com", 60, 30).is_err());
        assert!(Monitor::new("a", "ftp://example.com", 60, 30).is_err());
        assert!(Monitor::new("a", "not a url", 60, 30).is_err());
    }

    #[test]
    fn never_checked_monitor_is_due() {
        let monitor = Monitor::new("a", "http://example.com", 60, 30).unwrap();
        assert!(monitor.is_due(Utc::now()));
    }

    #[test]
    fn due_only_after_full_interval() {
        let now = Utc::now();
        let mut monitor = Monitor::new("a", "http://example.com", 60, 30).unwrap();

        monitor.last_check = Some(now - Duration::seconds(10));
        assert!(!monitor.is_due(now));

        monitor.last_check = Some(now - Duration::milliseconds(59_999));
        assert!(!monitor.is_due(now));

        monitor.last_check = Some(now - Duration::seconds(60));
        assert!(monitor.is_due(now));

        monitor.last_check = Some(now - Duration::seconds(90));
        assert!(monitor.is_due(now));
    }

    #[test]
    fn status_parses_from_storage_text() {
        assert_eq!("up".parse::<MonitorStatus>().unwrap(), MonitorStatus::Up);
        assert_eq!("paused".parse::<MonitorStatus>().unwrap(), MonitorStatus::Paused);
        assert!("UP".parse::<MonitorStatus>().is_err());
    }

    #[test]
    fn monitor_serializes_type_field() {
        let monitor = Monitor::new("a", "http://example.com", 60, 30).unwrap();
        let value = serde_json::to_value(&monitor).unwrap();
        assert_eq!(value["type"], "http");
        assert_eq!(value["status"], "paused");
        assert!(value["lastCheck"].is_null());
    }
}
