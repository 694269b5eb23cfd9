//! Check cycle orchestration.
//!
//! One call to [`CheckEngine::run_cycle`] walks every active monitor in
//! storage order, probes the ones that are due and alerts on `up -> down`
//! transitions. There is no internal timer and no mutual exclusion between
//! overlapping cycles; callers decide cadence and guard against overlap.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    contacts::resolve_contacts,
    error::Result,
    models::{Monitor, MonitorCheck, MonitorStatus, StatusTransition},
    notify::{AlertEvent, Dispatcher},
    probe::Prober,
    store::MonitorStore,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Active monitors looked at, due or not.
    pub considered: usize,
    pub checked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorOutcome {
    NotDue,
    Checked { alerted: bool },
}

pub struct CheckEngine {
    store: Arc<dyn MonitorStore>,
    prober: Arc<dyn Prober>,
    dispatcher: Dispatcher,
    notify_recovery: bool,
}

impl CheckEngine {
    pub fn new(store: Arc<dyn MonitorStore>, prober: Arc<dyn Prober>, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            prober,
            dispatcher,
            notify_recovery: false,
        }
    }

    /// Also alert on `down -> up`. Off unless explicitly enabled.
    pub fn with_recovery_notifications(mut self, enabled: bool) -> Self {
        self.notify_recovery = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn MonitorStore> {
        &self.store
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Fails only when the monitor list itself cannot be loaded; per-monitor
    /// failures are logged and counted.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let monitors = self.store.find_monitors_by_status(&MonitorStatus::ACTIVE).await?;
        info!("Checking {} active monitors", monitors.len());

        let mut report = CycleReport {
            considered: monitors.len(),
            ..Default::default()
        };

        for monitor in &monitors {
            match self.process_monitor(monitor, now).await {
                Ok(MonitorOutcome::NotDue) => report.skipped += 1,
                Ok(MonitorOutcome::Checked { alerted }) => {
                    report.checked += 1;
                    if alerted {
                        report.alerts += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        monitor_id = %monitor.id,
                        monitor = %monitor.name,
                        "Monitor check failed: {}",
                        e
                    );
                }
            }
        }

        info!(
            considered = report.considered,
            checked = report.checked,
            skipped = report.skipped,
            failed = report.failed,
            alerts = report.alerts,
            "Monitor check cycle completed"
        );
        Ok(report)
    }

    async fn process_monitor(&self, monitor: &Monitor, now: DateTime<Utc>) -> Result<MonitorOutcome> {
        // Paused monitors are filtered by the query; this keeps the invariant
        // even if a store returns one anyway.
        if monitor.status == MonitorStatus::Paused || !monitor.is_due(now) {
            debug!(monitor = %monitor.name, "Monitor not due");
            return Ok(MonitorOutcome::NotDue);
        }

        info!(monitor = %monitor.name, url = %monitor.url, "Checking monitor");
        let timeout = Duration::from_secs(u64::try_from(monitor.timeout).unwrap_or(0));
        let outcome = self.prober.probe(&monitor.url, timeout).await;

        let check = MonitorCheck::from_outcome(monitor.id, &outcome);
        self.store.create_check(&check).await?;

        let previous_status = monitor.status;
        let new_status = if outcome.success {
            MonitorStatus::Up
        } else {
            MonitorStatus::Down
        };
        self.store.update_monitor_status(monitor.id, new_status, now).await?;

        if outcome.success {
            info!(monitor = %monitor.name, response_time_ms = outcome.response_time_ms, "Monitor {}", new_status);
        } else {
            warn!(
                monitor = %monitor.name,
                response_time_ms = outcome.response_time_ms,
                status_code = ?outcome.status_code,
                error = ?outcome.error_message,
                "Monitor {}",
                new_status
            );
        }

        if previous_status != new_status {
            let transition = StatusTransition {
                id: Uuid::new_v4(),
                monitor_id: monitor.id,
                from_status: previous_status,
                to_status: new_status,
                check_id: check.id,
                error: check.error.clone(),
                occurred_at: now,
            };
            if let Err(e) = self.store.record_transition(&transition).await {
                warn!(monitor = %monitor.name, "Failed to record status transition: {}", e);
            }
        }

        let event = match (previous_status, new_status) {
            (MonitorStatus::Up, MonitorStatus::Down) => Some(AlertEvent::down(
                &monitor.name,
                &monitor.url,
                check.error.clone(),
                check.status_code,
                now,
            )),
            (MonitorStatus::Down, MonitorStatus::Up) if self.notify_recovery => {
                Some(AlertEvent::recovered(&monitor.name, &monitor.url, now))
            }
            _ => None,
        };

        let Some(event) = event else {
            return Ok(MonitorOutcome::Checked { alerted: false });
        };

        info!(monitor = %monitor.name, kind = ?event.kind, "Sending alerts");
        let contacts = resolve_contacts(self.store.as_ref(), monitor).await;
        self.dispatcher.dispatch(&contacts, &event).await;

        Ok(MonitorOutcome::Checked { alerted: true })
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_tests;
