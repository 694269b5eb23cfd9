use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uptime_core::{
    Error, Result,
    trigger::{CycleRunner, TriggerOutcome},
};

/// Fires the check cycle on a cron schedule.
pub struct CycleScheduler {
    runner: Arc<CycleRunner>,
    scheduler: JobScheduler,
}

impl CycleScheduler {
    pub async fn new(runner: Arc<CycleRunner>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;

        Ok(Self { runner, scheduler })
    }

    /// `schedule` is a six-field cron expression (seconds first).
    pub async fn start(&mut self, schedule: &str) -> Result<()> {
        info!("Starting check cycle scheduler with schedule '{}'", schedule);

        let runner = self.runner.clone();
        let job = Job::new_async(schedule, move |_uuid, _l| {
            let runner = runner.clone();
            Box::pin(async move {
                run_cycle(&runner).await;
            })
        })
        .map_err(|e| Error::scheduler(e.to_string()))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;

        info!("Check cycle scheduler started successfully");
        Ok(())
    }

    pub async fn run_now(&self) {
        run_cycle(&self.runner).await;
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping check cycle scheduler");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;
        info!("Check cycle scheduler stopped");
        Ok(())
    }
}

async fn run_cycle(runner: &CycleRunner) {
    match runner.trigger().await {
        Ok(TriggerOutcome::Ran(report)) => info!(
            considered = report.considered,
            checked = report.checked,
            failed = report.failed,
            alerts = report.alerts,
            "Scheduled check cycle finished"
        ),
        Ok(TriggerOutcome::Skipped) => info!("Previous check cycle still running, skipping tick"),
        Err(e) => error!("Scheduled check cycle failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use uptime_core::{
        engine::CheckEngine,
        models::{Monitor, MonitorStatus},
        notify::Dispatcher,
        probe::{ProbeOutcome, Prober},
        retention::RetentionPolicy,
        store::MemoryStore,
        trigger::LocalCycleLock,
    };

    struct AlwaysUp;

    #[async_trait]
    impl Prober for AlwaysUp {
        async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
            ProbeOutcome::from_status(200, 3)
        }
    }

    fn runner_with_monitor() -> (Arc<CycleRunner>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::new("api", "https://example.com", 60, 30).unwrap();
        monitor.status = MonitorStatus::Up;
        store.insert_monitor(monitor).unwrap();

        let engine = CheckEngine::new(store.clone(), Arc::new(AlwaysUp), Dispatcher::new());
        let runner = CycleRunner::new(
            Arc::new(engine),
            Arc::new(LocalCycleLock::new()),
            RetentionPolicy::Unbounded,
        );
        (Arc::new(runner), store)
    }

    #[tokio::test]
    async fn test_run_now_executes_a_cycle() {
        let (runner, store) = runner_with_monitor();
        let scheduler = CycleScheduler::new(runner).await.unwrap();

        scheduler.run_now().await;

        assert_eq!(store.checks().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let (runner, _store) = runner_with_monitor();
        let mut scheduler = CycleScheduler::new(runner).await.unwrap();

        let result = scheduler.start("not a cron expression").await;

        assert!(matches!(result, Err(Error::Scheduler(_))));
    }

    #[tokio::test]
    async fn test_scheduled_job_runs_cycle() {
        let (runner, store) = runner_with_monitor();
        let mut scheduler = CycleScheduler::new(runner).await.unwrap();

        scheduler.start("* * * * * *").await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.unwrap();

        // Later ticks find the monitor not yet due.
        assert_eq!(store.checks().unwrap().len(), 1);
    }
}
