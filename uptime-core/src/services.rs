use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    cache::{RedisCycleLock, create_redis_pool},
    config::Config,
    db::{DatabasePool, create_pool, run_migrations},
    engine::CheckEngine,
    error::{Error, Result},
    notify::{Dispatcher, HttpWebhookSender, SmtpEmailSender, TwilioVoiceCaller},
    probe::HttpProber,
    retention::RetentionPolicy,
    store::{MonitorStore, PgStore},
    trigger::{CycleLock, CycleRunner, LocalCycleLock},
};

/// Everything a process needs, built once at start-up and torn down with
/// [`Services::shutdown`].
pub struct Services {
    pub config: Config,
    pub db: DatabasePool,
    pub store: Arc<dyn MonitorStore>,
    pub runner: Arc<CycleRunner>,
}

impl Services {
    pub async fn init(config: Config) -> Result<Self> {
        let db = create_pool(&config.database).await?;
        info!("Database connection established");

        run_migrations(&db).await?;
        info!("Database migrations completed");

        let store: Arc<dyn MonitorStore> = Arc::new(PgStore::new(db.clone()));
        let dispatcher = build_dispatcher(&config)?;
        let engine = CheckEngine::new(store.clone(), Arc::new(HttpProber::new()?), dispatcher)
            .with_recovery_notifications(config.alerts.notify_recovery);

        let lock: Arc<dyn CycleLock> = if config.redis.url.is_empty() {
            info!("Redis not configured, using in-process cycle lock");
            Arc::new(LocalCycleLock::new())
        } else {
            let redis = create_redis_pool(&config.redis).await?;
            info!("Redis cycle lock configured");
            Arc::new(RedisCycleLock::new(redis, config.redis.lock_ttl_secs))
        };

        let retention = RetentionPolicy::from_config(&config.retention);
        info!("Check history retention: {:?}", retention);

        let runner = Arc::new(CycleRunner::new(Arc::new(engine), lock, retention));

        Ok(Self {
            config,
            db,
            store,
            runner,
        })
    }

    pub async fn shutdown(self) {
        info!("Closing database pool");
        self.db.close().await;
    }
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new()
        .with_webhook(Arc::new(HttpWebhookSender::new().map_err(|e| Error::internal(e.to_string()))?));

    match SmtpEmailSender::from_config(&config.email) {
        Ok(Some(sender)) => {
            info!(host = %config.email.host, port = config.email.port, "Email alerts enabled");
            dispatcher = dispatcher.with_email(Arc::new(sender));
        }
        Ok(None) => warn!("EMAIL_USER/EMAIL_PASSWORD not set, email alerts disabled"),
        Err(e) => warn!("Email channel misconfigured, email alerts disabled: {}", e),
    }

    match TwilioVoiceCaller::from_config(&config.voice) {
        Ok(Some(caller)) => {
            info!("Voice call alerts enabled");
            dispatcher = dispatcher.with_voice(Arc::new(caller));
        }
        Ok(None) => warn!("Twilio credentials not configured, phone alerts disabled"),
        Err(e) => warn!("Voice channel misconfigured, phone alerts disabled: {}", e),
    }

    Ok(dispatcher)
}
