use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Empty disables the shared cycle lock.
    pub url: String,
    pub lock_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CronConfig {
    /// Bearer token the trigger endpoint expects, if any.
    pub secret: Option<String>,
    pub schedule: String,
}

impl std::fmt::Debug for CronConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronConfig")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("schedule", &self.schedule)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl EmailConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl VoiceConfig {
    /// Returns `(account_sid, auth_token, from_number)` when all three are set.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        match (
            self.account_sid.as_deref(),
            self.auth_token.as_deref(),
            self.from_number.as_deref(),
        ) {
            (Some(sid), Some(token), Some(from))
                if !sid.is_empty() && !token.is_empty() && !from.is_empty() =>
            {
                Some((sid, token, from))
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("from_number", &self.from_number)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub notify_recovery: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Zero keeps check history forever.
    pub check_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub cron: CronConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    pub alerts: AlertConfig,
    pub retention: RetentionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let mut cfg = config::Config::builder();

        cfg = cfg
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432)?
            .set_default("database.max_connections", 10)?
            .set_default("redis.lock_ttl_secs", 120)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("cron.schedule", "0 * * * * *")?
            .set_default("email.host", "smtp.gmail.com")?
            .set_default("email.port", 587)?
            .set_default("email.from", "noreply@uptimemonitor.com")?
            .set_default("alerts.notify_recovery", false)?
            .set_default("retention.check_days", 30)?;

        if let Ok(database_url) = env::var("DATABASE_URL") {
            cfg = cfg.set_override("database.url", database_url)?;
        }
        cfg = cfg
            .set_override("database.username", env::var("DATABASE_USERNAME").unwrap_or_else(|_| "uptime".to_string()))?
            .set_override("database.password", env::var("DATABASE_PASSWORD").unwrap_or_else(|_| "password".to_string()))?
            .set_override("database.database", env::var("DATABASE_NAME").unwrap_or_else(|_| "uptime".to_string()))?;
        if let Ok(host) = env::var("DATABASE_HOST") {
            cfg = cfg.set_override("database.host", host)?;
        }

        cfg = cfg.set_override(
            "redis.url",
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        )?;

        if let Ok(port) = env::var("PORT") {
            cfg = cfg.set_override("server.port", parse_var::<u16>("PORT", &port)?)?;
        }
        if let Ok(host) = env::var("HOST") {
            cfg = cfg.set_override("server.host", host)?;
        }

        if let Ok(secret) = env::var("CRON_SECRET") {
            cfg = cfg.set_override("cron.secret", secret)?;
        }
        if let Ok(schedule) = env::var("CRON_SCHEDULE") {
            cfg = cfg.set_override("cron.schedule", schedule)?;
        }

        if let Ok(host) = env::var("EMAIL_HOST") {
            cfg = cfg.set_override("email.host", host)?;
        }
        if let Ok(port) = env::var("EMAIL_PORT") {
            cfg = cfg.set_override("email.port", parse_var::<u16>("EMAIL_PORT", &port)?)?;
        }
        if let Ok(user) = env::var("EMAIL_USER") {
            cfg = cfg.set_override("email.username", user)?;
        }
        if let Ok(password) = env::var("EMAIL_PASSWORD") {
            cfg = cfg.set_override("email.password", password)?;
        }
        if let Ok(from) = env::var("EMAIL_FROM") {
            cfg = cfg.set_override("email.from", from)?;
        }

        if let Ok(sid) = env::var("TWILIO_ACCOUNT_SID") {
            cfg = cfg.set_override("voice.account_sid", sid)?;
        }
        if let Ok(token) = env::var("TWILIO_AUTH_TOKEN") {
            cfg = cfg.set_override("voice.auth_token", token)?;
        }
        if let Ok(number) = env::var("TWILIO_PHONE_NUMBER") {
            cfg = cfg.set_override("voice.from_number", number)?;
        }

        if let Ok(flag) = env::var("NOTIFY_RECOVERY") {
            cfg = cfg.set_override("alerts.notify_recovery", matches!(flag.as_str(), "1" | "true" | "yes"))?;
        }
        if let Ok(days) = env::var("CHECK_RETENTION_DAYS") {
            cfg = cfg.set_override("retention.check_days", parse_var::<u32>("CHECK_RETENTION_DAYS", &days)?)?;
        }

        cfg.build()?.try_deserialize()
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, config::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| config::ConfigError::Message(format!("invalid {} '{}': {}", name, value, e)))
}
