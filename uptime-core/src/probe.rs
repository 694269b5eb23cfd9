use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, redirect::Policy};
use serde::{Deserialize, Serialize};
use std::{
    error::Error as StdError,
    time::{Duration, Instant},
};

use crate::error::Result;

pub const MAX_REDIRECTS: usize = 5;

/// Classified result of a single probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub success: bool,
    pub response_time_ms: u64,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn from_status(status_code: u16, response_time_ms: u64) -> Self {
        Self {
            success: is_success_status(status_code),
            response_time_ms,
            status_code: Some(status_code),
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn from_error(error: impl Into<String>, status_code: Option<u16>, response_time_ms: u64) -> Self {
        Self {
            success: false,
            response_time_ms,
            status_code,
            error_message: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// 2xx and 3xx count as up.
pub fn is_success_status(status_code: u16) -> bool {
    (200..400).contains(&status_code)
}

/// Performs exactly one attempt per call and never fails; every problem is
/// folded into an unsuccessful [`ProbeOutcome`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let start_time = Instant::now();

        match tokio::time::timeout(timeout, self.client.get(url).send()).await {
            Ok(Ok(response)) => {
                let response_time = start_time.elapsed().as_millis() as u64;
                ProbeOutcome::from_status(response.status().as_u16(), response_time)
            }
            Ok(Err(e)) => {
                let response_time = start_time.elapsed().as_millis() as u64;
                let status_code = e.status().map(|s| s.as_u16());
                ProbeOutcome::from_error(error_chain(&e), status_code, response_time)
            }
            Err(_) => {
                let response_time = start_time.elapsed().as_millis() as u64;
                ProbeOutcome::from_error(
                    format!("timeout of {}ms exceeded", timeout.as_millis()),
                    None,
                    response_time,
                )
            }
        }
    }
}

// reqwest's top-level message hides the interesting part (dns, refused, tls).
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
