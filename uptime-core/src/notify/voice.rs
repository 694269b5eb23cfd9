use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{AlertEvent, ChannelError, VoiceCaller, escape_html};
use crate::config::VoiceConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const CALL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Deserialize)]
struct CallResponse {
    sid: String,
}

/// Places outbound calls through the Twilio REST API with inline TwiML.
pub struct TwilioVoiceCaller {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioVoiceCaller {
    /// Returns `Ok(None)` unless account sid, auth token and caller number are all set.
    pub fn from_config(config: &VoiceConfig) -> Result<Option<Self>, ChannelError> {
        let Some((account_sid, auth_token, from_number)) = config.credentials() else {
            return Ok(None);
        };

        let client = Client::builder().timeout(CALL_TIMEOUT).build()?;
        Ok(Some(Self {
            client,
            api_base: TWILIO_API_BASE.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn twiml(event: &AlertEvent) -> String {
        format!("<Response><Say>{}</Say></Response>", escape_html(&event.voice_message()))
    }
}

#[async_trait]
impl VoiceCaller for TwilioVoiceCaller {
    async fn send_voice_call(&self, to: &str, event: &AlertEvent) -> Result<(), ChannelError> {
        let url = format!("{}/Accounts/{}/Calls.json", self.api_base, self.account_sid);
        let twiml = Self::twiml(event);
        let form = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Twiml", twiml.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ChannelError::SendFailed(format!(
                "Call API returned non-success status: {}. Body: {}",
                status, error_body
            )));
        }

        let call: CallResponse = response.json().await?;
        debug!(to = %to, sid = %call.sid, "Voice call initiated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Form, Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use chrono::Utc;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Captured {
        account: String,
        authorized: bool,
        form: HashMap<String, String>,
    }

    type Calls = Arc<Mutex<Vec<Captured>>>;

    async fn spawn_api(status: StatusCode) -> (String, Calls) {
        let calls: Calls = Arc::default();
        let app = Router::new()
            .route(
                "/Accounts/{sid}/Calls.json",
                post(
                    move |State(calls): State<Calls>,
                          Path(sid): Path<String>,
                          headers: HeaderMap,
                          Form(form): Form<HashMap<String, String>>| async move {
                        calls.lock().unwrap().push(Captured {
                            account: sid,
                            authorized: headers.get("authorization").is_some(),
                            form,
                        });
                        (status, Json(serde_json::json!({ "sid": "CA123" })))
                    },
                ),
            )
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), calls)
    }

    fn config() -> VoiceConfig {
        VoiceConfig {
            account_sid: Some("AC42".to_string()),
            auth_token: Some("token".to_string()),
            from_number: Some("+15550001111".to_string()),
        }
    }

    #[test]
    fn incomplete_credentials_disable_channel() {
        let mut voice = config();
        voice.auth_token = None;
        assert!(TwilioVoiceCaller::from_config(&voice).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_call_carries_spoken_alert() {
        let (base, calls) = spawn_api(StatusCode::CREATED).await;
        let caller = TwilioVoiceCaller::from_config(&config())
            .unwrap()
            .unwrap()
            .with_api_base(base);
        let event = AlertEvent::down("Checkout", "https://shop.example.com", None, Some(502), Utc::now());

        caller.send_voice_call("+15559998888", &event).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].account, "AC42");
        assert!(calls[0].authorized);
        assert_eq!(calls[0].form["To"], "+15559998888");
        assert_eq!(calls[0].form["From"], "+15550001111");
        assert!(calls[0].form["Twiml"].contains("Your monitor Checkout is currently down"));
    }

    #[tokio::test]
    async fn test_rejected_call_is_an_error() {
        let (base, _) = spawn_api(StatusCode::UNAUTHORIZED).await;
        let caller = TwilioVoiceCaller::from_config(&config())
            .unwrap()
            .unwrap()
            .with_api_base(base);
        let event = AlertEvent::down("Checkout", "https://shop.example.com", None, None, Utc::now());

        assert!(caller.send_voice_call("+15559998888", &event).await.is_err());
    }
}
