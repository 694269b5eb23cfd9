use std::sync::Arc;
use tracing::{error, info, warn};

use super::{AlertEvent, EmailSender, VoiceCaller, WebhookSender};
use crate::contacts::ResolvedContacts;

/// Per-recipient tally of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
    /// Recipients on a channel with no configured sender.
    pub skipped: usize,
}

/// Fans an alert out to every resolved recipient on every configured
/// channel. One recipient failing never stops the others.
#[derive(Clone, Default)]
pub struct Dispatcher {
    email: Option<Arc<dyn EmailSender>>,
    webhook: Option<Arc<dyn WebhookSender>>,
    voice: Option<Arc<dyn VoiceCaller>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email = Some(sender);
        self
    }

    pub fn with_webhook(mut self, sender: Arc<dyn WebhookSender>) -> Self {
        self.webhook = Some(sender);
        self
    }

    pub fn with_voice(mut self, caller: Arc<dyn VoiceCaller>) -> Self {
        self.voice = Some(caller);
        self
    }

    pub async fn dispatch(&self, contacts: &ResolvedContacts, event: &AlertEvent) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        if !contacts.emails.is_empty() {
            match &self.email {
                Some(sender) => {
                    for to in &contacts.emails {
                        match sender.send_email(to, event).await {
                            Ok(()) => {
                                summary.delivered += 1;
                                info!(monitor = %event.monitor_name, to = %to, "Alert email sent");
                            }
                            Err(e) => {
                                summary.failed += 1;
                                error!(monitor = %event.monitor_name, to = %to, "Failed to send email: {}", e);
                            }
                        }
                    }
                }
                None => {
                    summary.skipped += contacts.emails.len();
                    warn!(
                        monitor = %event.monitor_name,
                        recipients = contacts.emails.len(),
                        "Email credentials not configured, skipping email alerts"
                    );
                }
            }
        }

        if !contacts.webhooks.is_empty() {
            match &self.webhook {
                Some(sender) => {
                    for url in &contacts.webhooks {
                        match sender.send_webhook(url, event).await {
                            Ok(()) => {
                                summary.delivered += 1;
                                info!(monitor = %event.monitor_name, webhook = %url, "Webhook alert sent");
                            }
                            Err(e) => {
                                summary.failed += 1;
                                error!(monitor = %event.monitor_name, webhook = %url, "Failed to send webhook: {}", e);
                            }
                        }
                    }
                }
                None => {
                    summary.skipped += contacts.webhooks.len();
                    warn!(
                        monitor = %event.monitor_name,
                        recipients = contacts.webhooks.len(),
                        "Webhook channel not configured, skipping webhook alerts"
                    );
                }
            }
        }

        if !contacts.phones.is_empty() {
            match &self.voice {
                Some(caller) => {
                    for to in &contacts.phones {
                        match caller.send_voice_call(to, event).await {
                            Ok(()) => {
                                summary.delivered += 1;
                                info!(monitor = %event.monitor_name, to = %to, "Voice call alert placed");
                            }
                            Err(e) => {
                                summary.failed += 1;
                                error!(monitor = %event.monitor_name, to = %to, "Failed to place voice call: {}", e);
                            }
                        }
                    }
                }
                None => {
                    summary.skipped += contacts.phones.len();
                    warn!(
                        monitor = %event.monitor_name,
                        recipients = contacts.phones.len(),
                        "Voice call credentials not configured, skipping phone alerts"
                    );
                }
            }
        }

        info!(
            monitor = %event.monitor_name,
            kind = ?event.kind,
            delivered = summary.delivered,
            failed = summary.failed,
            skipped = summary.skipped,
            "Alert dispatch finished"
        );
        summary
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::Mutex;

    use super::super::{AlertEvent, ChannelError, EmailSender, VoiceCaller, WebhookSender};

    /// Records every delivery attempt; recipients listed in `failing` error out.
    #[derive(Default)]
    pub struct RecordingChannel {
        pub attempts: Mutex<Vec<(String, String, AlertEvent)>>,
        pub failing: Vec<String>,
    }

    impl RecordingChannel {
        pub fn failing(recipients: &[&str]) -> Self {
            Self {
                attempts: Mutex::default(),
                failing: recipients.iter().map(|r| r.to_string()).collect(),
            }
        }

        pub fn recipients(&self, channel: &str) -> Vec<String> {
            self.attempts
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _, _)| c == channel)
                .map(|(_, to, _)| to.clone())
                .collect()
        }

        pub fn count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }

        pub fn events(&self) -> Vec<AlertEvent> {
            self.attempts.lock().unwrap().iter().map(|(_, _, e)| e.clone()).collect()
        }

        fn record(&self, channel: &str, to: &str, event: &AlertEvent) -> Result<(), ChannelError> {
            self.attempts
                .lock()
                .unwrap()
                .push((channel.to_string(), to.to_string(), event.clone()));
            if self.failing.iter().any(|f| f == to) {
                return Err(ChannelError::SendFailed(format!("{} rejected", to)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl EmailSender for RecordingChannel {
        async fn send_email(&self, to: &str, event: &AlertEvent) -> Result<(), ChannelError> {
            self.record("email", to, event)
        }
    }

    #[async_trait]
    impl WebhookSender for RecordingChannel {
        async fn send_webhook(&self, url: &str, event: &AlertEvent) -> Result<(), ChannelError> {
            self.record("webhook", url, event)
        }
    }

    #[async_trait]
    impl VoiceCaller for RecordingChannel {
        async fn send_voice_call(&self, to: &str, event: &AlertEvent) -> Result<(), ChannelError> {
            self.record("voice", to, event)
        }
    }
}
