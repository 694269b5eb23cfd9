use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::{AlertEvent, ChannelError, EmailSender};
use crate::config::EmailConfig;

/// Port 465 speaks TLS from the first byte; every other port upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Returns `Ok(None)` when no SMTP credentials are configured.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, ChannelError> {
        let Some((username, password)) = config.credentials() else {
            return Ok(None);
        };

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Some(Self {
            transport,
            from: config.from.parse()?,
        }))
    }

    pub(crate) fn build_message(&self, to: &str, event: &AlertEvent) -> Result<Message, ChannelError> {
        Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(event.email_subject())
            .header(ContentType::TEXT_HTML)
            .body(event.email_html())
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, to: &str, event: &AlertEvent) -> Result<(), ChannelError> {
        let message = self.build_message(to, event)?;
        self.transport.send(message).await?;
        Ok(())
    }
}
