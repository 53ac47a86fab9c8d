use std::time::Duration;

use lead_relay_core::contract::{Envelope, SendOutcome};
use lead_relay_core::relay::LeadMailer;
use lead_relay_core::render::LeadNotification;
use lead_relay_core::settings::SmtpConfig;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

pub const SMTP_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
pub const SMTP_SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// SMTP delivery through lettre. A fresh transport is built for every send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LettreMailer {
    command_timeout: Duration,
    send_timeout: Duration,
}

impl Default for LettreMailer {
    fn default() -> Self {
        Self::new(SMTP_COMMAND_TIMEOUT, SMTP_SEND_TIMEOUT)
    }
}

impl LettreMailer {
    pub fn new(command_timeout: Duration, send_timeout: Duration) -> Self {
        Self {
            command_timeout,
            send_timeout,
        }
    }
}

impl LeadMailer for LettreMailer {
    async fn send(
        &self,
        config: &SmtpConfig,
        notification: &LeadNotification,
    ) -> Result<SendOutcome, String> {
        let message = build_message(config, notification)?;
        let outcome = SendOutcome {
            message_id: message
                .headers()
                .get_raw("Message-ID")
                .unwrap_or_default()
                .to_string(),
            envelope: Envelope {
                from: message.envelope().from().map(ToString::to_string),
                to: message
                    .envelope()
                    .to()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
        };

        let transport = build_transport(config, self.command_timeout)?;
        match tokio::time::timeout(self.send_timeout, transport.send(message)).await {
            Ok(Ok(response)) => {
                debug!(
                    component = "smtp",
                    code = %response.code(),
                    message_id = %outcome.message_id,
                    "SMTP server accepted message"
                );
                Ok(outcome)
            }
            Ok(Err(error)) => Err(format!("SMTP send failed: {error}")),
            Err(_) => Err(format!(
                "SMTP send timed out after {}s",
                self.send_timeout.as_secs()
            )),
        }
    }
}

pub fn build_message(
    config: &SmtpConfig,
    notification: &LeadNotification,
) -> Result<Message, String> {
    let from: Mailbox = config
        .from
        .parse()
        .map_err(|error| format!("invalid sender address '{}': {error}", config.from))?;
    let to: Mailbox = config
        .to
        .parse()
        .map_err(|error| format!("invalid recipient address '{}': {error}", config.to))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(notification.subject.clone())
        .message_id(None)
        .multipart(MultiPart::alternative_plain_html(
            notification.text.clone(),
            notification.html.clone(),
        ))
        .map_err(|error| format!("failed to build message: {error}"))
}

/// Port 465 style implicit TLS when `secure`, otherwise STARTTLS if the server offers it.
pub fn build_transport(
    config: &SmtpConfig,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
    let builder = if config.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|error| format!("failed to configure SMTP relay: {error}"))?
    } else {
        let tls = TlsParameters::new(config.host.clone())
            .map_err(|error| format!("failed to configure STARTTLS: {error}"))?;
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
            .tls(Tls::Opportunistic(tls))
    };

    Ok(builder
        .port(config.port)
        .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
        .timeout(Some(timeout))
        .build())
}
