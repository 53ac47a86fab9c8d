use std::future::Future;

use serde_json::Value;
use tracing::{error, info};

use crate::contract::{
    CorsPolicy, LeadPayload, RelayRequest, RelayResponse, SendOutcome, PREFLIGHT_METHOD,
    SUBMISSION_METHOD,
};
use crate::error::RelayError;
use crate::render::{display_or, lead_id_display, LeadNotification, DEFAULT_SOURCE};
use crate::settings::{SmtpConfig, SmtpSettings};

/// Delivers a rendered notification. Implementations must not share a transport between calls.
pub trait LeadMailer {
    fn send(
        &self,
        config: &SmtpConfig,
        notification: &LeadNotification,
    ) -> impl Future<Output = Result<SendOutcome, String>> + Send;
}

/// Runs one request through gating, parsing, configuration, rendering and dispatch.
///
/// Every failure becomes a JSON response; nothing escapes as an error or panic.
pub async fn notify(
    request: RelayRequest,
    settings: &SmtpSettings,
    mailer: &impl LeadMailer,
    cors: &CorsPolicy,
) -> RelayResponse {
    if request.method == PREFLIGHT_METHOD {
        return RelayResponse::text(200, "ok", cors);
    }

    match process(&request, settings, mailer).await {
        Ok(outcome) => RelayResponse::json(200, outcome.to_response_body(), cors),
        Err(error) => error.into_response(cors),
    }
}

async fn process(
    request: &RelayRequest,
    settings: &SmtpSettings,
    mailer: &impl LeadMailer,
) -> Result<SendOutcome, RelayError> {
    if request.method != SUBMISSION_METHOD {
        return Err(RelayError::MethodNotAllowed);
    }

    let lead = parse_lead(&request.body)?;

    let config = settings.resolve().map_err(|config_error| {
        error!(
            component = "relay",
            event = "config_missing",
            missing = ?config_error.missing(),
            "SMTP configuration incomplete"
        );
        RelayError::from(config_error)
    })?;

    let notification = LeadNotification::render(&lead, request.received_at)?;
    let lead_id = lead_id_display(lead.id.as_ref());
    let page_from = display_or(lead.page_from.as_deref(), DEFAULT_SOURCE);

    match mailer.send(&config, &notification).await {
        Ok(outcome) => {
            info!(
                component = "relay",
                event = "lead_notified",
                lead_id = %lead_id,
                page_from = %page_from,
                message_id = %outcome.message_id,
                "lead notification sent"
            );
            Ok(outcome)
        }
        Err(send_error) => {
            error!(
                component = "relay",
                event = "delivery_failed",
                lead_id = %lead_id,
                page_from = %page_from,
                smtp_host = %config.host,
                smtp_port = config.port,
                error = %send_error,
                "lead notification failed"
            );
            Err(RelayError::Delivery(send_error))
        }
    }
}

pub fn parse_lead(body: &[u8]) -> Result<LeadPayload, RelayError> {
    let document: Value = serde_json::from_slice(body).map_err(|_| RelayError::InvalidJson)?;

    match document {
        Value::Object(mut fields) => match fields.remove("lead") {
            // Every lead field is optional and lenient, so any object deserializes.
            Some(lead @ Value::Object(_)) => {
                serde_json::from_value(lead).map_err(|_| RelayError::MissingLead)
            }
            _ => Err(RelayError::MissingLead),
        },
        _ => Err(RelayError::MissingLead),
    }
}
