use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use lead_relay_core::contract::{CorsPolicy, RelayRequest, RelayResponse, SUBMISSION_METHOD};
use lead_relay_core::relay::{notify, LeadMailer};
use lead_relay_core::settings::SmtpSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl From<RelayResponse> for ApiGatewayResponse {
    fn from(response: RelayResponse) -> Self {
        let headers: Map<String, Value> = response
            .headers
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Self {
            status_code: response.status,
            headers: Value::Object(headers),
            body: response.body.into_string(),
        }
    }
}

pub async fn handle_gateway_event(
    event: Value,
    settings: &SmtpSettings,
    mailer: &impl LeadMailer,
    received_at: DateTime<Utc>,
) -> ApiGatewayResponse {
    let request = normalize_gateway_event(event, received_at);
    notify(request, settings, mailer, &CorsPolicy::gateway())
        .await
        .into()
}

/// Accepts REST (v1) and HTTP (v2) proxy events. An event without a method is a direct
/// invocation and is treated as a POST whose body is the event itself.
pub fn normalize_gateway_event(event: Value, received_at: DateTime<Utc>) -> RelayRequest {
    let method = event_method(&event);
    let body = match (method.is_some(), event.get("body")) {
        (false, None) => event.to_string().into_bytes(),
        (_, None) | (_, Some(Value::Null)) => Vec::new(),
        (_, Some(Value::String(text))) if is_base64_encoded(&event) => {
            STANDARD.decode(text).unwrap_or_else(|error| {
                warn!(
                    component = "gateway",
                    event = "body_decode_failed",
                    error = %error,
                    "request body is not valid base64"
                );
                Vec::new()
            })
        }
        (_, Some(Value::String(text))) => text.clone().into_bytes(),
        (_, Some(other)) => other.to_string().into_bytes(),
    };

    RelayRequest {
        method: method.unwrap_or_else(|| SUBMISSION_METHOD.to_string()),
        body,
        received_at,
    }
}

fn event_method(event: &Value) -> Option<String> {
    event
        .get("httpMethod")
        .or_else(|| event.pointer("/requestContext/http/method"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_base64_encoded(event: &Value) -> bool {
    event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
