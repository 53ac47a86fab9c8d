use serde_json::json;
use thiserror::Error;

use crate::contract::{CorsPolicy, RelayResponse};

pub const MISSING_CONFIG_MESSAGE: &str =
    "SMTP env vars missing. Required: SMTP_HOST, SMTP_PORT, SMTP_USER, SMTP_PASS, SMTP_FROM, SMTP_TO";

/// SMTP settings could not be resolved. The message is fixed; `missing` is for operator logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", MISSING_CONFIG_MESSAGE)]
pub struct ConfigError {
    missing: Vec<&'static str>,
}

impl ConfigError {
    pub fn new(missing: Vec<&'static str>) -> Self {
        Self { missing }
    }

    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing lead object")]
    MissingLead,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Unable to read request body")]
    UnreadableBody,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to render notification: {0}")]
    Render(String),

    #[error("{0}")]
    Delivery(String),
}

impl RelayError {
    pub fn status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed => 405,
            Self::InvalidJson | Self::MissingLead | Self::UnreadableBody => 400,
            Self::PayloadTooLarge => 413,
            Self::Config(_) | Self::Render(_) | Self::Delivery(_) => 500,
        }
    }

    pub fn into_response(self, cors: &CorsPolicy) -> RelayResponse {
        let body = match &self {
            Self::Render(_) | Self::Delivery(_) => json!({
                "success": false,
                "error": self.to_string(),
            }),
            _ => json!({ "error": self.to_string() }),
        };
        RelayResponse::json(self.status(), body, cors)
    }
}
