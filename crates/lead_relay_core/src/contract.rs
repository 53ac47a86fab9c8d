use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

pub const SUBMISSION_METHOD: &str = "POST";
pub const PREFLIGHT_METHOD: &str = "OPTIONS";
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const GATEWAY_ALLOWED_HEADERS: &str = "Content-Type";
pub const EDGE_ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// A lead record as submitted by the website. Nothing here is trusted or required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeadPayload {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub course_of_interest: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub preferred_colleges: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub page_from: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
}

/// Numbers and booleans are kept as their JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub method: String,
    pub body: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl RelayRequest {
    pub fn new(method: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            body: body.into(),
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
}

impl ResponseBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "text/plain; charset=utf-8",
            Self::Json(_) => "application/json",
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl RelayResponse {
    pub fn json(status: u16, body: Value, cors: &CorsPolicy) -> Self {
        Self::with_body(status, ResponseBody::Json(body), cors)
    }

    pub fn text(status: u16, body: impl Into<String>, cors: &CorsPolicy) -> Self {
        Self::with_body(status, ResponseBody::Text(body.into()), cors)
    }

    fn with_body(status: u16, body: ResponseBody, cors: &CorsPolicy) -> Self {
        let mut headers = cors.headers();
        headers.push(("Content-Type".to_string(), body.content_type().to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }
}

/// Cross-origin headers attached to every relay response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allow_headers: String,
}

impl CorsPolicy {
    pub fn new(allow_headers: impl Into<String>) -> Self {
        Self {
            allow_headers: allow_headers.into(),
        }
    }

    pub fn gateway() -> Self {
        Self::new(GATEWAY_ALLOWED_HEADERS)
    }

    pub fn edge() -> Self {
        Self::new(EDGE_ALLOWED_HEADERS)
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
            (
                "Access-Control-Allow-Headers".to_string(),
                self.allow_headers.clone(),
            ),
            (
                "Access-Control-Allow-Methods".to_string(),
                ALLOWED_METHODS.to_string(),
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub from: Option<String>,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendOutcome {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub envelope: Envelope,
}

impl SendOutcome {
    pub fn to_response_body(&self) -> Value {
        json!({
            "success": true,
            "messageId": self.message_id,
            "envelope": self.envelope,
        })
    }
}
