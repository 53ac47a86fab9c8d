use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use clap::Parser;
use lead_relay_core::contract::{CorsPolicy, RelayRequest, RelayResponse, SUBMISSION_METHOD};
use lead_relay_core::error::RelayError;
use lead_relay_core::relay::{notify, LeadMailer};
use lead_relay_core::settings::{
    SmtpSettings, ADMIN_EMAIL, SMTP_FROM, SMTP_HOST, SMTP_PASS, SMTP_PORT, SMTP_SECURE, SMTP_TO,
    SMTP_USER,
};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "edge_server",
    about = "HTTP host for the lead notification relay"
)]
pub struct EdgeArgs {
    /// Socket address to listen on
    #[arg(long, env = "LEAD_RELAY_LISTEN", default_value = "0.0.0.0:8787")]
    pub listen: SocketAddr,
    #[arg(long, env = SMTP_HOST)]
    pub smtp_host: Option<String>,
    #[arg(long, env = SMTP_PORT)]
    pub smtp_port: Option<String>,
    #[arg(long, env = SMTP_USER)]
    pub smtp_user: Option<String>,
    #[arg(long, env = SMTP_PASS, hide_env_values = true)]
    pub smtp_pass: Option<String>,
    #[arg(long, env = SMTP_FROM)]
    pub smtp_from: Option<String>,
    #[arg(long, env = SMTP_TO)]
    pub smtp_to: Option<String>,
    #[arg(long, env = ADMIN_EMAIL)]
    pub admin_email: Option<String>,
    #[arg(long, env = SMTP_SECURE)]
    pub smtp_secure: Option<String>,
}

impl EdgeArgs {
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings::from_lookup(|key| match key {
            SMTP_HOST => self.smtp_host.clone(),
            SMTP_PORT => self.smtp_port.clone(),
            SMTP_USER => self.smtp_user.clone(),
            SMTP_PASS => self.smtp_pass.clone(),
            SMTP_FROM => self.smtp_from.clone(),
            SMTP_TO => self.smtp_to.clone(),
            ADMIN_EMAIL => self.admin_email.clone(),
            SMTP_SECURE => self.smtp_secure.clone(),
            _ => None,
        })
    }
}

pub struct EdgeState<M> {
    pub settings: Arc<SmtpSettings>,
    pub mailer: Arc<M>,
    pub cors: CorsPolicy,
}

impl<M> Clone for EdgeState<M> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            mailer: Arc::clone(&self.mailer),
            cors: self.cors.clone(),
        }
    }
}

impl<M> EdgeState<M> {
    pub fn new(settings: SmtpSettings, mailer: M) -> Self {
        Self {
            settings: Arc::new(settings),
            mailer: Arc::new(mailer),
            cors: CorsPolicy::edge(),
        }
    }
}

/// Every path and method is routed to the relay.
pub fn router<M>(state: EdgeState<M>) -> Router
where
    M: LeadMailer + Send + Sync + 'static,
{
    Router::new()
        .fallback(relay_handler::<M>)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn relay_handler<M>(State(state): State<EdgeState<M>>, request: Request) -> Response
where
    M: LeadMailer + Send + Sync + 'static,
{
    let method = request.method().as_str().to_string();

    let body = if method == SUBMISSION_METHOD {
        match read_body(request, &state).await {
            Ok(body) => body,
            Err(error) => return into_http_response(error.into_response(&state.cors)),
        }
    } else {
        Vec::new()
    };

    let response = notify(
        RelayRequest::new(method, body),
        &state.settings,
        state.mailer.as_ref(),
        &state.cors,
    )
    .await;
    into_http_response(response)
}

async fn read_body<M>(request: Request, state: &EdgeState<M>) -> Result<Vec<u8>, RelayError>
where
    M: Send + Sync,
{
    Bytes::from_request(request, state)
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|rejection| {
            warn!(
                component = "edge",
                event = "body_read_failed",
                error = %rejection,
                "failed to read request body"
            );
            match rejection {
                BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
                    RelayError::PayloadTooLarge
                }
                _ => RelayError::UnreadableBody,
            }
        })
}

fn into_http_response(response: RelayResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(response.body.into_string()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

pub async fn serve<M>(listen: SocketAddr, state: EdgeState<M>) -> std::io::Result<()>
where
    M: LeadMailer + Send + Sync + 'static,
{
    let listener = TcpListener::bind(listen).await?;
    info!(component = "edge", address = %listener.local_addr()?, "relay listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(component = "edge", "relay shut down");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(error) => {
                warn!("failed to install SIGTERM handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::{Method, Request};
    use lead_relay_core::contract::{Envelope, SendOutcome};
    use lead_relay_core::render::LeadNotification;
    use lead_relay_core::settings::SmtpConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    struct StaticMailer;

    impl LeadMailer for StaticMailer {
        async fn send(
            &self,
            config: &SmtpConfig,
            _notification: &LeadNotification,
        ) -> Result<SendOutcome, String> {
            Ok(SendOutcome {
                message_id: "<edge@relay.test>".to_string(),
                envelope: Envelope {
                    from: Some(config.from.clone()),
                    to: vec![config.to.clone()],
                },
            })
        }
    }

    fn configured_state() -> EdgeState<StaticMailer> {
        let settings = SmtpSettings {
            host: Some("smtp.example.com".to_string()),
            user: Some("mailer@example.com".to_string()),
            pass: Some("hunter2".to_string()),
            admin_email: Some("admin@example.com".to_string()),
            ..SmtpSettings::default()
        };
        EdgeState::new(settings, StaticMailer)
    }

    async fn send(
        state: EdgeState<StaticMailer>,
        method: Method,
        body: impl Into<String>,
    ) -> (StatusCode, Response) {
        let request = Request::builder()
            .method(method)
            .uri("/functions/v1/notify-lead")
            .body(Body::from(body.into()))
            .expect("request should build");
        let response = router(state)
            .oneshot(request)
            .await
            .expect("router is infallible");
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .expect("body should read");
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn posts_lead_and_returns_envelope() {
        let (status, response) = send(
            configured_state(),
            Method::POST,
            r#"{"lead": {"user_name": "Asha"}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "authorization, x-client-info, apikey, content-type"
        );
        assert_eq!(
            json_body(response).await,
            json!({
                "success": true,
                "messageId": "<edge@relay.test>",
                "envelope": {"from": "mailer@example.com", "to": ["admin@example.com"]}
            })
        );
    }

    #[tokio::test]
    async fn preflight_answers_ok_with_cors() {
        let (status, response) = send(configured_state(), Method::OPTIONS, "{broken").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "POST, OPTIONS"
        );
        let bytes = to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .expect("body should read");
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn put_is_method_not_allowed() {
        let (status, response) = send(configured_state(), Method::PUT, "{}").await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(json_body(response).await, json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn oversized_lead_is_rejected_as_too_large() {
        let body = json!({
            "lead": {"user_name": "Asha", "message": "x".repeat(70 * 1024)}
        })
        .to_string();

        let (status, response) = send(configured_state(), Method::POST, body).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(json_body(response).await, json!({"error": "Payload too large"}));
    }

    #[tokio::test]
    async fn unconfigured_relay_reports_missing_env() {
        let state = EdgeState::new(SmtpSettings::default(), StaticMailer);
        let (status, response) = send(state, Method::POST, r#"{"lead": {}}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .starts_with("SMTP env vars missing"));
    }

    #[test]
    fn cli_values_map_onto_settings() {
        let args = EdgeArgs::try_parse_from([
            "edge_server",
            "--smtp-host",
            " ",
            "--smtp-to",
            "admissions@example.com",
            "--smtp-secure",
            "true",
        ])
        .expect("args should parse");
        let settings = args.smtp_settings();

        assert!(settings.host.is_none());
        assert_eq!(settings.to.as_deref(), Some("admissions@example.com"));
        assert_eq!(settings.secure.as_deref(), Some("true"));
    }
}
