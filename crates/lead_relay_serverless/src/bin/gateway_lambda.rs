use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use lead_relay_core::settings::SmtpSettings;
use lead_relay_serverless::adapters::smtp::LettreMailer;
use lead_relay_serverless::handlers::gateway::{handle_gateway_event, ApiGatewayResponse};
use lead_relay_serverless::telemetry::{init_tracing, LogTarget};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let received_at = Utc::now();
    let settings = SmtpSettings::from_env();

    Ok(handle_gateway_event(event.payload, &settings, &LettreMailer::default(), received_at).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(LogTarget::Lambda);
    lambda_runtime::run(service_fn(handle_request)).await
}
