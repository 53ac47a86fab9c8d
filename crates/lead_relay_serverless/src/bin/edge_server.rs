use clap::Parser;
use lead_relay_serverless::adapters::smtp::LettreMailer;
use lead_relay_serverless::handlers::edge::{serve, EdgeArgs, EdgeState};
use lead_relay_serverless::telemetry::{init_tracing, LogTarget};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogTarget::Server);

    let args = EdgeArgs::parse();
    let state = EdgeState::new(args.smtp_settings(), LettreMailer::default());
    serve(args.listen, state).await?;
    Ok(())
}
