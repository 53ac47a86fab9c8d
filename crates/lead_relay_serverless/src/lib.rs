//! Runtime adapters and handlers for the lead notification relay.
//!
//! This crate owns deployment integration details (the API Gateway Lambda
//! event shape, the axum edge host and the lettre SMTP transport) and wires
//! them to `lead_relay_core::relay::notify`. Both binaries in `src/bin` are
//! thin shells over the handlers here.

pub mod adapters;
pub mod handlers;
pub mod telemetry;
