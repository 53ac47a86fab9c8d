//! Lead notification relay primitives.
//!
//! This crate owns the relay's request/response contract, SMTP settings
//! resolution, message rendering and the `notify` pipeline. It intentionally
//! excludes Lambda, HTTP server and SMTP client concerns; those live in
//! `lead_relay_serverless`.

pub mod contract;
pub mod error;
pub mod relay;
pub mod render;
pub mod settings;
