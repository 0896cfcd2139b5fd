//! # amtron-exporter - Prometheus exporter for Mennekes Amtron EV chargers
//!
//! Polls the charger's embedded web dashboard over plain HTTP, logs in with
//! the device's challenge handshake, decodes the display strings of the
//! dashboard into numbers and republishes them as Prometheus gauges.
//!
//! ## Architecture
//!
//! - `config`: layered configuration (defaults, YAML file, environment)
//! - `logging`: structured logging and tracing
//! - `transport`: HTTP access to the charger
//! - `session`: login handshake and session token ownership
//! - `dashboard`: locating values inside the dashboard document
//! - `parsers`: decoding display strings, sentinels on failure
//! - `poller`: the poll cycle and run loop
//! - `metrics`: Prometheus gauge registry
//! - `web`: `/metrics` endpoint and status API

pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parsers;
pub mod poller;
pub mod session;
pub mod transport;
pub mod web;

#[cfg(test)]
mod web_tests;

// Re-export commonly used types
pub use config::Config;
pub use error::{AmtronError, Result};
pub use poller::Poller;
