//! adsb-relay filters the output of a dump1090 ADS-B decoder and fans it
//! out to downstream TCP consumers.
//!
//! The relay reads either the decoder's SBS-1 TCP stream or its polled
//! `aircraft.json` document, drops records that fail the configured
//! altitude and ICAO allow-list filter, and writes each accepted record to
//! every connected endpoint. The INI config file is re-read every 30
//! seconds; endpoints that survive a reload keep their connection.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- INI parsing, snapshot store, and hot-reloading via the
//!   [`ConfigSource`](config::ConfigSource) trait.
//! - [`convert`] -- JSON aircraft record to SBS-1 line conversion.
//! - [`error`] -- Error types using `thiserror`.
//! - [`filter`] -- Altitude and identity filtering of both input forms.
//! - [`forward`] -- Per-endpoint connection slots and concurrent fan-out.
//! - [`health`] -- `GET /health` handler for the status endpoint.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`record`] -- Aircraft record types.
//! - [`relay`] -- Shared relay state, counters, and the run-mode supervisor.
//! - [`server`] -- Status router, HTTP client, and graceful shutdown.
//! - [`source`] -- Decoder stream and JSON polling loops.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod convert;
pub mod error;
pub mod filter;
pub mod forward;
pub mod health;
pub mod logging;
pub mod record;
pub mod relay;
pub mod server;
pub mod source;
