//! Decoder input.
//!
//! [`stream`] follows the SBS-1 TCP output and [`poll`] fetches the JSON
//! aircraft document. Each runs as the relay's single main loop and
//! returns only when shutdown is requested.

pub mod poll;
pub mod stream;
