//! HTTP surface and process setup for the tally scan service.
//!
//! The scanning itself lives in the `tally-*` crates; this crate only wires
//! them to the outside world.

pub mod error;
pub mod http;
pub mod logging;
