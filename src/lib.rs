//! HEARTH — Resilient real-estate data client with a local mortgage engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod transport;
pub mod pipeline;
pub mod mortgage;
pub mod tools;
pub mod render;
