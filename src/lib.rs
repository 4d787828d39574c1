//! flowdoc: entry-point discovery and cross-service call-chain tracing for
//! Java codebases.
//!
//! The library surface lives in [`core`]; `config` and `error` carry the
//! settings file and the crate error type.

pub mod config;
pub mod core;
pub mod error;
