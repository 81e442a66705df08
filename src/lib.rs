// Library root — exposes internals for integration tests and embedders.
// The binary entry point is src/main.rs.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod labels;
pub mod logger;
pub mod service;
