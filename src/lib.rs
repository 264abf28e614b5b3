pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

// Layered boundaries: ports the pipeline consumes, adapters that implement them
pub mod app;
pub mod infra;
