pub mod config;
pub mod enrichment;
pub mod error;
pub mod notion;
pub mod telemetry;
pub mod workflows;
