pub mod config;
pub mod error;
pub mod orders;
pub mod session;
pub mod telemetry;
