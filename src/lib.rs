pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod models;
pub mod report;
pub mod strategies;
pub mod telemetry;

#[cfg(test)]
pub mod test_helpers;
