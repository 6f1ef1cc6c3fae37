pub mod config;
pub mod error;
pub mod ledger;
pub mod slips;
pub mod telemetry;
