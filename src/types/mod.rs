pub mod config;
pub mod measurements;
pub mod mission;
pub mod pyro;
pub mod status;
pub mod telemetry;
