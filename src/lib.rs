pub mod account;
pub mod config;
pub mod delay;
pub mod error;
pub mod orchestrator;
pub mod worker;
