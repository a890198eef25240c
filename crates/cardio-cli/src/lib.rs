//! cardio-cli: command handlers behind the `cardio` binary.
pub mod commands;
pub mod config;
pub mod logging;
