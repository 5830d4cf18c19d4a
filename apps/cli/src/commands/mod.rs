//! Command implementations for the postline CLI.

pub mod config;
pub mod models;
pub mod run;
pub mod types;
