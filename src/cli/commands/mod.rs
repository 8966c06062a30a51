//! CLI command implementations
//!
//! Each command works on a shared [`CliContext`](crate::cli::context::CliContext).

pub mod chat;
pub mod config;
pub mod models;
pub mod run;
