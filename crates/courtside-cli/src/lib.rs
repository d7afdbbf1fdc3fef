//! courtside command-line client
//!
//! This crate provides the `courtside` binary: it reads `config.toml`,
//! resolves site credentials and drives the reservation engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
