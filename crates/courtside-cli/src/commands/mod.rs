//! Command implementations.

pub mod availability;
pub mod book;
pub mod cancel;
pub mod config;

use serde::Serialize;

use crate::error::ClientResult;

/// Prints `value` to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
