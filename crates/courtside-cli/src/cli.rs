//! Command-line interface definition.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use courtside_core::Region;

/// courtside - tennis court availability and booking for the Nowon and
/// Dobong district sites
#[derive(Debug, Parser)]
#[command(name = "courtside")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "COURTSIDE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Abort the whole operation after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The overall deadline, if one was given.
    pub fn deadline(&self) -> Option<Duration> {
        self.timeout.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the availability snapshot for a month
    Availability {
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Month, 1-12 (defaults to the current month)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,

        /// Crawl the sites even if the cached snapshot is fresh
        #[arg(long)]
        refresh: bool,
    },

    /// Book the slots listed in a JSON file
    Book {
        /// JSON array of slots: courtId, date, startTime, endTime
        #[arg(long)]
        slots: PathBuf,

        /// Do not ask the sites to send reservation alerts
        #[arg(long)]
        no_alerts: bool,
    },

    /// Cancel a previous booking
    Cancel {
        /// Region of the booking (A/nowon or B/dobong)
        #[arg(long)]
        region: Region,

        /// Reservation number returned when booking
        #[arg(long)]
        rent_no: String,

        /// Amount paid, in won
        #[arg(long)]
        amount: u64,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration with plain-text passwords masked
    Dump,

    /// Validate configuration and resolve credentials
    Validate,

    /// Show configuration file path
    Path,
}
