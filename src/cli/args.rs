use crate::config::EngineConfig;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

/// Load, import, reconcile and save transaction set files
#[derive(Parser, Debug)]
#[command(name = "txset")]
#[command(about = "Load, import, reconcile and save transaction set files", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Worker threads for the runtime and parallel duplicate detection
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        global = true,
        help = "Worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Transaction count at which duplicate detection runs in parallel
    #[arg(
        long = "parallel-threshold",
        value_name = "COUNT",
        global = true,
        help = "Visible transactions before duplicate detection goes parallel (default: 10000)"
    )]
    pub parallel_threshold: Option<usize>,

    /// Log filter directive
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        global = true,
        default_value = "warn",
        help = "Log filter, e.g. 'info' or 'transaction_set_engine=debug'"
    )]
    pub log_level: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new, empty transaction set file
    New {
        /// Transaction set file to create
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print a summary of a transaction set or bank export
    Summary {
        /// File to load
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// The file is encrypted
        #[arg(long)]
        encrypted: bool,
    },

    /// Import a bank export into a transaction set file
    Import {
        /// Bank export to import
        #[arg(value_name = "EXPORT")]
        export: PathBuf,

        /// Transaction set file to merge into (created if missing)
        #[arg(long = "into", value_name = "FILE")]
        into: PathBuf,

        /// Account the exported transactions belong to
        #[arg(long, value_name = "ACCOUNT")]
        account: String,

        /// Merge even if every transaction is already present
        #[arg(long = "allow-reimport")]
        allow_reimport: bool,
    },

    /// Write visible transactions as CSV
    List {
        /// File to load
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write suspected duplicate transactions as CSV
    Duplicates {
        /// File to load
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Split a transaction into two bucketed parts
    Split {
        /// Transaction set file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Transaction to split
        #[arg(long, value_name = "UUID")]
        id: Uuid,

        /// Amount of the first part
        #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
        amount1: Decimal,

        /// Amount of the second part
        #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
        amount2: Decimal,

        /// Bucket of the first part
        #[arg(long, value_name = "BUCKET")]
        bucket1: Option<String>,

        /// Bucket of the second part
        #[arg(long, value_name = "BUCKET")]
        bucket2: Option<String>,
    },

    /// Remove a transaction
    Remove {
        /// Transaction set file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Transaction to remove
        #[arg(long, value_name = "UUID")]
        id: Uuid,
    },
}

/// Filters shared by the listing subcommands
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// First date of the period (inclusive)
    #[arg(long, value_name = "YYYY-MM-DD", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last date of the period (inclusive)
    #[arg(long, value_name = "YYYY-MM-DD", requires = "from")]
    pub to: Option<NaiveDate>,

    /// Only transactions of this account
    #[arg(long, value_name = "ACCOUNT")]
    pub account: Option<String>,

    /// Case-insensitive text to look for (at least 3 characters)
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,
}

impl CliArgs {
    /// Create an EngineConfig from CLI arguments
    ///
    /// Missing values take the defaults; zero values fall back to the defaults
    /// with a warning.
    pub fn to_engine_config(&self) -> EngineConfig {
        if self.worker_threads.is_some() || self.parallel_threshold.is_some() {
            let default = EngineConfig::default();
            EngineConfig::new(
                self.worker_threads.unwrap_or(default.worker_threads),
                self.parallel_threshold
                    .unwrap_or(default.parallel_dedup_threshold),
            )
        } else {
            EngineConfig::default()
        }
    }
}
