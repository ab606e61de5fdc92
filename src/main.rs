//! Transaction set command line tool
//!
//! Loads, imports, reconciles and saves transaction set files.
//!
//! # Usage
//!
//! ```bash
//! txset new budget.txs
//! txset import anz-export.csv --into budget.txs --account CHEQUE
//! txset summary budget.txs
//! txset list budget.txs --from 2024-01-01 --to 2024-03-31 --text power > q1.csv
//! txset duplicates budget.txs
//! txset split budget.txs --id <UUID> --amount1 -60.00 --amount2 -35.15 --bucket1 FOOD
//! txset remove budget.txs --id <UUID>
//! ```
//!
//! Reports and listings go to stdout; logs go to stderr (see `--log-level`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, unsupported format, checksum mismatch, etc.)

use std::process;
use tracing_subscriber::EnvFilter;
use transaction_set_engine::cli;
use transaction_set_engine::io::PlainFileSelector;
use transaction_set_engine::repository::TransactionSetRepository;

fn main() {
    let args = cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.to_engine_config();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let repository = TransactionSetRepository::new(PlainFileSelector::new());
    let mut output = std::io::stdout();
    let result = runtime.block_on(cli::run(args.command, &config, &repository, &mut output));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
