//! Transaction Set Engine Library
//! # Overview
//!
//! This library loads, imports, reconciles and saves a household's transaction
//! history. A transaction set is stored in a versioned, checksummed text
//! format; bank exports in several formats are recognised by a cheap taste
//! test and imported into the same model.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Transaction, TransactionType, AccountRef, errors)
//! - [`core`] - Business logic components:
//!   - [`core::transaction_set`] - The transaction set model and derived views
//!   - [`core::checksum`] - Tamper-detection checksum
//!   - [`core::engine`] - Merge, filter, split and remove operations
//!   - [`core::dedup`] - Suspected duplicate detection
//! - [`io`] - Storage capability, native file format and report output
//! - [`import`] - Format detection registry and bank export adapters
//! - [`repository`] - Load/import/save orchestration
//! - [`config`] - Engine tunables
//! - [`cli`] - CLI arguments parsing and subcommands
//!
//! # Data Flow
//!
//! ```text
//! storage key → ReaderWriterSelector → ImportRegistry (native format first,
//!   then bank exports) → TransactionSet → engine operations
//!   → native format writer → ReaderWriter
//! ```
//!
//! # Integrity
//!
//! Every save writes a checksum of the transaction amounts into the file
//! header; every load recomputes and compares it. The literal checksum `1`
//! disables verification for a file.

pub mod cli;
pub mod config;
pub mod core;
pub mod import;
pub mod io;
pub mod repository;
pub mod types;

pub use config::EngineConfig;
pub use core::{DuplicateDetector, DuplicateReport, FilterCriteria, TransactionSet};
pub use import::{ImportFormat, ImportRegistry};
pub use io::write_transactions_csv;
pub use repository::TransactionSetRepository;
pub use types::{
    AccountRef, SignConvention, Transaction, TransactionId, TransactionSetError, TransactionType,
};
