//! Error types for the transaction set engine
//!
//! This module defines every error that can abort a load, save, import or
//! in-memory operation on a transaction set. All of them are fatal for the
//! operation that raised them: nothing is partially committed.
//!
//! # Error Categories
//!
//! - **Storage Errors**: missing files, I/O failures, unavailable encrypted storage
//! - **Format Errors**: unrecognised files, malformed rows, ragged rows
//! - **Integrity Errors**: checksum mismatches, lossy save mappings
//! - **Operation Errors**: invalid splits, unknown transactions, bad filters
//!
//! Taste-test failures are deliberately absent: a format that does not match a
//! file is a `false`, never an error.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the transaction set engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionSetError {
    /// The storage key does not resolve to an existing file
    #[error("File not found: {key}")]
    NotFound {
        /// The storage key that was not found
        key: String,
    },

    /// No codec or bank adapter recognises the file
    #[error("Unsupported file format: {key}")]
    UnsupportedFormat {
        /// The storage key of the unrecognised file
        key: String,
    },

    /// The stored checksum does not match the recomputed one
    ///
    /// The file has been corrupted or tampered with. Only a stored value of
    /// exactly `1` bypasses this check.
    #[error("Checksum mismatch: file declares {expected}, transactions compute to {actual}")]
    ChecksumMismatch {
        /// Checksum stored in the file header
        expected: i64,
        /// Checksum recomputed from the loaded transactions
        actual: i64,
    },

    /// A row could not be parsed (wrong column count, bad field, unset sentinel)
    #[error("Data format error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    DataFormat {
        /// Line number of the offending row (if available)
        line: Option<u64>,
        /// Description of the problem
        message: String,
    },

    /// A column index beyond the fields available on a row
    ///
    /// Ragged rows reject the whole file rather than defaulting the missing
    /// columns.
    #[error("Column index {index} out of range at line {line}: row has {available} fields")]
    IndexOutOfRange {
        /// Line number of the short row
        line: u64,
        /// Column index that was requested
        index: usize,
        /// Number of fields actually present
        available: usize,
    },

    /// Every transaction in an import batch is already present
    #[error("Transactions from {key} have already been imported")]
    AlreadyImported {
        /// Storage key of the batch being imported
        key: String,
    },

    /// The serialisable rows do not match the model being saved
    #[error("Refusing to save: model holds {expected} transactions but {actual} were mapped for writing")]
    TransactionCountMismatch {
        /// Number of transactions in the model
        expected: usize,
        /// Number of rows produced for serialisation
        actual: usize,
    },

    /// Split amounts do not sum to the original amount
    #[error("Split amounts {amount1} and {amount2} do not sum to the original amount {original}")]
    SplitAmountMismatch {
        /// Amount of the transaction being split
        original: Decimal,
        /// First splinter amount
        amount1: Decimal,
        /// Second splinter amount
        amount2: Decimal,
    },

    /// No transaction with the given identifier exists in the set
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// The identifier that was looked up
        id: Uuid,
    },

    /// Filter criteria violate their contract
    #[error("Invalid filter: {message}")]
    InvalidFilter {
        /// Description of the violation
        message: String,
    },

    /// Encrypted storage was requested but no encrypted reader/writer is configured
    #[error("No encrypted reader/writer available for {key}")]
    EncryptionUnavailable {
        /// The storage key that was requested
        key: String,
    },

    /// I/O error while reading or writing storage
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },
}

impl From<std::io::Error> for TransactionSetError {
    fn from(error: std::io::Error) -> Self {
        TransactionSetError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for TransactionSetError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(_) => TransactionSetError::Io {
                message: error.to_string(),
            },
            _ => TransactionSetError::DataFormat {
                line: error.position().map(|pos| pos.line()),
                message: error.to_string(),
            },
        }
    }
}

impl From<csv_async::Error> for TransactionSetError {
    fn from(error: csv_async::Error) -> Self {
        match error.kind() {
            csv_async::ErrorKind::Io(_) => TransactionSetError::Io {
                message: error.to_string(),
            },
            _ => TransactionSetError::DataFormat {
                line: error.position().map(|pos| pos.line()),
                message: error.to_string(),
            },
        }
    }
}

// Helper functions for creating common errors

impl TransactionSetError {
    /// Create a NotFound error
    pub fn not_found(key: &str) -> Self {
        TransactionSetError::NotFound {
            key: key.to_string(),
        }
    }

    /// Create an UnsupportedFormat error
    pub fn unsupported_format(key: &str) -> Self {
        TransactionSetError::UnsupportedFormat {
            key: key.to_string(),
        }
    }

    /// Create a DataFormat error for a specific line
    pub fn data_format(line: u64, message: impl Into<String>) -> Self {
        TransactionSetError::DataFormat {
            line: Some(line),
            message: message.into(),
        }
    }

    /// Create an IndexOutOfRange error
    pub fn index_out_of_range(line: u64, index: usize, available: usize) -> Self {
        TransactionSetError::IndexOutOfRange {
            line,
            index,
            available,
        }
    }

    /// Create an AlreadyImported error
    pub fn already_imported(key: &str) -> Self {
        TransactionSetError::AlreadyImported {
            key: key.to_string(),
        }
    }

    /// Create an InvalidFilter error
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        TransactionSetError::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create a TransactionNotFound error
    pub fn transaction_not_found(id: Uuid) -> Self {
        TransactionSetError::TransactionNotFound { id }
    }
}
