//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Opaque account handles
//! - `transaction`: Transactions, type labels and duplicate keys
//! - `error`: Error types for the transaction set engine

pub mod account;
pub mod error;
pub mod transaction;

pub use account::AccountRef;
pub use error::TransactionSetError;
pub use transaction::{
    is_unset_date, DuplicateKey, SignConvention, Transaction, TransactionId, TransactionType,
};
