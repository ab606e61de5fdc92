//! Core business logic module
//!
//! This module contains the in-memory transaction set components:
//! - `transaction_set` - The transaction set model and its derived views
//! - `checksum` - Tamper-detection checksum codec
//! - `engine` - Merge, filter, split and remove operations
//! - `dedup` - Duplicate detection by structural equality

pub mod checksum;
pub mod dedup;
pub mod engine;
pub mod transaction_set;

pub use checksum::{ChecksumVerdict, CHECKSUM_BYPASS};
pub use dedup::{DuplicateDetector, DuplicateReport};
pub use engine::{FilterCriteria, TextFilterOutcome, MIN_TEXT_FILTER_LEN};
pub use transaction_set::{DurationStatistics, TransactionSet};
