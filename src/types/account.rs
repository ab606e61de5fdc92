//! Account reference type
//!
//! Accounts are owned by an external subsystem. A transaction only carries an
//! opaque handle to one, which is persisted verbatim in the account column of
//! the transaction set file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an externally managed account
///
/// An empty handle is legal and means the transaction has not been assigned
/// to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountRef(String);

impl AccountRef {
    /// Create a handle from an account identifier
    ///
    /// Surrounding whitespace is not part of the identifier.
    pub fn new(id: impl Into<String>) -> Self {
        AccountRef(id.into().trim().to_string())
    }

    /// The handle used for transactions that have no account
    pub fn unassigned() -> Self {
        AccountRef(String::new())
    }

    /// The identifier as stored on disk
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this handle refers to no account
    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountRef {
    fn from(id: &str) -> Self {
        AccountRef::new(id)
    }
}
