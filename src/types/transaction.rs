//! Transaction-related types for the transaction set engine
//!
//! This module defines the transaction entity, its type label, and the
//! structural key used to detect suspected duplicates.

use super::account::AccountRef;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Transaction identifier
///
/// Assigned once at creation and never reused.
pub type TransactionId = Uuid;

/// Whether a date is the "never assigned" sentinel
///
/// Both the earliest representable date and 0001-01-01 count as unset; rows
/// carrying either are rejected on load.
pub fn is_unset_date(date: NaiveDate) -> bool {
    date == NaiveDate::MIN || (date.year() == 1 && date.ordinal() == 1)
}

/// Sign convention declared by a transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignConvention {
    /// Amounts must be zero or positive
    Credit,
    /// Amounts must be zero or negative
    Debit,
    /// Either sign is acceptable
    Either,
}

impl SignConvention {
    /// Infer the convention from an amount's sign
    pub fn of(amount: Decimal) -> Self {
        if amount.is_zero() {
            SignConvention::Either
        } else if amount.is_sign_negative() {
            SignConvention::Debit
        } else {
            SignConvention::Credit
        }
    }

    /// Whether an amount satisfies this convention
    pub fn accepts(&self, amount: Decimal) -> bool {
        match self {
            SignConvention::Credit => !amount.is_sign_negative() || amount.is_zero(),
            SignConvention::Debit => amount.is_sign_negative() || amount.is_zero(),
            SignConvention::Either => true,
        }
    }
}

/// Short classification label for a transaction, e.g. "Bill Payment"
///
/// A plain value compared by name. The sign convention is creation-time
/// metadata used by import adapters to validate amounts; two types with the
/// same name are the same type whatever their declared convention, so equality
/// and hashing look only at the name.
#[derive(Debug, Clone)]
pub struct TransactionType {
    name: String,
    sign: SignConvention,
}

impl TransactionType {
    /// Create a type with an explicit sign convention
    pub fn new(name: impl Into<String>, sign: SignConvention) -> Self {
        TransactionType {
            name: name.into(),
            sign,
        }
    }

    /// Create a type that accepts amounts of either sign
    pub fn named(name: impl Into<String>) -> Self {
        TransactionType::new(name, SignConvention::Either)
    }

    /// The type label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared sign convention
    pub fn sign(&self) -> SignConvention {
        self.sign
    }
}

impl PartialEq for TransactionType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TransactionType {}

impl Hash for TransactionType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A single monetary movement
///
/// Positive amounts are credits, negative amounts are debits.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    id: TransactionId,

    /// Account the money moved in or out of
    pub account: AccountRef,

    /// Signed amount, at least two fraction digits of precision
    pub amount: Decimal,

    /// Calendar date of the movement
    pub date: NaiveDate,

    /// Free-text description supplied by the bank
    pub description: String,

    /// Bank-specific reference fields
    pub reference1: String,
    pub reference2: String,
    pub reference3: String,

    /// Classification label
    pub transaction_type: TransactionType,

    /// Budget bucket code assigned by matching rules, if any
    pub bucket: Option<String>,

    pub(crate) suspected_duplicate: bool,
}

impl Transaction {
    /// Create a transaction with a freshly generated identifier
    ///
    /// All free-text fields start blank and no bucket is assigned.
    pub fn new(
        account: AccountRef,
        amount: Decimal,
        date: NaiveDate,
        transaction_type: TransactionType,
    ) -> Self {
        Transaction::with_id(Uuid::new_v4(), account, amount, date, transaction_type)
    }

    /// Create a transaction with a known identifier (used when loading)
    pub fn with_id(
        id: TransactionId,
        account: AccountRef,
        amount: Decimal,
        date: NaiveDate,
        transaction_type: TransactionType,
    ) -> Self {
        Transaction {
            id,
            account,
            amount,
            date,
            description: String::new(),
            reference1: String::new(),
            reference2: String::new(),
            reference3: String::new(),
            transaction_type,
            bucket: None,
            suspected_duplicate: false,
        }
    }

    /// Set the description (builder style)
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the three reference fields (builder style)
    pub fn references(
        mut self,
        reference1: impl Into<String>,
        reference2: impl Into<String>,
        reference3: impl Into<String>,
    ) -> Self {
        self.reference1 = reference1.into();
        self.reference2 = reference2.into();
        self.reference3 = reference3.into();
        self
    }

    /// Set the bucket code (builder style)
    ///
    /// A blank code means no bucket.
    pub fn bucket(mut self, bucket: Option<String>) -> Self {
        self.bucket = bucket
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
        self
    }

    /// The immutable identifier
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Whether duplicate detection flagged this transaction
    ///
    /// Never persisted; recomputed on demand.
    pub fn is_suspected_duplicate(&self) -> bool {
        self.suspected_duplicate
    }

    /// Copy every business field into a new transaction with a fresh identifier
    pub fn clone_with_new_id(&self) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            suspected_duplicate: false,
            ..self.clone()
        }
    }

    /// The structural key used for duplicate detection
    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey {
            account: self.account.clone(),
            amount: self.amount,
            date: self.date,
            description: self.description.clone(),
            reference1: self.reference1.clone(),
            reference2: self.reference2.clone(),
            reference3: self.reference3.clone(),
            transaction_type: self.transaction_type.name().to_string(),
            bucket: self.bucket.clone(),
        }
    }

    /// Structural equality: every business field except the identifier
    pub fn is_same_as(&self, other: &Transaction) -> bool {
        self.account == other.account
            && self.amount == other.amount
            && self.date == other.date
            && self.description == other.description
            && self.reference1 == other.reference1
            && self.reference2 == other.reference2
            && self.reference3 == other.reference3
            && self.transaction_type == other.transaction_type
            && self.bucket == other.bucket
    }
}

/// Business content of a transaction, excluding its identifier
///
/// Two transactions with equal keys are "the same transaction" for duplicate
/// detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub account: AccountRef,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub reference1: String,
    pub reference2: String,
    pub reference3: String,
    pub transaction_type: String,
    pub bucket: Option<String>,
}
