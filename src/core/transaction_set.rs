//! Transaction set model
//!
//! A `TransactionSet` holds every transaction loaded from one storage key,
//! kept sorted ascending by date, together with the derived "visible" view
//! produced by the current filters.
//!
//! # Derived State
//!
//! - **Visible transactions**: always a subset of all transactions; equal to
//!   them when no filter is active
//! - **Version token**: replaced on every structural change (merge, split,
//!   remove, structural filter) so observers know to refresh; never persisted
//! - **Duration statistics**: first/last date and span in months
//! - **Duplicate report**: cached result of duplicate detection
//!
//! The mutating operations live in [`crate::core::engine`]; this module only
//! owns the data and keeps the derived state consistent.

use crate::core::dedup::DuplicateReport;
use crate::core::engine::FilterCriteria;
use crate::types::{Transaction, TransactionId};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// All transactions originating from one storage key, plus a filtered view
#[derive(Debug, Clone)]
pub struct TransactionSet {
    storage_key: String,
    pub(crate) all: Vec<Transaction>,
    /// Indices into `all`, in date order
    pub(crate) visible: Vec<usize>,
    pub(crate) last_import: Option<NaiveDateTime>,
    version: Uuid,
    pub(crate) criteria: FilterCriteria,
    pub(crate) text_filter: Option<String>,
    pub(crate) duplicates: Option<DuplicateReport>,
    statistics: DurationStatistics,
}

/// Date span covered by a transaction set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationStatistics {
    /// Date of the earliest transaction
    pub first_date: Option<NaiveDate>,
    /// Date of the latest transaction
    pub last_date: Option<NaiveDate>,
    /// Calendar months between first and last date (at least 1 when non-empty)
    pub duration_in_months: u32,
}

impl DurationStatistics {
    fn from_sorted(transactions: &[Transaction]) -> Self {
        let (Some(first), Some(last)) = (transactions.first(), transactions.last()) else {
            return DurationStatistics::default();
        };

        DurationStatistics {
            first_date: Some(first.date),
            last_date: Some(last.date),
            duration_in_months: months_between(first.date, last.date).max(1),
        }
    }
}

/// Whole calendar months from `start` to `end`
fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

impl TransactionSet {
    /// Create an empty transaction set for a storage key
    pub fn new(storage_key: impl Into<String>) -> Self {
        TransactionSet {
            storage_key: storage_key.into(),
            all: Vec::new(),
            visible: Vec::new(),
            last_import: None,
            version: Uuid::new_v4(),
            criteria: FilterCriteria::default(),
            text_filter: None,
            duplicates: None,
            statistics: DurationStatistics::default(),
        }
    }

    /// Create a transaction set from loaded or imported transactions
    ///
    /// Transactions are sorted by date (stable, so same-day rows keep their
    /// input order).
    pub fn from_transactions(
        storage_key: impl Into<String>,
        transactions: Vec<Transaction>,
        last_import: Option<NaiveDateTime>,
    ) -> Self {
        let mut set = TransactionSet::new(storage_key);
        set.all = transactions;
        set.last_import = last_import;
        set.sort_and_refresh();
        set
    }

    /// The opaque key identifying where this set came from
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Point the set at a different storage key (e.g. "save as")
    pub fn set_storage_key(&mut self, storage_key: impl Into<String>) {
        self.storage_key = storage_key.into();
    }

    /// Every transaction, sorted ascending by date
    pub fn all_transactions(&self) -> &[Transaction] {
        &self.all
    }

    /// Transactions passing the current filters, in date order
    pub fn visible_transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.visible.iter().map(move |&index| &self.all[index])
    }

    /// Number of visible transactions
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Number of transactions in the set
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Whether the set holds no transactions
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Look up a transaction by identifier
    pub fn find(&self, id: TransactionId) -> Option<&Transaction> {
        self.all.iter().find(|txn| txn.id() == id)
    }

    /// Timestamp of the most recent import merged into this set
    pub fn last_import(&self) -> Option<NaiveDateTime> {
        self.last_import
    }

    /// Token replaced on every structural change
    pub fn version(&self) -> Uuid {
        self.version
    }

    /// Date span statistics
    pub fn statistics(&self) -> DurationStatistics {
        self.statistics
    }

    /// The structural filter currently applied
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// The free-text filter currently applied, if any
    pub fn text_filter(&self) -> Option<&str> {
        self.text_filter.as_deref()
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = Uuid::new_v4();
    }

    /// Re-sort, recompute statistics and re-derive the visible view
    pub(crate) fn sort_and_refresh(&mut self) {
        self.all.sort_by_key(|txn| txn.date);
        self.statistics = DurationStatistics::from_sorted(&self.all);
        self.refresh_visible();
    }

    /// Re-derive the visible view from the current criteria and text filter
    ///
    /// Any cached duplicate report is discarded along with the flags it set.
    pub(crate) fn refresh_visible(&mut self) {
        self.invalidate_duplicates();

        let text = self.text_filter.as_deref().map(str::to_lowercase);
        self.visible = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, txn)| self.criteria.matches(txn))
            .filter(|(_, txn)| text.as_deref().map_or(true, |t| matches_text(txn, t)))
            .map(|(index, _)| index)
            .collect();
    }

    pub(crate) fn invalidate_duplicates(&mut self) {
        if self.duplicates.take().is_some() {
            for txn in &mut self.all {
                txn.suspected_duplicate = false;
            }
        }
    }
}

/// Case-insensitive substring match over description and references
///
/// `needle` must already be lower case.
pub(crate) fn matches_text(txn: &Transaction, needle: &str) -> bool {
    [
        &txn.description,
        &txn.reference1,
        &txn.reference2,
        &txn.reference3,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
