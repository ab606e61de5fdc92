//! Merge, filter, split and remove operations on a transaction set
//!
//! This module provides the in-memory manipulation of a [`TransactionSet`].
//! Every operation validates its input before touching the set, so a rejected
//! call leaves the set exactly as it was.
//!
//! The engine enforces these rules:
//! - `all_transactions` stays sorted ascending by date
//! - merging is append-only and never mutates the sets being merged
//! - a split's two amounts must sum exactly to the original amount
//! - structural operations replace the version token; free-text filtering does not

use crate::core::dedup::{DuplicateDetector, DuplicateReport};
use crate::core::transaction_set::TransactionSet;
use crate::types::{AccountRef, Transaction, TransactionId, TransactionSetError};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Filter strings shorter than this are ignored
pub const MIN_TEXT_FILTER_LEN: usize = 3;

/// Structural filter criteria, combined with AND semantics
///
/// The default value has no criteria and matches every transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Earliest date to include (inclusive)
    pub begin_date: Option<NaiveDate>,
    /// Latest date to include (inclusive)
    pub end_date: Option<NaiveDate>,
    /// Only include transactions for this account
    pub account: Option<AccountRef>,
}

impl FilterCriteria {
    /// Criteria describing a bounded period
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` if only one of the two dates is given, or if
    /// `begin` is after `end`.
    pub fn period(
        begin: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, TransactionSetError> {
        match (begin, end) {
            (Some(b), Some(e)) if b > e => Err(TransactionSetError::invalid_filter(format!(
                "begin date {} is after end date {}",
                b, e
            ))),
            (Some(_), None) => Err(TransactionSetError::invalid_filter(
                "a period needs an end date when a begin date is given",
            )),
            (None, Some(_)) => Err(TransactionSetError::invalid_filter(
                "a period needs a begin date when an end date is given",
            )),
            _ => Ok(FilterCriteria {
                begin_date: begin,
                end_date: end,
                account: None,
            }),
        }
    }

    /// Restrict the criteria to one account (builder style)
    pub fn with_account(mut self, account: AccountRef) -> Self {
        self.account = Some(account);
        self
    }

    /// Whether no criterion is set
    pub fn is_cleared(&self) -> bool {
        self.begin_date.is_none() && self.end_date.is_none() && self.account.is_none()
    }

    /// Whether a transaction satisfies every criterion that is set
    pub fn matches(&self, txn: &Transaction) -> bool {
        self.begin_date.map_or(true, |begin| txn.date >= begin)
            && self.end_date.map_or(true, |end| txn.date <= end)
            && self
                .account
                .as_ref()
                .map_or(true, |account| &txn.account == account)
    }
}

/// Result of applying a free-text filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFilterOutcome {
    /// The filter was applied; carries the number of visible transactions
    Applied(usize),
    /// The filter text was too short; visibility is unchanged
    NotApplied,
}

impl TransactionSet {
    /// Merge another set into a copy of this one
    ///
    /// Neither input is modified. Transactions whose identifier already exists
    /// in this set are not added a second time. The result takes this set's
    /// storage key and filters. When `other` carries a last-import timestamp it
    /// replaces this set's one.
    pub fn merge(&self, other: &TransactionSet) -> TransactionSet {
        let mut merged = self.clone();
        merged.merge_batch(other.all_transactions().to_vec(), other.last_import());
        merged
    }

    /// Merge an imported batch, rejecting batches that were already imported
    ///
    /// # Errors
    ///
    /// Returns `AlreadyImported` if `other` is non-empty and every one of its
    /// transactions is structurally identical to one already in this set,
    /// unless `allow_reimport` is true.
    pub fn merge_checked(
        &self,
        other: &TransactionSet,
        allow_reimport: bool,
    ) -> Result<TransactionSet, TransactionSetError> {
        if !allow_reimport && !other.is_empty() {
            let existing: HashSet<_> = self.all.iter().map(Transaction::duplicate_key).collect();
            if other
                .all
                .iter()
                .all(|txn| existing.contains(&txn.duplicate_key()))
            {
                return Err(TransactionSetError::already_imported(other.storage_key()));
            }
        }

        Ok(self.merge(other))
    }

    /// Append a batch of transactions in place
    ///
    /// Re-sorts, recomputes statistics, drops the duplicate cache and replaces
    /// the version token. `last_import`, when given, becomes the set's
    /// last-import timestamp.
    pub(crate) fn merge_batch(
        &mut self,
        batch: Vec<Transaction>,
        last_import: Option<NaiveDateTime>,
    ) {
        let known: HashSet<TransactionId> = self.all.iter().map(Transaction::id).collect();
        let before = self.all.len();
        self.all.extend(batch.into_iter().filter(|txn| !known.contains(&txn.id())));
        tracing::debug!(
            storage_key = %self.storage_key(),
            added = self.all.len() - before,
            "merged transaction batch"
        );

        if let Some(stamp) = last_import {
            self.last_import = Some(stamp);
        }

        self.sort_and_refresh();
        self.bump_version();
    }

    /// Apply structural filter criteria
    ///
    /// Replaces the current criteria and clears any free-text filter. Passing
    /// default criteria resets visibility to the full set.
    pub fn filter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.text_filter = None;
        self.refresh_visible();
        self.bump_version();
    }

    /// Filter to a bounded period
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` (leaving the set untouched) if only one date is
    /// given or the dates are reversed.
    pub fn filter_period(
        &mut self,
        begin: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<(), TransactionSetError> {
        let criteria = FilterCriteria::period(begin, end)?;
        self.filter(criteria);
        Ok(())
    }

    /// Remove every filter
    pub fn clear_filter(&mut self) {
        self.filter(FilterCriteria::default());
    }

    /// Narrow the visible transactions by case-insensitive substring
    ///
    /// Matches description and the three reference fields. Text shorter than
    /// [`MIN_TEXT_FILTER_LEN`] characters is ignored. Does not replace the
    /// version token.
    pub fn filter_by_text(&mut self, text: &str) -> TextFilterOutcome {
        let text = text.trim();
        if text.chars().count() < MIN_TEXT_FILTER_LEN {
            return TextFilterOutcome::NotApplied;
        }

        self.text_filter = Some(text.to_string());
        self.refresh_visible();
        TextFilterOutcome::Applied(self.visible.len())
    }

    /// Drop the free-text filter, keeping the structural criteria
    pub fn clear_text_filter(&mut self) {
        if self.text_filter.take().is_some() {
            self.refresh_visible();
        }
    }

    /// Split a transaction into two bucket-tagged splinters
    ///
    /// Both splinters copy every business field of the original under a new
    /// identifier, then take the given amount and bucket. The original is
    /// removed.
    ///
    /// # Returns
    ///
    /// The identifiers of the two splinter transactions.
    ///
    /// # Errors
    ///
    /// Returns an error, before any mutation, if:
    /// - no transaction has the given identifier (`TransactionNotFound`)
    /// - `amount1 + amount2` differs from the original amount (`SplitAmountMismatch`)
    pub fn split(
        &mut self,
        original_id: TransactionId,
        amount1: Decimal,
        amount2: Decimal,
        bucket1: Option<String>,
        bucket2: Option<String>,
    ) -> Result<(TransactionId, TransactionId), TransactionSetError> {
        let position = self.position_of(original_id)?;
        let original = &self.all[position];

        let total = amount1.checked_add(amount2);
        if total != Some(original.amount) {
            return Err(TransactionSetError::SplitAmountMismatch {
                original: original.amount,
                amount1,
                amount2,
            });
        }

        let mut splinter1 = original.clone_with_new_id().bucket(bucket1);
        splinter1.amount = amount1;

        let mut splinter2 = original.clone_with_new_id().bucket(bucket2);
        splinter2.amount = amount2;

        let ids = (splinter1.id(), splinter2.id());
        self.all.remove(position);
        self.merge_batch(vec![splinter1, splinter2], None);

        tracing::debug!(%original_id, "split transaction");
        Ok(ids)
    }

    /// Remove a transaction by identifier
    ///
    /// # Returns
    ///
    /// The removed transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if no transaction has the identifier.
    pub fn remove(&mut self, id: TransactionId) -> Result<Transaction, TransactionSetError> {
        let position = self.position_of(id)?;
        let removed = self.all.remove(position);
        self.sort_and_refresh();
        self.bump_version();
        Ok(removed)
    }

    /// Flag structurally identical visible transactions as suspected duplicates
    ///
    /// The report is cached until the next merge, filter or removal; calling
    /// this again in between returns the cached report.
    pub fn detect_duplicates(&mut self, detector: &DuplicateDetector) -> &DuplicateReport {
        if self.duplicates.is_none() {
            let groups = {
                let visible: Vec<&Transaction> = self.visible_transactions().collect();
                detector.group(&visible)
            };

            // Group members are positions within the visible view
            let mut report = DuplicateReport::default();
            for group in groups {
                let mut ids = Vec::with_capacity(group.len());
                for visible_index in group {
                    let position = self.visible[visible_index];
                    let txn = &mut self.all[position];
                    txn.suspected_duplicate = true;
                    ids.push(txn.id());
                }
                report.groups.push(ids);
            }
            self.duplicates = Some(report);
        }

        self.duplicates.get_or_insert_with(DuplicateReport::default)
    }

    /// Visible transactions flagged by the last duplicate detection
    pub fn suspected_duplicates(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.visible_transactions()
            .filter(|txn| txn.is_suspected_duplicate())
    }

    fn position_of(&self, id: TransactionId) -> Result<usize, TransactionSetError> {
        self.all
            .iter()
            .position(|txn| txn.id() == id)
            .ok_or_else(|| TransactionSetError::transaction_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use rstest::rstest;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(account: &str, cents: i64, on: NaiveDate, description: &str) -> Transaction {
        Transaction::new(
            AccountRef::new(account),
            Decimal::new(cents, 2),
            on,
            TransactionType::named("Payment"),
        )
        .description(description)
        .references("ref-one", "", "")
    }

    fn sample_set() -> TransactionSet {
        TransactionSet::from_transactions(
            "budget.txs",
            vec![
                txn("CHEQUE", -1000, date(2024, 1, 5), "Coffee Roasters"),
                txn("VISA", -2500, date(2024, 2, 10), "Petrol Station"),
                txn("CHEQUE", 150000, date(2024, 3, 1), "Salary"),
                txn("VISA", -4000, date(2024, 3, 20), "Supermarket"),
            ],
            None,
        )
    }

    fn stamp(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(9, 30, 0).unwrap()
    }

    #[test]
    fn test_merge_is_sorted_and_contains_everything_once() {
        let a = sample_set();
        let b = TransactionSet::from_transactions(
            "export.csv",
            vec![
                txn("CHEQUE", -700, date(2024, 2, 1), "Bakery"),
                txn("CHEQUE", -800, date(2023, 12, 31), "Bookshop"),
            ],
            Some(stamp(2024, 4, 1)),
        );

        let merged = a.merge(&b);

        assert_eq!(merged.len(), 6);
        let dates: Vec<_> = merged.all_transactions().iter().map(|t| t.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        for t in a.all_transactions().iter().chain(b.all_transactions()) {
            assert_eq!(
                merged.all_transactions().iter().filter(|m| m.id() == t.id()).count(),
                1
            );
        }
        assert_eq!(merged.last_import(), Some(stamp(2024, 4, 1)));
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let a = sample_set();
        let b = TransactionSet::from_transactions(
            "export.csv",
            vec![txn("CHEQUE", -700, date(2024, 2, 1), "Bakery")],
            Some(stamp(2024, 4, 1)),
        );
        let a_before: Vec<_> = a.all_transactions().to_vec();
        let a_version = a.version();

        let merged = a.merge(&b);

        assert_eq!(a.all_transactions(), a_before.as_slice());
        assert_eq!(a.version(), a_version);
        assert_eq!(b.len(), 1);
        assert_ne!(merged.version(), a_version);
    }

    #[test]
    fn test_merge_skips_identical_ids() {
        let a = sample_set();
        let merged = a.merge(&a);
        assert_eq!(merged.len(), a.len());
    }

    #[test]
    fn test_merge_takes_batch_import_stamp() {
        let a = TransactionSet::from_transactions("a", vec![], Some(stamp(2024, 5, 1)));
        let older = TransactionSet::from_transactions(
            "b",
            vec![txn("CHEQUE", -700, date(2024, 2, 1), "Bakery")],
            Some(stamp(2024, 4, 1)),
        );
        let unstamped = TransactionSet::from_transactions(
            "c",
            vec![txn("CHEQUE", -800, date(2024, 2, 2), "Bookshop")],
            None,
        );

        assert_eq!(a.merge(&older).last_import(), Some(stamp(2024, 4, 1)));
        assert_eq!(a.merge(&unstamped).last_import(), Some(stamp(2024, 5, 1)));
    }

    #[test]
    fn test_merge_checked_rejects_reimport() {
        let a = sample_set();
        let copies: Vec<_> = a.all_transactions()[..2]
            .iter()
            .map(Transaction::clone_with_new_id)
            .collect();
        let again = TransactionSet::from_transactions("export.csv", copies, None);

        let result = a.merge_checked(&again, false);
        assert_eq!(
            result.unwrap_err(),
            TransactionSetError::AlreadyImported {
                key: "export.csv".to_string()
            }
        );

        let forced = a.merge_checked(&again, true).unwrap();
        assert_eq!(forced.len(), a.len() + 2);
    }

    #[test]
    fn test_merge_checked_accepts_partly_new_batch() {
        let a = sample_set();
        let batch = vec![
            a.all_transactions()[0].clone_with_new_id(),
            txn("CHEQUE", -700, date(2024, 4, 2), "Bakery"),
        ];
        let incoming = TransactionSet::from_transactions("export.csv", batch, None);
        assert_eq!(a.merge_checked(&incoming, false).unwrap().len(), a.len() + 2);
    }

    #[rstest]
    #[case::no_criteria(FilterCriteria::default(), 4)]
    #[case::begin_and_end(
        FilterCriteria { begin_date: Some(date(2024, 2, 1)), end_date: Some(date(2024, 3, 1)), account: None },
        2
    )]
    #[case::account_only(
        FilterCriteria { begin_date: None, end_date: None, account: Some(AccountRef::new("VISA")) },
        2
    )]
    #[case::all_criteria(
        FilterCriteria { begin_date: Some(date(2024, 2, 1)), end_date: Some(date(2024, 3, 31)), account: Some(AccountRef::new("VISA")) },
        2
    )]
    #[case::open_ended_begin(
        FilterCriteria { begin_date: Some(date(2024, 3, 1)), end_date: None, account: None },
        2
    )]
    fn test_filter_and_semantics(#[case] criteria: FilterCriteria, #[case] expected: usize) {
        let mut set = sample_set();
        set.filter(criteria.clone());
        assert_eq!(set.visible_count(), expected);
        assert!(set.visible_transactions().all(|t| criteria.matches(t)));
    }

    #[test]
    fn test_filter_changes_version_and_clear_restores_all() {
        let mut set = sample_set();
        let v0 = set.version();
        set.filter(FilterCriteria::default().with_account(AccountRef::new("VISA")));
        assert_ne!(set.version(), v0);
        assert_eq!(set.visible_count(), 2);

        set.clear_filter();
        assert_eq!(set.visible_count(), set.len());
    }

    #[rstest]
    #[case::begin_only(Some(date(2024, 1, 1)), None)]
    #[case::end_only(None, Some(date(2024, 1, 1)))]
    #[case::reversed(Some(date(2024, 2, 1)), Some(date(2024, 1, 1)))]
    fn test_filter_period_rejects_unbounded(
        #[case] begin: Option<NaiveDate>,
        #[case] end: Option<NaiveDate>,
    ) {
        let mut set = sample_set();
        let v0 = set.version();
        let result = set.filter_period(begin, end);
        assert!(matches!(result, Err(TransactionSetError::InvalidFilter { .. })));
        assert_eq!(set.version(), v0);
        assert_eq!(set.visible_count(), 4);
    }

    #[test]
    fn test_text_filter_short_text_not_applied() {
        let mut set = sample_set();
        let v0 = set.version();
        assert_eq!(set.filter_by_text("co"), TextFilterOutcome::NotApplied);
        assert_eq!(set.visible_count(), 4);
        assert_eq!(set.version(), v0);
    }

    #[test]
    fn test_text_filter_narrows_without_version_change() {
        let mut set = sample_set();
        let v0 = set.version();
        assert_eq!(set.filter_by_text("STATION"), TextFilterOutcome::Applied(1));
        assert_eq!(set.version(), v0);
        assert_eq!(set.visible_transactions().next().unwrap().description, "Petrol Station");

        // References are searched too
        assert_eq!(set.filter_by_text("ref-o"), TextFilterOutcome::Applied(4));
    }

    #[test]
    fn test_text_filter_combines_with_criteria_and_is_cleared_by_filter() {
        let mut set = sample_set();
        set.filter(FilterCriteria::default().with_account(AccountRef::new("CHEQUE")));
        assert_eq!(set.filter_by_text("salary"), TextFilterOutcome::Applied(1));

        set.filter(FilterCriteria::default().with_account(AccountRef::new("CHEQUE")));
        assert_eq!(set.text_filter(), None);
        assert_eq!(set.visible_count(), 2);
    }

    #[test]
    fn test_split_produces_two_splinters() {
        let mut set = sample_set();
        let original = set.all_transactions()[3].clone();

        let (id1, id2) = set
            .split(
                original.id(),
                Decimal::new(-1500, 2),
                Decimal::new(-2500, 2),
                Some("FOOD".to_string()),
                Some("HOUSEHOLD".to_string()),
            )
            .unwrap();

        assert!(set.find(original.id()).is_none());
        assert_eq!(set.len(), 4 + 1);

        let s1 = set.find(id1).unwrap();
        let s2 = set.find(id2).unwrap();
        assert_eq!(s1.amount + s2.amount, original.amount);
        assert_eq!(s1.bucket.as_deref(), Some("FOOD"));
        assert_eq!(s2.bucket.as_deref(), Some("HOUSEHOLD"));
        for s in [s1, s2] {
            assert_ne!(s.id(), original.id());
            assert_eq!(s.date, original.date);
            assert_eq!(s.description, original.description);
            assert_eq!(s.reference1, original.reference1);
            assert_eq!(s.account, original.account);
            assert_eq!(s.transaction_type, original.transaction_type);
        }
    }

    #[test]
    fn test_split_rejects_mismatched_amounts_before_mutating() {
        let mut set = sample_set();
        let before: Vec<_> = set.all_transactions().to_vec();
        let v0 = set.version();
        let original_id = before[3].id();

        let result = set.split(
            original_id,
            Decimal::new(-1500, 2),
            Decimal::new(-2499, 2),
            None,
            None,
        );

        assert!(matches!(result, Err(TransactionSetError::SplitAmountMismatch { .. })));
        assert_eq!(set.all_transactions(), before.as_slice());
        assert_eq!(set.version(), v0);
    }

    #[test]
    fn test_split_unknown_transaction() {
        let mut set = sample_set();
        let missing = Uuid::new_v4();
        let result = set.split(missing, Decimal::ONE, Decimal::ONE, None, None);
        assert_eq!(
            result.unwrap_err(),
            TransactionSetError::TransactionNotFound { id: missing }
        );
    }

    #[test]
    fn test_remove_rederives_visible_from_filter() {
        let mut set = sample_set();
        set.filter(FilterCriteria::default().with_account(AccountRef::new("VISA")));
        let target = set.visible_transactions().next().unwrap().id();
        let v0 = set.version();

        let removed = set.remove(target).unwrap();

        assert_eq!(removed.id(), target);
        assert_eq!(set.len(), 3);
        assert_eq!(set.visible_count(), 1);
        assert_ne!(set.version(), v0);
        assert!(matches!(
            set.remove(target),
            Err(TransactionSetError::TransactionNotFound { .. })
        ));
    }

    #[test]
    fn test_text_filter_survives_merge_split_and_remove() {
        fn only_stations(set: &TransactionSet) {
            assert_eq!(set.text_filter(), Some("station"));
            assert!(set.visible_count() > 0);
            assert!(set
                .visible_transactions()
                .all(|t| t.description.to_lowercase().contains("station")));
        }

        let mut set = sample_set();
        assert_eq!(set.filter_by_text("station"), TextFilterOutcome::Applied(1));

        let batch = TransactionSet::from_transactions(
            "export.csv",
            vec![
                txn("VISA", -3000, date(2024, 2, 12), "Service Station Car Wash"),
                txn("CHEQUE", -700, date(2024, 2, 13), "Bakery"),
            ],
            Some(stamp(2024, 4, 1)),
        );
        set = set.merge(&batch);
        only_stations(&set);
        assert_eq!(set.visible_count(), 2);
        assert_eq!(set.len(), 6);

        let petrol = set
            .visible_transactions()
            .find(|t| t.description == "Petrol Station")
            .unwrap()
            .id();
        set.split(petrol, Decimal::new(-1000, 2), Decimal::new(-1500, 2), None, None)
            .unwrap();
        only_stations(&set);
        assert_eq!(set.visible_count(), 3);

        let first = set.visible_transactions().next().unwrap().id();
        set.remove(first).unwrap();
        only_stations(&set);
        assert_eq!(set.visible_count(), 2);
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_detect_duplicates_flags_identical_content() {
        let original = txn("CHEQUE", -1000, date(2024, 1, 5), "Coffee Roasters");
        let copy = original.clone_with_new_id();
        let unique = txn("CHEQUE", -1000, date(2024, 1, 5), "Tea House");
        let mut set =
            TransactionSet::from_transactions("budget.txs", vec![original, copy, unique], None);

        let report = set.detect_duplicates(&DuplicateDetector::default());
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.flagged_count(), 2);

        let flagged: Vec<_> = set.suspected_duplicates().map(|t| t.description.clone()).collect();
        assert_eq!(flagged, vec!["Coffee Roasters", "Coffee Roasters"]);
        assert_eq!(set.all_transactions().len(), 3);
    }

    #[test]
    fn test_duplicate_cache_invalidated_on_merge_and_filter() {
        let original = txn("CHEQUE", -1000, date(2024, 1, 5), "Coffee Roasters");
        let copy = original.clone_with_new_id();
        let mut set = TransactionSet::from_transactions("budget.txs", vec![original, copy], None);
        set.detect_duplicates(&DuplicateDetector::default());
        assert_eq!(set.suspected_duplicates().count(), 2);

        set.filter(FilterCriteria::default().with_account(AccountRef::new("VISA")));
        assert!(set.all_transactions().iter().all(|t| !t.is_suspected_duplicate()));

        set.clear_filter();
        set.detect_duplicates(&DuplicateDetector::default());
        let merged = set.merge(&TransactionSet::new("empty"));
        assert_eq!(merged.suspected_duplicates().count(), 0);
    }

    #[test]
    fn test_duplicates_only_consider_visible_transactions() {
        let original = txn("CHEQUE", -1000, date(2024, 1, 5), "Coffee Roasters");
        let copy = original.clone_with_new_id();
        let mut set = TransactionSet::from_transactions("budget.txs", vec![original, copy], None);
        set.filter_period(Some(date(2024, 2, 1)), Some(date(2024, 2, 28)))
            .unwrap();

        let report = set.detect_duplicates(&DuplicateDetector::default());
        assert!(report.groups.is_empty());
    }
}
