//! Duplicate detection by structural equality
//!
//! Transactions are grouped by their [`DuplicateKey`]: every business field
//! except the identifier. Any group with more than one member is reported.
//! Nothing is ever removed; callers decide what to do with the groups.
//!
//! # Parallel Grouping
//!
//! Key extraction is pure per transaction, so large inputs are split into
//! chunks and grouped on scoped worker threads. Each worker inserts into a
//! shared `DashMap`; the grouped map is the only shared state. Sequential and
//! parallel grouping produce the same groups in the same order.

use crate::config::EngineConfig;
use crate::types::{DuplicateKey, Transaction, TransactionId};
use dashmap::DashMap;
use std::collections::HashMap;

/// Groups of identifiers flagged as suspected duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    /// Each group holds the identifiers of structurally identical transactions,
    /// in date order
    pub groups: Vec<Vec<TransactionId>>,
}

impl DuplicateReport {
    /// Total number of flagged transactions
    pub fn flagged_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// Groups transactions by structural key
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    /// Inputs at least this large are grouped in parallel
    parallel_threshold: usize,
    /// Number of worker threads for parallel grouping
    workers: usize,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        DuplicateDetector::from_config(&EngineConfig::default())
    }
}

impl DuplicateDetector {
    /// Create a detector from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        DuplicateDetector {
            parallel_threshold: config.parallel_dedup_threshold,
            workers: config.worker_threads,
        }
    }

    /// Find groups of structurally identical transactions
    ///
    /// # Returns
    ///
    /// Groups of positions into `transactions`, each with more than one
    /// member. Positions within a group are ascending; groups are ordered by
    /// their first member.
    pub fn group(&self, transactions: &[&Transaction]) -> Vec<Vec<usize>> {
        let groups = if self.workers > 1 && transactions.len() >= self.parallel_threshold {
            tracing::debug!(
                count = transactions.len(),
                workers = self.workers,
                "grouping duplicates in parallel"
            );
            self.group_parallel(transactions)
        } else {
            group_sequential(transactions)
        };

        let mut duplicates: Vec<Vec<usize>> = groups
            .into_iter()
            .filter(|group| group.len() > 1)
            .map(|mut group| {
                group.sort_unstable();
                group
            })
            .collect();
        duplicates.sort_unstable_by_key(|group| group[0]);
        duplicates
    }

    fn group_parallel(&self, transactions: &[&Transaction]) -> Vec<Vec<usize>> {
        let grouped: DashMap<DuplicateKey, Vec<usize>> = DashMap::new();
        let chunk_size = transactions.len().div_ceil(self.workers).max(1);

        std::thread::scope(|scope| {
            for (chunk_index, chunk) in transactions.chunks(chunk_size).enumerate() {
                let grouped = &grouped;
                scope.spawn(move || {
                    let offset = chunk_index * chunk_size;
                    for (i, txn) in chunk.iter().enumerate() {
                        grouped
                            .entry(txn.duplicate_key())
                            .or_default()
                            .push(offset + i);
                    }
                });
            }
        });

        grouped.into_iter().map(|(_, positions)| positions).collect()
    }
}

fn group_sequential(transactions: &[&Transaction]) -> Vec<Vec<usize>> {
    let mut grouped: HashMap<DuplicateKey, Vec<usize>> = HashMap::new();
    for (position, txn) in transactions.iter().enumerate() {
        grouped.entry(txn.duplicate_key()).or_default().push(position);
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountRef, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn txn(cents: i64, day: u32, description: &str) -> Transaction {
        Transaction::new(
            AccountRef::new("CHEQUE"),
            Decimal::new(cents, 2),
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            TransactionType::named("Payment"),
        )
        .description(description)
    }

    fn sequential() -> DuplicateDetector {
        DuplicateDetector {
            parallel_threshold: usize::MAX,
            workers: 1,
        }
    }

    fn parallel() -> DuplicateDetector {
        DuplicateDetector {
            parallel_threshold: 0,
            workers: 4,
        }
    }

    #[test]
    fn test_identical_except_id_are_grouped() {
        let a = txn(-1000, 5, "Coffee");
        let b = a.clone_with_new_id();
        let c = txn(-1000, 5, "Tea");
        let refs = vec![&a, &c, &b];

        assert_eq!(sequential().group(&refs), vec![vec![0, 2]]);
    }

    #[test]
    fn test_unique_description_never_grouped() {
        let items: Vec<_> = (1..=5).map(|d| txn(-1000, d, &format!("shop {}", d))).collect();
        let refs: Vec<_> = items.iter().collect();
        assert!(sequential().group(&refs).is_empty());
    }

    #[test]
    fn test_group_of_three() {
        let a = txn(-1000, 5, "Coffee");
        let b = a.clone_with_new_id();
        let c = a.clone_with_new_id();
        let refs = vec![&a, &b, &c];
        assert_eq!(sequential().group(&refs), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut items = Vec::new();
        for i in 0..200u32 {
            let t = txn(-(i as i64 % 17) * 100, i % 28 + 1, &format!("shop {}", i % 13));
            items.push(t);
        }
        let extra: Vec<_> = items.iter().step_by(7).map(Transaction::clone_with_new_id).collect();
        items.extend(extra);
        let refs: Vec<_> = items.iter().collect();

        let expected = sequential().group(&refs);
        assert!(!expected.is_empty());
        assert_eq!(parallel().group(&refs), expected);
    }

    #[test]
    fn test_flagged_count() {
        let report = DuplicateReport {
            groups: vec![vec![uuid::Uuid::new_v4(); 2], vec![uuid::Uuid::new_v4(); 3]],
        };
        assert_eq!(report.flagged_count(), 5);
    }
}
