//! Tamper-detection checksum over a set of transactions
//!
//! The checksum is a rolling 64-bit hash of every amount in file order:
//!
//! ```text
//! acc = 37 * 397
//! for each transaction: acc = (acc + cents(amount)) * 829
//! ```
//!
//! All arithmetic wraps silently on overflow, exactly like two's-complement
//! 64-bit integers. `cents` rounds `amount * 100` half-to-even and truncates the
//! result to 64 bits, so writers and readers always agree on fractional cents.
//!
//! A stored checksum of exactly [`CHECKSUM_BYPASS`] disables verification for
//! hand-edited files.

use crate::types::{Transaction, TransactionSetError};
use rust_decimal::{Decimal, RoundingStrategy};

/// Stored checksum value that skips verification
pub const CHECKSUM_BYPASS: i64 = 1;

const SEED: i64 = 37;
const SEED_MULTIPLIER: i64 = 397;
const ROW_MULTIPLIER: i64 = 829;

/// Outcome of verifying a stored checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumVerdict {
    /// Stored and recomputed values agree
    Valid,
    /// The stored value was the bypass value; nothing was compared
    Bypassed,
}

/// Compute the checksum of transactions in the order given
pub fn compute<'a, I>(transactions: I) -> i64
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .fold(SEED.wrapping_mul(SEED_MULTIPLIER), |acc, txn| {
            acc.wrapping_add(amount_in_cents(txn.amount))
                .wrapping_mul(ROW_MULTIPLIER)
        })
}

/// Verify a stored checksum against transactions in file order
///
/// # Returns
///
/// * `Ok(ChecksumVerdict::Bypassed)` if `expected` is the bypass value
/// * `Ok(ChecksumVerdict::Valid)` if the values agree
/// * `Err(TransactionSetError::ChecksumMismatch)` otherwise, carrying both values
pub fn verify<'a, I>(expected: i64, transactions: I) -> Result<ChecksumVerdict, TransactionSetError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    if expected == CHECKSUM_BYPASS {
        return Ok(ChecksumVerdict::Bypassed);
    }

    let actual = compute(transactions);
    if actual == expected {
        Ok(ChecksumVerdict::Valid)
    } else {
        Err(TransactionSetError::ChecksumMismatch { expected, actual })
    }
}

/// Integer cents of an amount, rounded half-to-even and wrapped to 64 bits
fn amount_in_cents(amount: Decimal) -> i64 {
    let scaled = amount.checked_mul(Decimal::ONE_HUNDRED).unwrap_or(if amount.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    });
    let mut cents = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    cents.rescale(0);
    // i128 -> i64 keeps the low 64 bits
    cents.mantissa() as i64
}
