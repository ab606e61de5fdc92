//! Human-readable CSV output of transactions
//!
//! Used by the command line to print listings. This is a report, not a storage
//! format: it carries a header row, quotes free text as needed and is never
//! read back.

use crate::types::{Transaction, TransactionSetError};
use serde::Serialize;
use std::io::Write;

/// One output row
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    date: String,
    account: &'a str,
    #[serde(rename = "type")]
    transaction_type: &'a str,
    description: &'a str,
    amount: String,
    bucket: &'a str,
    duplicate: bool,
    id: String,
}

impl<'a> From<&'a Transaction> for ReportRow<'a> {
    fn from(txn: &'a Transaction) -> Self {
        ReportRow {
            date: txn.date.format("%Y-%m-%d").to_string(),
            account: txn.account.as_str(),
            transaction_type: txn.transaction_type.name(),
            description: &txn.description,
            amount: format!("{:.2}", txn.amount),
            bucket: txn.bucket.as_deref().unwrap_or(""),
            duplicate: txn.is_suspected_duplicate(),
            id: txn.id().to_string(),
        }
    }
}

/// Write transactions in CSV format
///
/// Columns: date, account, type, description, amount, bucket, duplicate, id.
/// Rows are written in the order given.
///
/// # Arguments
///
/// * `transactions` - Transactions to write
/// * `output` - Destination writer
///
/// # Errors
///
/// Returns `Io` if a write or flush fails.
pub fn write_transactions_csv<'a, I>(
    transactions: I,
    output: &mut dyn Write,
) -> Result<(), TransactionSetError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut writer = csv::Writer::from_writer(output);

    for txn in transactions {
        writer.serialize(ReportRow::from(txn))?;
    }

    writer.flush()?;
    Ok(())
}
