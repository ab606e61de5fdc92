//! Westpac cheque account export
//!
//! Recognised by its header row, which is skipped on load:
//!
//! ```text
//! Bank Account,Date,Narrative,Debit Amount,Credit Amount,Balance,Categories,Serial
//! ```
//!
//! Debits and credits are exported as positive values in separate columns;
//! at most one of them may be set on a row.

use crate::core::TransactionSet;
use crate::import::{first_line_fields, load_rows};
use crate::io::fields::FieldRow;
use crate::types::{AccountRef, Transaction, TransactionSetError, TransactionType};
use futures::io::AsyncRead;

const HEADER: [&str; 8] = [
    "Bank Account",
    "Date",
    "Narrative",
    "Debit Amount",
    "Credit Amount",
    "Balance",
    "Categories",
    "Serial",
];

const BANK_ACCOUNT_COLUMN: usize = 0;
const DATE_COLUMN: usize = 1;
const NARRATIVE_COLUMN: usize = 2;
const DEBIT_COLUMN: usize = 3;
const CREDIT_COLUMN: usize = 4;
const CATEGORIES_COLUMN: usize = 6;
const SERIAL_COLUMN: usize = 7;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y"];

/// Whether a first line is the Westpac export header
pub fn taste_test(first_line: &str) -> bool {
    first_line_fields(first_line).is_some_and(|record| {
        record.len() == HEADER.len()
            && record
                .iter()
                .zip(HEADER)
                .all(|(field, expected)| field.eq_ignore_ascii_case(expected))
    })
}

/// Load every row of a Westpac export
pub async fn load<R>(
    reader: R,
    storage_key: &str,
    account: &AccountRef,
) -> Result<TransactionSet, TransactionSetError>
where
    R: AsyncRead + Unpin + Send,
{
    load_rows(reader, storage_key, 1, |row| parse_row(row, account)).await
}

fn parse_row(row: &FieldRow<'_>, account: &AccountRef) -> Result<Transaction, TransactionSetError> {
    let debit = row.decimal_or_zero(DEBIT_COLUMN)?.abs();
    let credit = row.decimal_or_zero(CREDIT_COLUMN)?.abs();
    if !debit.is_zero() && !credit.is_zero() {
        return Err(TransactionSetError::data_format(
            row.line(),
            format!("Both debit ({}) and credit ({}) are set", debit, credit),
        ));
    }

    Ok(Transaction::new(
        account.clone(),
        credit - debit,
        row.date(DATE_COLUMN, DATE_FORMATS)?,
        TransactionType::named(row.text(CATEGORIES_COLUMN)?),
    )
    .description(row.text(NARRATIVE_COLUMN)?)
    .references(row.text(SERIAL_COLUMN)?, row.text(BANK_ACCOUNT_COLUMN)?, ""))
}
