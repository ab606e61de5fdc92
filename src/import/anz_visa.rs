//! ANZ Visa credit card export
//!
//! Headerless, eight columns:
//!
//! ```text
//! Card,Type,Amount,Details,TransactionDate,ProcessedDate,ForeignCurrencyAmount,ConversionCharge
//! ```
//!
//! The exported amount is unsigned; the sign comes from the type code
//! (`D` debit is negated, `C` credit stays positive).

use crate::core::TransactionSet;
use crate::import::{first_line_fields, load_rows};
use crate::io::fields::{parse_date, parse_decimal, FieldRow};
use crate::types::{
    is_unset_date, AccountRef, SignConvention, Transaction, TransactionSetError, TransactionType,
};
use futures::io::AsyncRead;

const CARD_COLUMN: usize = 0;
const CODE_COLUMN: usize = 1;
const AMOUNT_COLUMN: usize = 2;
const DETAILS_COLUMN: usize = 3;
const DATE_COLUMN: usize = 4;
const COLUMNS: usize = 8;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y"];

const DEBIT_CODE: &str = "D";
const CREDIT_CODE: &str = "C";

/// Whether a first line looks like an ANZ Visa export row
pub fn taste_test(first_line: &str) -> bool {
    let Some(record) = first_line_fields(first_line) else {
        return false;
    };

    record.len() == COLUMNS
        && !record[CARD_COLUMN].is_empty()
        && sign_for_code(&record[CODE_COLUMN]).is_some()
        && parse_decimal(&record[AMOUNT_COLUMN]).is_some_and(|amount| !amount.is_zero())
        && parse_date(&record[DATE_COLUMN], DATE_FORMATS).is_some_and(|date| !is_unset_date(date))
}

fn sign_for_code(code: &str) -> Option<SignConvention> {
    if code.eq_ignore_ascii_case(DEBIT_CODE) {
        Some(SignConvention::Debit)
    } else if code.eq_ignore_ascii_case(CREDIT_CODE) {
        Some(SignConvention::Credit)
    } else {
        None
    }
}

/// Load every row of an ANZ Visa export
pub async fn load<R>(
    reader: R,
    storage_key: &str,
    account: &AccountRef,
) -> Result<TransactionSet, TransactionSetError>
where
    R: AsyncRead + Unpin + Send,
{
    let debit = TransactionType::new("Credit Card Debit", SignConvention::Debit);
    let credit = TransactionType::new("Credit Card Credit", SignConvention::Credit);

    load_rows(reader, storage_key, 0, |row| {
        let code = row.text(CODE_COLUMN)?.trim();
        let transaction_type = match sign_for_code(code) {
            Some(SignConvention::Debit) => &debit,
            Some(SignConvention::Credit) => &credit,
            _ => {
                return Err(TransactionSetError::data_format(
                    row.line(),
                    format!("Unknown debit/credit code '{}'", code),
                ))
            }
        };
        parse_row(row, account, transaction_type)
    })
    .await
}

fn parse_row(
    row: &FieldRow<'_>,
    account: &AccountRef,
    transaction_type: &TransactionType,
) -> Result<Transaction, TransactionSetError> {
    let magnitude = row.decimal(AMOUNT_COLUMN)?.abs();
    let amount = match transaction_type.sign() {
        SignConvention::Debit => -magnitude,
        _ => magnitude,
    };
    if !transaction_type.sign().accepts(amount) {
        return Err(TransactionSetError::data_format(
            row.line(),
            format!(
                "Amount {} does not match type '{}'",
                amount,
                transaction_type.name()
            ),
        ));
    }

    Ok(Transaction::new(
        account.clone(),
        amount,
        row.date(DATE_COLUMN, DATE_FORMATS)?,
        transaction_type.clone(),
    )
    .description(row.text(DETAILS_COLUMN)?)
    .references(row.text(CARD_COLUMN)?, "", ""))
}
