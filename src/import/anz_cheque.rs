//! ANZ cheque account export
//!
//! Headerless, nine columns (some exports add a tenth, always empty):
//!
//! ```text
//! Type,Details,Particulars,Code,Reference,Amount,Date,ForeignCurrencyAmount,ConversionCharge
//! ```
//!
//! Amounts are signed as exported and dates are `dd/mm/yyyy`. The export uses
//! one type name for both directions of a transfer, so every type accepts
//! either sign.

use crate::core::TransactionSet;
use crate::import::{first_line_fields, load_rows};
use crate::io::fields::{parse_date, parse_decimal, FieldRow};
use crate::types::{
    is_unset_date, AccountRef, SignConvention, Transaction, TransactionSetError, TransactionType,
};
use futures::io::AsyncRead;

const TYPE_COLUMN: usize = 0;
const DETAILS_COLUMN: usize = 1;
const PARTICULARS_COLUMN: usize = 2;
const CODE_COLUMN: usize = 3;
const REFERENCE_COLUMN: usize = 4;
const AMOUNT_COLUMN: usize = 5;
const DATE_COLUMN: usize = 6;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y"];

/// Whether a first line looks like an ANZ cheque export row
pub fn taste_test(first_line: &str) -> bool {
    let Some(record) = first_line_fields(first_line) else {
        return false;
    };
    if record.len() != 9 && !(record.len() == 10 && record[9].is_empty()) {
        return false;
    }

    let kind = &record[TYPE_COLUMN];
    !kind.is_empty()
        && parse_decimal(kind).is_none()
        && parse_decimal(&record[AMOUNT_COLUMN]).is_some_and(|amount| !amount.is_zero())
        && parse_date(&record[DATE_COLUMN], DATE_FORMATS).is_some_and(|date| !is_unset_date(date))
}

/// Load every row of an ANZ cheque export
pub async fn load<R>(
    reader: R,
    storage_key: &str,
    account: &AccountRef,
) -> Result<TransactionSet, TransactionSetError>
where
    R: AsyncRead + Unpin + Send,
{
    load_rows(reader, storage_key, 0, |row| parse_row(row, account)).await
}

fn parse_row(
    row: &FieldRow<'_>,
    account: &AccountRef,
) -> Result<Transaction, TransactionSetError> {
    let amount = row.decimal(AMOUNT_COLUMN)?;
    let date = row.date(DATE_COLUMN, DATE_FORMATS)?;
    let transaction_type = TransactionType::new(row.text(TYPE_COLUMN)?, SignConvention::Either);

    Ok(
        Transaction::new(account.clone(), amount, date, transaction_type)
            .description(row.text(DETAILS_COLUMN)?)
            .references(
                row.text(PARTICULARS_COLUMN)?,
                row.text(CODE_COLUMN)?,
                row.text(REFERENCE_COLUMN)?,
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use futures::io::Cursor;
    use rstest::rstest;
    use rust_decimal::Decimal;

    async fn load_str(text: &str) -> Result<TransactionSet, TransactionSetError> {
        load(Cursor::new(text.as_bytes()), "anz.csv", &AccountRef::new("CHEQUE")).await
    }

    #[rstest]
    #[case::typical("Payment,Power Co,INV1,,,-95.15,10/08/2013,,", true)]
    #[case::ten_columns("Payment,Power Co,INV1,,,-95.15,10/08/2013,,,", true)]
    #[case::quoted_amount("Salary,Employer,,,,\"2,500.00\",01/08/2013,,", true)]
    #[case::numeric_type("123,Power Co,INV1,,,-95.15,10/08/2013,,", false)]
    #[case::blank_type(",Power Co,INV1,,,-95.15,10/08/2013,,", false)]
    #[case::zero_amount("Payment,Power Co,INV1,,,0.00,10/08/2013,,", false)]
    #[case::iso_date("Payment,Power Co,INV1,,,-95.15,2013-08-10,,", false)]
    #[case::sentinel_date("Payment,Power Co,INV1,,,-95.15,01/01/0001,,", false)]
    #[case::eight_columns("Payment,Power Co,INV1,,,-95.15,10/08/2013,", false)]
    #[case::header_row("Type,Details,Particulars,Code,Reference,Amount,Date,ForeignCurrencyAmount,ConversionCharge", false)]
    fn test_taste_test(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(taste_test(line), expected);
    }

    #[tokio::test]
    async fn test_load() {
        let set = load_str(
            "Payment,Power Co,INV1,CODE,REF,-95.15,10/08/2013,,\n\
             Salary,Employer,,,,\"2,500.00\",01/08/2013,,\n",
        )
        .await
        .unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.last_import().is_some());

        let salary = &set.all_transactions()[0];
        assert_eq!(salary.amount, Decimal::new(250000, 2));
        assert_eq!(salary.date, NaiveDate::from_ymd_opt(2013, 8, 1).unwrap());

        let payment = &set.all_transactions()[1];
        assert_eq!(payment.description, "Power Co");
        assert_eq!(payment.reference1, "INV1");
        assert_eq!(payment.reference2, "CODE");
        assert_eq!(payment.reference3, "REF");
        assert_eq!(payment.account, AccountRef::new("CHEQUE"));
        assert_eq!(payment.bucket, None);
    }

    #[tokio::test]
    async fn test_same_type_name_accepts_either_sign() {
        let set = load_str(
            "Transfer,Out,,,,-10.00,01/08/2013,,\n\
             Transfer,In,,,,25.00,02/08/2013,,\n",
        )
        .await
        .unwrap();

        let all = set.all_transactions();
        assert_eq!(all[0].transaction_type, all[1].transaction_type);
        assert_eq!(all[1].amount, Decimal::new(2500, 2));
        for txn in all {
            assert_eq!(txn.transaction_type.sign(), SignConvention::Either);
            assert!(txn.transaction_type.sign().accepts(txn.amount));
        }
    }

    #[tokio::test]
    async fn test_short_row_rejects_file() {
        let result = load_str(
            "Payment,Power Co,INV1,,,-95.15,10/08/2013,,\n\
             Payment,Power Co,INV1,,,-95.15\n",
        )
        .await;
        assert_eq!(
            result.unwrap_err(),
            TransactionSetError::IndexOutOfRange {
                line: 2,
                index: DATE_COLUMN,
                available: 6
            }
        );
    }

    #[tokio::test]
    async fn test_bad_amount_rejects_file() {
        let result = load_str("Payment,Power Co,,,,lots,10/08/2013,,\n").await;
        assert!(matches!(
            result,
            Err(TransactionSetError::DataFormat { line: Some(1), .. })
        ));
    }
}
