//! Fixed-position field access for comma-separated rows
//!
//! Every reader in this crate maps columns by position. `FieldRow` wraps one
//! parsed row and converts individual columns to their expected types,
//! producing structured errors that carry the row's line number. Asking for a
//! column the row does not have is an `IndexOutOfRange` error, never a silent
//! default.

use crate::types::TransactionSetError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

/// One parsed row plus the line it came from
#[derive(Debug, Clone)]
pub struct FieldRow<'a> {
    fields: Vec<&'a str>,
    line: u64,
}

impl<'a> FieldRow<'a> {
    /// Wrap already-split fields
    pub fn new(fields: Vec<&'a str>, line: u64) -> Self {
        FieldRow { fields, line }
    }

    /// Wrap a record produced by the async CSV reader
    pub fn from_async_record(record: &'a csv_async::StringRecord, fallback_line: u64) -> Self {
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(fallback_line);
        FieldRow::new(record.iter().collect(), line)
    }

    /// Wrap a record produced by the sync CSV reader
    pub fn from_record(record: &'a csv::StringRecord, fallback_line: u64) -> Self {
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(fallback_line);
        FieldRow::new(record.iter().collect(), line)
    }

    /// Number of fields on the row
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether every field is blank
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|field| field.trim().is_empty())
    }

    /// Line number of the row (1-based)
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Raw text of a column
    pub fn text(&self, index: usize) -> Result<&'a str, TransactionSetError> {
        self.fields
            .get(index)
            .copied()
            .ok_or_else(|| TransactionSetError::index_out_of_range(self.line, index, self.len()))
    }

    /// Trimmed text of a column, `None` when blank
    pub fn optional_text(&self, index: usize) -> Result<Option<&'a str>, TransactionSetError> {
        let text = self.text(index)?.trim();
        Ok((!text.is_empty()).then_some(text))
    }

    /// A decimal column
    pub fn decimal(&self, index: usize) -> Result<Decimal, TransactionSetError> {
        let text = self.text(index)?.trim();
        parse_decimal(text).ok_or_else(|| {
            TransactionSetError::data_format(
                self.line,
                format!("Invalid amount '{}' in column {}", text, index),
            )
        })
    }

    /// A decimal column where blank means zero
    pub fn decimal_or_zero(&self, index: usize) -> Result<Decimal, TransactionSetError> {
        if self.optional_text(index)?.is_none() {
            return Ok(Decimal::ZERO);
        }
        self.decimal(index)
    }

    /// A plain decimal column where blank means zero
    ///
    /// Unlike [`FieldRow::decimal`], currency symbols and digit grouping are
    /// rejected.
    pub fn exact_decimal_or_zero(&self, index: usize) -> Result<Decimal, TransactionSetError> {
        let Some(text) = self.optional_text(index)? else {
            return Ok(Decimal::ZERO);
        };
        Decimal::from_str(text).map_err(|_| {
            TransactionSetError::data_format(
                self.line,
                format!("Invalid amount '{}' in column {}", text, index),
            )
        })
    }

    /// A date column, trying each format in turn
    pub fn date(&self, index: usize, formats: &[&str]) -> Result<NaiveDate, TransactionSetError> {
        let text = self.text(index)?.trim();
        parse_date(text, formats).ok_or_else(|| {
            TransactionSetError::data_format(
                self.line,
                format!("Invalid date '{}' in column {}", text, index),
            )
        })
    }

    /// An identifier column
    pub fn uuid(&self, index: usize) -> Result<Uuid, TransactionSetError> {
        let text = self.text(index)?.trim();
        Uuid::parse_str(text).map_err(|_| {
            TransactionSetError::data_format(
                self.line,
                format!("Invalid transaction id '{}' in column {}", text, index),
            )
        })
    }
}

/// Parse a decimal amount
///
/// Accepts an optional currency symbol and thousands separators inside
/// quoted bank fields (`"$1,234.50"`).
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Parse a date using the first format that matches
pub fn parse_date(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(fields: &[&'static str]) -> FieldRow<'static> {
        FieldRow::new(fields.to_vec(), 4)
    }

    #[test]
    fn test_text_out_of_range() {
        let r = row(&["a", "b"]);
        assert_eq!(r.text(1).unwrap(), "b");
        assert_eq!(
            r.text(5),
            Err(TransactionSetError::IndexOutOfRange {
                line: 4,
                index: 5,
                available: 2
            })
        );
    }

    #[rstest]
    #[case::plain("-95.15", Some(Decimal::new(-9515, 2)))]
    #[case::whitespace("  12.5 ", Some(Decimal::new(125, 1)))]
    #[case::currency_and_thousands("$1,234.50", Some(Decimal::new(123450, 2)))]
    #[case::blank("", None)]
    #[case::text("abc", None)]
    fn test_parse_decimal(#[case] text: &str, #[case] expected: Option<Decimal>) {
        assert_eq!(parse_decimal(text), expected);
    }

    #[rstest]
    #[case::iso("2013-08-15", &["%Y-%m-%d"], Some((2013, 8, 15)))]
    #[case::iso_with_time("2013-08-15T10:11:12", &["%Y-%m-%d", "%Y-%m-%dT%H:%M:%S"], Some((2013, 8, 15)))]
    #[case::day_first("05/03/2024", &["%d/%m/%Y"], Some((2024, 3, 5)))]
    #[case::invalid("31/02/2024", &["%d/%m/%Y"], None)]
    #[case::blank("", &["%Y-%m-%d"], None)]
    fn test_parse_date(
        #[case] text: &str,
        #[case] formats: &[&str],
        #[case] expected: Option<(i32, u32, u32)>,
    ) {
        let expected = expected.map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(parse_date(text, formats), expected);
    }

    #[test]
    fn test_decimal_or_zero() {
        let r = row(&["", "1.00", "x"]);
        assert_eq!(r.decimal_or_zero(0).unwrap(), Decimal::ZERO);
        assert_eq!(r.decimal_or_zero(1).unwrap(), Decimal::new(100, 2));
        assert!(matches!(
            r.decimal_or_zero(2),
            Err(TransactionSetError::DataFormat { line: Some(4), .. })
        ));
    }

    #[rstest]
    #[case::blank("", Some(Decimal::ZERO))]
    #[case::plain("-95.15", Some(Decimal::new(-9515, 2)))]
    #[case::padded(" 12.50 ", Some(Decimal::new(1250, 2)))]
    #[case::currency("$12.00", None)]
    #[case::spaced_digits("$ 1 2", None)]
    #[case::inner_space("1 2", None)]
    fn test_exact_decimal_or_zero(#[case] text: &'static str, #[case] expected: Option<Decimal>) {
        let result = row(&[text]).exact_decimal_or_zero(0);
        match expected {
            Some(amount) => assert_eq!(result.unwrap(), amount),
            None => assert!(matches!(
                result,
                Err(TransactionSetError::DataFormat { line: Some(4), .. })
            )),
        }
    }

    #[test]
    fn test_optional_text_and_uuid() {
        let id = Uuid::new_v4().to_string();
        let fields = vec!["  ", "FOOD", id.as_str()];
        let r = FieldRow::new(fields, 2);
        assert_eq!(r.optional_text(0).unwrap(), None);
        assert_eq!(r.optional_text(1).unwrap(), Some("FOOD"));
        assert_eq!(r.uuid(2).unwrap().to_string(), id);
        assert!(r.uuid(1).is_err());
    }
}
