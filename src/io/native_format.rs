//! Versioned text format for transaction sets
//!
//! One transaction set per file, comma-separated, with no quoting or escaping.
//!
//! # Layout
//!
//! ```text
//! VersionHash,<hash>,TransactionCheckSum,<i64>[,<last import>]
//! <type>,<description>,<ref1>,<ref2>,<ref3>,<amount>,<yyyy-mm-dd>,<bucket>,<account>,<id>,
//! ...
//! ```
//!
//! The header has exactly 4 fields (legacy files) or 5 (current). Any other
//! shape, or an unknown version hash, means the file is not in this format;
//! that is a "no match", not an error.
//!
//! Body rows carry ten fields and a trailing separator. Free text containing a
//! separator cannot be represented, so commas (and line breaks) are stripped
//! on save with a warning.
//!
//! # Integrity
//!
//! The header checksum (see [`crate::core::checksum`]) is recomputed on every
//! save and verified after every load.

use crate::core::checksum;
use crate::core::TransactionSet;
use crate::io::fields::FieldRow;
use crate::types::{
    is_unset_date, AccountRef, Transaction, TransactionSetError, TransactionType,
};
use chrono::{NaiveDate, NaiveDateTime};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use std::collections::HashSet;
use uuid::Uuid;

/// Version hash identifying the current file layout
pub const VERSION_HASH: &str = "15955E20-A2CC-4C69-AD42-94D84377FC0C";

const VERSION_MARKER: &str = "VersionHash";
const CHECKSUM_MARKER: &str = "TransactionCheckSum";

const LEGACY_HEADER_FIELDS: usize = 4;
const HEADER_FIELDS: usize = 5;
const BODY_FIELDS: usize = 10;

const TYPE_COLUMN: usize = 0;
const DESCRIPTION_COLUMN: usize = 1;
const REFERENCE1_COLUMN: usize = 2;
const REFERENCE2_COLUMN: usize = 3;
const REFERENCE3_COLUMN: usize = 4;
const AMOUNT_COLUMN: usize = 5;
const DATE_COLUMN: usize = 6;
const BUCKET_COLUMN: usize = 7;
const ACCOUNT_COLUMN: usize = 8;
const ID_COLUMN: usize = 9;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parsed header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Checksum declared by the file
    pub checksum: i64,
    /// Last import timestamp (absent in legacy files)
    pub last_import: Option<NaiveDateTime>,
}

/// Whether a first line looks like this format's header
///
/// Only the field count, markers and version hash are inspected.
pub fn taste_test(first_line: &str) -> bool {
    let fields: Vec<&str> = first_line.split(',').collect();
    is_header_shape(&fields)
}

fn is_header_shape(fields: &[&str]) -> bool {
    (fields.len() == LEGACY_HEADER_FIELDS || fields.len() == HEADER_FIELDS)
        && fields[0].trim() == VERSION_MARKER
        && fields[1].trim().eq_ignore_ascii_case(VERSION_HASH)
        && fields[2].trim() == CHECKSUM_MARKER
}

/// Parse the header row
///
/// # Returns
///
/// * `Ok(None)` - The row is not this format's header
/// * `Ok(Some(header))` - The parsed header
/// * `Err(DataFormat)` - The header is recognised but its values are invalid
pub fn parse_header(row: &FieldRow<'_>) -> Result<Option<Header>, TransactionSetError> {
    let fields: Vec<&str> = (0..row.len()).filter_map(|i| row.text(i).ok()).collect();
    if !is_header_shape(&fields) {
        return Ok(None);
    }

    let checksum_text = row.text(3)?.trim();
    let checksum = checksum_text.parse::<i64>().map_err(|_| {
        TransactionSetError::data_format(
            row.line(),
            format!("Invalid checksum '{}' in header", checksum_text),
        )
    })?;

    let last_import = match row.len() {
        HEADER_FIELDS => match row.optional_text(4)? {
            Some(text) => Some(parse_timestamp(text).ok_or_else(|| {
                TransactionSetError::data_format(
                    row.line(),
                    format!("Invalid last import date '{}' in header", text),
                )
            })?),
            None => None,
        },
        _ => None,
    };

    Ok(Some(Header {
        checksum,
        last_import,
    }))
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Read a transaction set from a stream
///
/// The whole stream is parsed before anything is returned; any error rejects
/// the file.
///
/// # Errors
///
/// - `UnsupportedFormat` if the first line is not a recognised header
/// - `DataFormat` / `IndexOutOfRange` for malformed rows, unset dates or ids,
///   and duplicate ids
/// - `ChecksumMismatch` if the declared checksum is neither correct nor the
///   bypass value
pub async fn read<R>(reader: R, storage_key: &str) -> Result<TransactionSet, TransactionSetError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut csv_reader = AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .create_reader(reader);
    let mut records = csv_reader.records();

    let header = match records.next().await {
        Some(record) => {
            let record = record?;
            parse_header(&FieldRow::from_async_record(&record, 1))?
        }
        None => None,
    }
    .ok_or_else(|| TransactionSetError::unsupported_format(storage_key))?;

    let mut transactions = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut line = 1;
    while let Some(record) = records.next().await {
        let record = record?;
        line += 1;
        let row = FieldRow::from_async_record(&record, line);
        if row.is_blank() {
            continue;
        }

        let txn = parse_row(&row)?;
        if !seen_ids.insert(txn.id()) {
            return Err(TransactionSetError::data_format(
                row.line(),
                format!("Duplicate transaction id {}", txn.id()),
            ));
        }
        transactions.push(txn);
    }

    let verdict = checksum::verify(header.checksum, &transactions)?;
    tracing::debug!(
        storage_key,
        count = transactions.len(),
        ?verdict,
        "read transaction set"
    );

    Ok(TransactionSet::from_transactions(
        storage_key,
        transactions,
        header.last_import,
    ))
}

/// Parse one body row
pub fn parse_row(row: &FieldRow<'_>) -> Result<Transaction, TransactionSetError> {
    let trailing_separator = row.len() == BODY_FIELDS + 1 && row.text(BODY_FIELDS)?.is_empty();
    if row.len() != BODY_FIELDS && !trailing_separator {
        return Err(TransactionSetError::data_format(
            row.line(),
            format!(
                "Expected {} fields and a trailing separator, found {} fields",
                BODY_FIELDS,
                row.len()
            ),
        ));
    }

    let date = match row.optional_text(DATE_COLUMN)? {
        Some(_) => row.date(DATE_COLUMN, &[DATE_FORMAT, TIMESTAMP_FORMAT])?,
        None => NaiveDate::MIN,
    };
    if is_unset_date(date) {
        return Err(TransactionSetError::data_format(
            row.line(),
            "Transaction date is not set",
        ));
    }

    let id = match row.optional_text(ID_COLUMN)? {
        Some(_) => row.uuid(ID_COLUMN)?,
        None => Uuid::nil(),
    };
    if id.is_nil() {
        return Err(TransactionSetError::data_format(
            row.line(),
            "Transaction id is not set",
        ));
    }

    let transaction = Transaction::with_id(
        id,
        AccountRef::new(row.text(ACCOUNT_COLUMN)?),
        row.exact_decimal_or_zero(AMOUNT_COLUMN)?,
        date,
        TransactionType::named(row.text(TYPE_COLUMN)?),
    )
    .description(row.text(DESCRIPTION_COLUMN)?)
    .references(
        row.text(REFERENCE1_COLUMN)?,
        row.text(REFERENCE2_COLUMN)?,
        row.text(REFERENCE3_COLUMN)?,
    )
    .bucket(row.optional_text(BUCKET_COLUMN)?.map(str::to_string));

    Ok(transaction)
}

/// Serialise a transaction set
///
/// The checksum is recomputed from the set being written.
///
/// # Errors
///
/// Returns `TransactionCountMismatch`, before anything is produced, if any
/// transaction cannot be written as a row that would load again (an unset
/// date or identifier).
pub fn write(set: &TransactionSet) -> Result<Vec<u8>, TransactionSetError> {
    let rows: Vec<[String; BODY_FIELDS]> = set
        .all_transactions()
        .iter()
        .filter_map(|txn| to_row(txn, set.storage_key()))
        .collect();

    if rows.len() != set.len() {
        return Err(TransactionSetError::TransactionCountMismatch {
            expected: set.len(),
            actual: rows.len(),
        });
    }

    let checksum = checksum::compute(set.all_transactions());
    let last_import = set
        .last_import()
        .map(|stamp| stamp.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default();

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());

    writer.write_record([
        VERSION_MARKER,
        VERSION_HASH,
        CHECKSUM_MARKER,
        &checksum.to_string(),
        &last_import,
    ])?;
    for row in &rows {
        writer.write_record(row.iter().map(String::as_str).chain(std::iter::once("")))?;
    }

    writer.into_inner().map_err(|e| TransactionSetError::Io {
        message: format!("Failed to flush transaction set: {}", e),
    })
}

fn to_row(txn: &Transaction, storage_key: &str) -> Option<[String; BODY_FIELDS]> {
    if is_unset_date(txn.date) || txn.id().is_nil() {
        tracing::error!(
            storage_key,
            id = %txn.id(),
            date = %txn.date,
            "transaction has no date or identifier and cannot be saved"
        );
        return None;
    }

    let mut amount = txn.amount;
    if amount.scale() < 2 {
        amount.rescale(2);
    }

    Some([
        sanitize(txn.transaction_type.name(), "type", txn, storage_key),
        sanitize(&txn.description, "description", txn, storage_key),
        sanitize(&txn.reference1, "reference1", txn, storage_key),
        sanitize(&txn.reference2, "reference2", txn, storage_key),
        sanitize(&txn.reference3, "reference3", txn, storage_key),
        amount.to_string(),
        txn.date.format(DATE_FORMAT).to_string(),
        sanitize(txn.bucket.as_deref().unwrap_or(""), "bucket", txn, storage_key),
        sanitize(txn.account.as_str(), "account", txn, storage_key),
        txn.id().to_string(),
    ])
}

/// Strip characters the format cannot represent
fn sanitize(value: &str, field: &str, txn: &Transaction, storage_key: &str) -> String {
    if !value.contains([',', '\r', '\n']) {
        return value.to_string();
    }

    tracing::warn!(
        storage_key,
        id = %txn.id(),
        field,
        "stripping separators from free text before saving"
    );
    value
        .replace(',', "")
        .replace(['\r', '\n'], " ")
}
