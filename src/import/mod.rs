//! Format detection and import of transaction files
//!
//! Every readable file format is one [`ImportFormat`] variant: the native
//! transaction set format plus one variant per supported bank export. The
//! [`ImportRegistry`] tries each format's taste test in a fixed order and
//! hands the file to the first one that recognises it.
//!
//! # Taste tests
//!
//! A taste test looks only at the first line of a file (at most
//! [`TASTE_PREFIX_BYTES`](crate::io::storage::TASTE_PREFIX_BYTES)). It never
//! fails: anything it cannot make sense of is simply "not this format".
//!
//! # Order
//!
//! The native format is tried first so a transaction set file is never
//! mistaken for a bank export.

pub mod anz_cheque;
pub mod anz_visa;
pub mod westpac_cheque;

use crate::core::TransactionSet;
use crate::io::fields::FieldRow;
use crate::io::native_format;
use crate::io::storage::{read_first_line, BoxedReader, ReaderWriter};
use crate::types::{AccountRef, Transaction, TransactionSetError};
use chrono::{Local, NaiveDateTime, Timelike};
use csv_async::{AsyncReaderBuilder, Trim};
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use std::fmt;

/// A file format the registry can recognise and load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportFormat {
    /// The native versioned transaction set format
    TransactionSet,
    /// ANZ cheque account export
    AnzCheque,
    /// ANZ Visa credit card export
    AnzVisa,
    /// Westpac cheque account export
    WestpacCheque,
}

impl ImportFormat {
    /// Every format, in trial order
    pub const ALL: [ImportFormat; 4] = [
        ImportFormat::TransactionSet,
        ImportFormat::AnzCheque,
        ImportFormat::AnzVisa,
        ImportFormat::WestpacCheque,
    ];

    /// Human-readable format name
    pub fn name(&self) -> &'static str {
        match self {
            ImportFormat::TransactionSet => "Transaction set",
            ImportFormat::AnzCheque => "ANZ cheque account",
            ImportFormat::AnzVisa => "ANZ Visa",
            ImportFormat::WestpacCheque => "Westpac cheque account",
        }
    }

    /// Whether the first line of a file matches this format
    pub fn taste_test(&self, first_line: &str) -> bool {
        let matched = match self {
            ImportFormat::TransactionSet => native_format::taste_test(first_line),
            ImportFormat::AnzCheque => anz_cheque::taste_test(first_line),
            ImportFormat::AnzVisa => anz_visa::taste_test(first_line),
            ImportFormat::WestpacCheque => westpac_cheque::taste_test(first_line),
        };
        if !matched {
            tracing::debug!(format = self.name(), "taste test rejected first line");
        }
        matched
    }

    /// Parse a whole file in this format
    ///
    /// Bank exports assign `account` to every transaction; the native format
    /// carries its own accounts and ignores it.
    pub async fn load(
        &self,
        reader: BoxedReader,
        storage_key: &str,
        account: &AccountRef,
    ) -> Result<TransactionSet, TransactionSetError> {
        match self {
            ImportFormat::TransactionSet => native_format::read(reader, storage_key).await,
            ImportFormat::AnzCheque => anz_cheque::load(reader, storage_key, account).await,
            ImportFormat::AnzVisa => anz_visa::load(reader, storage_key, account).await,
            ImportFormat::WestpacCheque => westpac_cheque::load(reader, storage_key, account).await,
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered list of formats tried when importing a file
#[derive(Debug, Clone)]
pub struct ImportRegistry {
    formats: Vec<ImportFormat>,
}

impl Default for ImportRegistry {
    fn default() -> Self {
        ImportRegistry {
            formats: ImportFormat::ALL.to_vec(),
        }
    }
}

impl ImportRegistry {
    /// Registry with every supported format
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry trying only the given formats, in the given order
    pub fn with_formats(formats: Vec<ImportFormat>) -> Self {
        ImportRegistry { formats }
    }

    /// Registered formats in trial order
    pub fn formats(&self) -> &[ImportFormat] {
        &self.formats
    }

    /// The first registered format whose taste test accepts a file
    ///
    /// # Returns
    ///
    /// * `Ok(Some(format))` - A format recognised the file
    /// * `Ok(None)` - No format recognised the file (including empty or
    ///   unreadable prefixes)
    ///
    /// # Errors
    ///
    /// Returns `NotFound` (or `Io`) if the file cannot be opened at all.
    pub async fn detect(
        &self,
        io: &dyn ReaderWriter,
        storage_key: &str,
    ) -> Result<Option<ImportFormat>, TransactionSetError> {
        let reader = io.open_reader(storage_key).await?;
        let first_line = match read_first_line(reader).await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::debug!(storage_key, error = %e, "could not read first line");
                return Ok(None);
            }
        };

        Ok(self
            .formats
            .iter()
            .copied()
            .find(|format| format.taste_test(&first_line)))
    }

    /// Whether any registered format recognises a file
    ///
    /// Never fails; a missing or unreadable file is simply not importable.
    pub async fn can_import(&self, io: &dyn ReaderWriter, storage_key: &str) -> bool {
        matches!(self.detect(io, storage_key).await, Ok(Some(_)))
    }

    /// Load a file with the first format that recognises it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `UnsupportedFormat` if no registered format recognises it
    /// - Any error of the chosen format's loader
    pub async fn import(
        &self,
        io: &dyn ReaderWriter,
        storage_key: &str,
        account: &AccountRef,
    ) -> Result<TransactionSet, TransactionSetError> {
        let format = self
            .detect(io, storage_key)
            .await?
            .ok_or_else(|| TransactionSetError::unsupported_format(storage_key))?;

        tracing::debug!(storage_key, %format, "loading file");
        let reader = io.open_reader(storage_key).await?;
        format.load(reader, storage_key, account).await
    }
}

/// Split a first line into trimmed fields, honouring quotes
pub(crate) fn first_line_fields(first_line: &str) -> Option<csv::StringRecord> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(first_line.as_bytes())
        .records()
        .next()?
        .ok()
}

/// Timestamp stamped on an imported batch, to whole seconds
pub(crate) fn import_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Parse every data row of a bank export
///
/// Skips the first `header_rows` records and any blank rows, maps each
/// remaining row with `parse`, and stamps the batch with the current time.
/// The first failing row rejects the whole file.
pub(crate) async fn load_rows<R, F>(
    reader: R,
    storage_key: &str,
    header_rows: usize,
    mut parse: F,
) -> Result<TransactionSet, TransactionSetError>
where
    R: AsyncRead + Unpin + Send,
    F: FnMut(&FieldRow<'_>) -> Result<Transaction, TransactionSetError>,
{
    let mut csv_reader = AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .create_reader(reader);
    let mut records = csv_reader.records();

    let mut transactions = Vec::new();
    let mut count = 0;
    while let Some(record) = records.next().await {
        let record = record?;
        count += 1;
        if count <= header_rows {
            continue;
        }

        let row = FieldRow::from_async_record(&record, count as u64);
        if row.is_blank() {
            continue;
        }
        transactions.push(parse(&row)?);
    }

    tracing::debug!(storage_key, count = transactions.len(), "parsed bank export");
    Ok(TransactionSet::from_transactions(
        storage_key,
        transactions,
        Some(import_timestamp()),
    ))
}
