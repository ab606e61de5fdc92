//! Transaction set repository
//!
//! Entry point for collaborators that need a transaction set from storage.
//! The repository resolves a byte stream through the injected
//! [`ReaderWriterSelector`], recognises the file through the
//! [`ImportRegistry`] (native format first, then bank exports) and writes sets
//! back in the native format.
//!
//! # Failure
//!
//! Every operation either completes or leaves storage and the caller's set
//! untouched. Loads parse the whole file before returning; saves serialise the
//! whole set before the first byte is written.

use crate::core::TransactionSet;
use crate::import::{ImportFormat, ImportRegistry};
use crate::io::native_format;
use crate::io::storage::{read_first_line, ReaderWriterSelector};
use crate::types::{AccountRef, TransactionSetError};

/// Loads, imports and saves transaction sets
pub struct TransactionSetRepository<S: ReaderWriterSelector> {
    selector: S,
    registry: ImportRegistry,
}

impl<S: ReaderWriterSelector> TransactionSetRepository<S> {
    /// Create a repository that recognises every supported format
    pub fn new(selector: S) -> Self {
        Self::with_registry(selector, ImportRegistry::new())
    }

    /// Create a repository with a custom format registry
    pub fn with_registry(selector: S, registry: ImportRegistry) -> Self {
        TransactionSetRepository { selector, registry }
    }

    /// The format registry used by [`load`](Self::load) and [`import`](Self::import)
    pub fn registry(&self) -> &ImportRegistry {
        &self.registry
    }

    /// Create an empty transaction set and save it
    ///
    /// # Errors
    ///
    /// Any error of [`save`](Self::save); nothing is returned in that case.
    pub async fn create_new(
        &self,
        storage_key: &str,
        is_encrypted: bool,
    ) -> Result<TransactionSet, TransactionSetError> {
        let mut set = TransactionSet::new(storage_key);
        self.save(&mut set, storage_key, is_encrypted).await?;
        tracing::info!(storage_key, "created new transaction set");
        Ok(set)
    }

    /// Load a transaction set
    ///
    /// Native files are read directly. A bank export is accepted too and
    /// loaded with an unassigned account; use [`import`](Self::import) to
    /// assign one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the storage key does not resolve to a file
    /// - `UnsupportedFormat` if no format recognises the file
    /// - `ChecksumMismatch`, `DataFormat` or `IndexOutOfRange` from parsing
    pub async fn load(
        &self,
        storage_key: &str,
        is_encrypted: bool,
    ) -> Result<TransactionSet, TransactionSetError> {
        let io = self.selector.select(storage_key, is_encrypted)?;
        if !io.exists(storage_key).await {
            return Err(TransactionSetError::not_found(storage_key));
        }

        let set = self
            .registry
            .import(io, storage_key, &AccountRef::unassigned())
            .await?;
        tracing::info!(
            storage_key,
            count = set.len(),
            "loaded transaction set"
        );
        Ok(set)
    }

    /// Import a bank export, assigning every transaction to `account`
    ///
    /// Bank exports are never encrypted.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub async fn import(
        &self,
        storage_key: &str,
        account: &AccountRef,
    ) -> Result<TransactionSet, TransactionSetError> {
        let io = self.selector.select(storage_key, false)?;
        let set = self.registry.import(io, storage_key, account).await?;
        tracing::info!(
            storage_key,
            %account,
            count = set.len(),
            "imported transactions"
        );
        Ok(set)
    }

    /// Save a transaction set in the native format
    ///
    /// The checksum is recomputed from `set`. On success the set's storage key
    /// becomes `storage_key`.
    ///
    /// # Errors
    ///
    /// - `TransactionCountMismatch` if serialisation would drop transactions
    /// - `EncryptionUnavailable` if encrypted storage is not configured
    /// - `Io` if the write fails (the previous file is left in place)
    pub async fn save(
        &self,
        set: &mut TransactionSet,
        storage_key: &str,
        is_encrypted: bool,
    ) -> Result<(), TransactionSetError> {
        let io = self.selector.select(storage_key, is_encrypted)?;
        let contents = native_format::write(set)?;
        io.write(storage_key, contents).await?;

        set.set_storage_key(storage_key);
        tracing::info!(storage_key, count = set.len(), "saved transaction set");
        Ok(())
    }

    /// Whether a file is in the native transaction set format
    ///
    /// Only the first line is inspected.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the storage key does not resolve to a file.
    pub async fn is_transaction_set(&self, storage_key: &str) -> Result<bool, TransactionSetError> {
        let io = self.selector.select(storage_key, false)?;
        let reader = io.open_reader(storage_key).await?;

        Ok(match read_first_line(reader).await {
            Ok(Some(line)) => ImportFormat::TransactionSet.taste_test(&line),
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(storage_key, error = %e, "could not read first line");
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::{BoxedReader, FileReaderWriter, PlainFileSelector, ReaderWriter};
    use crate::types::{Transaction, TransactionType};
    use chrono::NaiveDate;
    use futures::future::BoxFuture;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn repository() -> TransactionSetRepository<PlainFileSelector> {
        TransactionSetRepository::new(PlainFileSelector::new())
    }

    fn key_in(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    fn payment(amount: i64, day: u32) -> Transaction {
        Transaction::new(
            AccountRef::new("CHEQUE"),
            Decimal::new(amount, 2),
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            TransactionType::named("Payment"),
        )
    }

    #[tokio::test]
    async fn test_create_new_then_load() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "new.txs");
        let repo = repository();

        let created = repo.create_new(&key, false).await.unwrap();
        assert!(created.is_empty());
        assert!(repo.is_transaction_set(&key).await.unwrap());

        let loaded = repo.load(&key, false).await.unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.storage_key(), key);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "budget.txs");
        let repo = repository();

        let mut set = TransactionSet::from_transactions(
            "unsaved",
            vec![payment(-1250, 9), payment(4000, 2)],
            None,
        );
        repo.save(&mut set, &key, false).await.unwrap();
        assert_eq!(set.storage_key(), key);

        let loaded = repo.load(&key, false).await.unwrap();
        assert_eq!(loaded.all_transactions(), set.all_transactions());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "missing.txs");
        let repo = repository();

        assert!(matches!(
            repo.load(&key, false).await,
            Err(TransactionSetError::NotFound { .. })
        ));
        assert!(matches!(
            repo.is_transaction_set(&key).await,
            Err(TransactionSetError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_bank_export_is_not_a_transaction_set() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "anz.csv");
        FileReaderWriter
            .write(&key, b"Payment,Power Co,INV1,,,-95.15,10/08/2013,,\n".to_vec())
            .await
            .unwrap();
        let repo = repository();

        assert!(!repo.is_transaction_set(&key).await.unwrap());

        let loaded = repo.load(&key, false).await.unwrap();
        assert!(loaded.all_transactions()[0].account.is_unassigned());

        let imported = repo.import(&key, &AccountRef::new("CHEQUE")).await.unwrap();
        assert_eq!(imported.all_transactions()[0].account, AccountRef::new("CHEQUE"));
    }

    #[tokio::test]
    async fn test_encrypted_without_support() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "secret.txs");
        let repo = repository();

        let mut set = TransactionSet::new("secret.txs");
        assert!(matches!(
            repo.save(&mut set, &key, true).await,
            Err(TransactionSetError::EncryptionUnavailable { .. })
        ));
        assert!(!FileReaderWriter.exists(&key).await);
    }

    /// Writer that always fails, to check nothing is half-saved
    struct FailingWriter;

    impl ReaderWriter for FailingWriter {
        fn exists<'a>(&'a self, _storage_key: &'a str) -> BoxFuture<'a, bool> {
            Box::pin(async { false })
        }

        fn open_reader<'a>(
            &'a self,
            storage_key: &'a str,
        ) -> BoxFuture<'a, Result<BoxedReader, TransactionSetError>> {
            Box::pin(async move { Err(TransactionSetError::not_found(storage_key)) })
        }

        fn write<'a>(
            &'a self,
            _storage_key: &'a str,
            _contents: Vec<u8>,
        ) -> BoxFuture<'a, Result<(), TransactionSetError>> {
            Box::pin(async {
                Err(TransactionSetError::Io {
                    message: "disk full".to_string(),
                })
            })
        }
    }

    #[tokio::test]
    async fn test_failed_save_keeps_storage_key() {
        let repo = TransactionSetRepository::new(
            PlainFileSelector::new().with_encrypted(Box::new(FailingWriter)),
        );
        let mut set = TransactionSet::from_transactions("original.txs", vec![payment(100, 1)], None);

        let result = repo.save(&mut set, "elsewhere.txs", true).await;
        assert!(matches!(result, Err(TransactionSetError::Io { .. })));
        assert_eq!(set.storage_key(), "original.txs");
    }
}
