//! Storage capability: byte streams for a storage key
//!
//! The engine never touches encryption itself. A [`ReaderWriterSelector`]
//! hands out a [`ReaderWriter`] for a storage key given whether the file is
//! encrypted, and everything above this module works on the resulting async
//! byte streams.
//!
//! # Architecture
//!
//! ```text
//! Repository → ReaderWriterSelector::select(key, is_encrypted)
//!                  ├── FileReaderWriter          (plain files, tokio::fs)
//!                  └── encrypted ReaderWriter    (supplied by the host application)
//! ```

use crate::types::TransactionSetError;
use futures::future::BoxFuture;
use futures::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_util::compat::TokioAsyncReadCompatExt;

/// Boxed async byte stream handed out by a [`ReaderWriter`]
pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Upper bound on bytes read when sniffing a file's first line
pub const TASTE_PREFIX_BYTES: u64 = 4096;

/// Reads and writes the bytes behind storage keys
pub trait ReaderWriter: Send + Sync {
    /// Whether the storage key resolves to an existing file
    fn exists<'a>(&'a self, storage_key: &'a str) -> BoxFuture<'a, bool>;

    /// Open a stream over the file's contents
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key does not resolve to a file, or `Io` for
    /// any other failure.
    fn open_reader<'a>(
        &'a self,
        storage_key: &'a str,
    ) -> BoxFuture<'a, Result<BoxedReader, TransactionSetError>>;

    /// Replace the file's contents
    ///
    /// Implementations must not leave a partially written file behind when
    /// the write fails or the future is dropped.
    fn write<'a>(
        &'a self,
        storage_key: &'a str,
        contents: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), TransactionSetError>>;
}

/// Chooses the reader/writer for a storage key
pub trait ReaderWriterSelector: Send + Sync {
    /// Select the reader/writer for plain or encrypted storage
    ///
    /// # Errors
    ///
    /// Returns `EncryptionUnavailable` when encrypted storage is requested but
    /// not configured.
    fn select(
        &self,
        storage_key: &str,
        is_encrypted: bool,
    ) -> Result<&dyn ReaderWriter, TransactionSetError>;
}

/// Plain files on the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReaderWriter;

impl ReaderWriter for FileReaderWriter {
    fn exists<'a>(&'a self, storage_key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            tokio::fs::metadata(storage_key)
                .await
                .map(|metadata| metadata.is_file())
                .unwrap_or(false)
        })
    }

    fn open_reader<'a>(
        &'a self,
        storage_key: &'a str,
    ) -> BoxFuture<'a, Result<BoxedReader, TransactionSetError>> {
        Box::pin(async move {
            let file = tokio::fs::File::open(storage_key)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => TransactionSetError::not_found(storage_key),
                    _ => TransactionSetError::Io {
                        message: format!("Failed to open file '{}': {}", storage_key, e),
                    },
                })?;

            // Wrap tokio file in a compatibility layer for futures-io consumers
            Ok(Box::new(file.compat()) as BoxedReader)
        })
    }

    fn write<'a>(
        &'a self,
        storage_key: &'a str,
        contents: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), TransactionSetError>> {
        Box::pin(async move {
            // Write beside the target, then swap it in
            let staging = format!("{}.saving", storage_key);
            if let Err(e) = tokio::fs::write(&staging, &contents).await {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e.into());
            }
            if let Err(e) = tokio::fs::rename(&staging, storage_key).await {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(e.into());
            }
            Ok(())
        })
    }
}

/// Selector backed by plain files, with optional encrypted storage
///
/// Encrypted storage must be supplied by the host application through
/// [`PlainFileSelector::with_encrypted`].
#[derive(Default)]
pub struct PlainFileSelector {
    plain: FileReaderWriter,
    encrypted: Option<Box<dyn ReaderWriter>>,
}

impl PlainFileSelector {
    /// Create a selector that only serves plain files
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `reader_writer` for encrypted storage keys
    pub fn with_encrypted(mut self, reader_writer: Box<dyn ReaderWriter>) -> Self {
        self.encrypted = Some(reader_writer);
        self
    }
}

impl ReaderWriterSelector for PlainFileSelector {
    fn select(
        &self,
        storage_key: &str,
        is_encrypted: bool,
    ) -> Result<&dyn ReaderWriter, TransactionSetError> {
        if !is_encrypted {
            return Ok(&self.plain);
        }

        self.encrypted
            .as_deref()
            .ok_or_else(|| TransactionSetError::EncryptionUnavailable {
                key: storage_key.to_string(),
            })
    }
}

/// Read the first line of a stream, looking at most at [`TASTE_PREFIX_BYTES`]
///
/// A leading byte-order mark and the line terminator are stripped.
///
/// # Returns
///
/// * `Ok(Some(line))` - The first line
/// * `Ok(None)` - The stream is empty
/// * `Err(_)` - The prefix could not be read or is not UTF-8
pub async fn read_first_line(reader: BoxedReader) -> Result<Option<String>, TransactionSetError> {
    let mut buffered = BufReader::new(reader.take(TASTE_PREFIX_BYTES));
    let mut line = String::new();

    if buffered.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let line = line.trim_start_matches('\u{feff}').trim_end_matches(['\r', '\n']);
    Ok(Some(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use tempfile::TempDir;

    fn key_in(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "budget.txs");
        let io = FileReaderWriter;

        assert!(!io.exists(&key).await);
        io.write(&key, b"first line\nsecond line\n".to_vec())
            .await
            .unwrap();
        assert!(io.exists(&key).await);
        assert!(!io.exists(&format!("{}.saving", key)).await);

        let reader = io.open_reader(&key).await.unwrap();
        let line = read_first_line(reader).await.unwrap();
        assert_eq!(line.as_deref(), Some("first line"));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let key = key_in(&dir, "missing.txs");

        let result = FileReaderWriter.open_reader(&key).await;
        assert!(matches!(result, Err(TransactionSetError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_read_first_line_strips_bom_and_crlf() {
        let reader: BoxedReader = Box::new(Cursor::new("\u{feff}a,b,c\r\nd,e,f\r\n".as_bytes()));
        assert_eq!(
            read_first_line(reader).await.unwrap().as_deref(),
            Some("a,b,c")
        );
    }

    #[tokio::test]
    async fn test_read_first_line_empty_stream() {
        let reader: BoxedReader = Box::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(read_first_line(reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_first_line_rejects_binary() {
        let reader: BoxedReader = Box::new(Cursor::new(vec![0xff, 0xfe, 0x00, 0x81, b'\n']));
        assert!(read_first_line(reader).await.is_err());
    }

    #[test]
    fn test_selector_without_encryption() {
        let selector = PlainFileSelector::new();
        assert!(selector.select("budget.txs", false).is_ok());
        assert!(matches!(
            selector.select("budget.txs", true),
            Err(TransactionSetError::EncryptionUnavailable { .. })
        ));
    }

    #[test]
    fn test_selector_with_encryption() {
        let selector = PlainFileSelector::new().with_encrypted(Box::new(FileReaderWriter));
        assert!(selector.select("budget.txs", true).is_ok());
    }
}
