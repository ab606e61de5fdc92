//! Subcommand execution
//!
//! Each subcommand loads what it needs through a [`TransactionSetRepository`],
//! applies one engine operation and writes its report to `output`. Errors are
//! returned to the caller untouched; nothing is saved unless the whole
//! operation succeeded.

use super::args::{Command, FilterArgs};
use crate::config::EngineConfig;
use crate::core::{DuplicateDetector, FilterCriteria, TextFilterOutcome, TransactionSet};
use crate::io::report::write_transactions_csv;
use crate::io::storage::ReaderWriterSelector;
use crate::repository::TransactionSetRepository;
use crate::types::{AccountRef, TransactionSetError};
use std::io::Write;
use std::path::Path;

/// Run one subcommand
///
/// # Arguments
///
/// * `command` - The parsed subcommand
/// * `config` - Engine configuration (duplicate detection tuning)
/// * `repository` - Storage access
/// * `output` - Destination for reports and listings
///
/// # Errors
///
/// Any error of the underlying load, engine operation or save.
pub async fn run<S: ReaderWriterSelector>(
    command: Command,
    config: &EngineConfig,
    repository: &TransactionSetRepository<S>,
    output: &mut dyn Write,
) -> Result<(), TransactionSetError> {
    let detector = DuplicateDetector::from_config(config);

    match command {
        Command::New { file } => {
            let key = storage_key(&file);
            repository.create_new(&key, false).await?;
            writeln!(output, "Created {}", key)?;
        }

        Command::Summary { file, encrypted } => {
            let mut set = repository.load(&storage_key(&file), encrypted).await?;
            let flagged = set.detect_duplicates(&detector).flagged_count();
            write_summary(&set, flagged, output)?;
        }

        Command::Import {
            export,
            into,
            account,
            allow_reimport,
        } => {
            let into = storage_key(&into);
            let imported = repository
                .import(&storage_key(&export), &AccountRef::new(account))
                .await?;

            let existing = match repository.load(&into, false).await {
                Ok(set) => set,
                Err(TransactionSetError::NotFound { .. }) => TransactionSet::new(into.as_str()),
                Err(e) => return Err(e),
            };

            let mut merged = existing.merge_checked(&imported, allow_reimport)?;
            repository.save(&mut merged, &into, false).await?;
            writeln!(
                output,
                "Imported {} transactions into {} ({} total)",
                imported.len(),
                into,
                merged.len()
            )?;
        }

        Command::List { file, filter } => {
            let mut set = repository.load(&storage_key(&file), false).await?;
            apply_filter(&mut set, &filter)?;
            write_transactions_csv(set.visible_transactions(), output)?;
        }

        Command::Duplicates { file, filter } => {
            let mut set = repository.load(&storage_key(&file), false).await?;
            apply_filter(&mut set, &filter)?;
            set.detect_duplicates(&detector);
            write_transactions_csv(set.suspected_duplicates(), output)?;
        }

        Command::Split {
            file,
            id,
            amount1,
            amount2,
            bucket1,
            bucket2,
        } => {
            let key = storage_key(&file);
            let mut set = repository.load(&key, false).await?;
            let (first, second) = set.split(id, amount1, amount2, bucket1, bucket2)?;
            repository.save(&mut set, &key, false).await?;
            writeln!(output, "Split {} into {} and {}", id, first, second)?;
        }

        Command::Remove { file, id } => {
            let key = storage_key(&file);
            let mut set = repository.load(&key, false).await?;
            let removed = set.remove(id)?;
            repository.save(&mut set, &key, false).await?;
            writeln!(
                output,
                "Removed {} ({} {} {})",
                removed.id(),
                removed.date,
                removed.description,
                removed.amount
            )?;
        }
    }

    Ok(())
}

fn storage_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Apply the period, account and text filters of a listing subcommand
fn apply_filter(set: &mut TransactionSet, filter: &FilterArgs) -> Result<(), TransactionSetError> {
    let mut criteria = FilterCriteria::period(filter.from, filter.to)?;
    if let Some(account) = &filter.account {
        criteria = criteria.with_account(AccountRef::new(account.as_str()));
    }
    set.filter(criteria);

    if let Some(text) = &filter.text {
        if set.filter_by_text(text) == TextFilterOutcome::NotApplied {
            tracing::warn!(text = %text, "text filter too short, ignored");
        }
    }
    Ok(())
}

fn write_summary(
    set: &TransactionSet,
    flagged: usize,
    output: &mut dyn Write,
) -> Result<(), TransactionSetError> {
    let stats = set.statistics();
    let date_or_dash = |date: Option<chrono::NaiveDate>| {
        date.map_or_else(|| "-".to_string(), |d| d.to_string())
    };

    writeln!(output, "Storage key:          {}", set.storage_key())?;
    writeln!(output, "Transactions:         {}", set.len())?;
    writeln!(output, "First date:           {}", date_or_dash(stats.first_date))?;
    writeln!(output, "Last date:            {}", date_or_dash(stats.last_date))?;
    writeln!(output, "Duration (months):    {}", stats.duration_in_months)?;
    writeln!(
        output,
        "Last import:          {}",
        set.last_import()
            .map_or_else(|| "-".to_string(), |stamp| stamp.to_string())
    )?;
    writeln!(output, "Suspected duplicates: {}", flagged)?;
    Ok(())
}
