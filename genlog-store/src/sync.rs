//! Usage log synchronizer.
//!
//! Appends one row to the usage-log table held in a [`RemoteLogStore`]. The
//! store only offers whole-blob operations, so an append is a
//! read-modify-write cycle guarded by the revision observed at read time.

use genlog_core::row::{append_row, has_header, new_table_content, parse_table};
use genlog_core::{BlobRef, LineTerminator, LogEntry, LogTable, RemoteLogStore};
use tracing::{debug, info, instrument, warn};

use crate::error::LogError;

/// Appends `entry` to `table`, creating the table on first use.
///
/// On success exactly one new row exists and no other blob was touched.
///
/// # Errors
///
/// - [`LogError::StoreUnavailable`] if the table lookup fails
/// - [`LogError::ReadFailed`] if the existing table cannot be read
/// - [`LogError::Undecodable`] if the existing table is not UTF-8
/// - [`LogError::WriteFailed`] if the create or update is rejected
/// - [`LogError::Conflict`] if the table changed since it was read
/// - [`LogError::MultipleMatchesAmbiguous`] if several tables already exist
/// - [`LogError::DuplicateTable`] if a concurrent creator raced this one
#[instrument(skip_all, fields(table = %table.name, user = %entry.user()))]
pub async fn append<S>(entry: &LogEntry, table: &LogTable, store: &S) -> Result<(), LogError>
where
    S: RemoteLogStore + ?Sized,
{
    let matches = store
        .list(&table.name, &table.container_id)
        .await
        .map_err(|e| LogError::StoreUnavailable(e.to_string()))?;

    match matches.as_slice() {
        [] => create_table(entry, table, store).await,
        [blob] => append_to(entry, blob, store).await,
        many => {
            warn!(count = many.len(), "Several log tables match, refusing to pick one");
            Err(LogError::MultipleMatchesAmbiguous { count: many.len() })
        }
    }
}

async fn create_table<S>(entry: &LogEntry, table: &LogTable, store: &S) -> Result<(), LogError>
where
    S: RemoteLogStore + ?Sized,
{
    let content = new_table_content(entry, LineTerminator::Lf)
        .map_err(|e| LogError::Encoding(e.to_string()))?;

    let created = store
        .create(
            &table.name,
            &table.container_id,
            &table.mime_type,
            content.into_bytes(),
        )
        .await
        .map_err(LogError::write)?;
    info!(blob_id = %created.id, "Created log table");

    // A concurrent first writer may have created its own table meanwhile.
    match store.list(&table.name, &table.container_id).await {
        Ok(after) if after.len() > 1 => {
            warn!(count = after.len(), "Log table was created concurrently");
            Err(LogError::DuplicateTable {
                name: table.name.clone(),
                count: after.len(),
            })
        }
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(error = %e, "Could not verify log table uniqueness after create");
            Ok(())
        }
    }
}

async fn append_to<S>(entry: &LogEntry, blob: &BlobRef, store: &S) -> Result<(), LogError>
where
    S: RemoteLogStore + ?Sized,
{
    let current = store
        .read_content(&blob.id)
        .await
        .map_err(|e| LogError::ReadFailed(e.to_string()))?;

    let text = String::from_utf8(current.bytes)
        .map_err(|e| LogError::Undecodable(e.to_string()))?;

    if !text.trim().is_empty() && !has_header(&text) {
        warn!(blob_id = %blob.id, "Log table does not start with the expected header");
    }

    let updated = append_row(&text, entry).map_err(|e| LogError::Encoding(e.to_string()))?;
    let expected = current.revision.as_ref().or(blob.revision.as_ref());
    debug!(
        blob_id = %blob.id,
        revision = ?expected,
        bytes = updated.len(),
        "Writing log table"
    );

    store
        .update_content(&blob.id, updated.into_bytes(), expected)
        .await
        .map_err(LogError::write)?;

    info!(blob_id = %blob.id, "Appended log row");
    Ok(())
}

/// Reads every row of `table`. A table that does not exist yet has no rows.
///
/// # Errors
///
/// - [`LogError::StoreUnavailable`] if the table lookup fails
/// - [`LogError::ReadFailed`] if the table cannot be read or parsed
/// - [`LogError::Undecodable`] if the table is not UTF-8
/// - [`LogError::MultipleMatchesAmbiguous`] if several tables exist
#[instrument(skip(table, store), fields(table = %table.name))]
pub async fn read_entries<S>(table: &LogTable, store: &S) -> Result<Vec<LogEntry>, LogError>
where
    S: RemoteLogStore + ?Sized,
{
    let matches = store
        .list(&table.name, &table.container_id)
        .await
        .map_err(|e| LogError::StoreUnavailable(e.to_string()))?;

    let blob = match matches.as_slice() {
        [] => return Ok(Vec::new()),
        [blob] => blob,
        many => return Err(LogError::MultipleMatchesAmbiguous { count: many.len() }),
    };

    let content = store
        .read_content(&blob.id)
        .await
        .map_err(|e| LogError::ReadFailed(e.to_string()))?;
    let text = String::from_utf8(content.bytes)
        .map_err(|e| LogError::Undecodable(e.to_string()))?;
    let entries = parse_table(&text).map_err(|e| LogError::ReadFailed(e.to_string()))?;
    debug!(blob_id = %blob.id, rows = entries.len(), "Read log table");
    Ok(entries)
}

// ============================================================================
// Tests
// ============================================================================
