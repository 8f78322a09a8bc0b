//! CSV backup import and export.
//!
//! The backup format is one `day,steps` pair per line, no header, days
//! ascending. Exported step counts are clamped to zero; internal negative
//! offsets never leave the ledger. Import is isolated per line: rows that
//! cannot be parsed are skipped and counted, they never abort the import.

use crate::store::Ledger;
use crate::types::{ImportSummary, SENTINEL_DAY};
use crate::Result;
use std::fs::File;
use std::path::Path;

/// Export all real day entries to a CSV file. Returns the number of rows
/// written. The file is synced to disk before returning.
pub fn export_csv(ledger: &Ledger, path: &Path) -> Result<usize> {
    let entries = ledger.export_entries()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    for entry in &entries {
        writer.write_record(&[entry.day.to_string(), entry.steps.to_string()])?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} day entries to {:?}", entries.len(), path);
    Ok(entries.len())
}

/// Import day entries from a CSV file, overwriting existing days.
///
/// All parseable rows are applied in one ledger transaction. Rows with a
/// reserved day index or a negative step count are ignored along with
/// unparseable ones.
pub fn import_csv(ledger: &Ledger, path: &Path) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows: Vec<(i64, i64)> = Vec::new();
    let mut summary = ImportSummary::default();

    for (line_num, result) in reader.records().enumerate() {
        let row = match result {
            Ok(record) => parse_row(&record),
            Err(e) => {
                tracing::warn!("Failed to read backup line {}: {}", line_num + 1, e);
                None
            }
        };

        match row {
            Some(row) => rows.push(row),
            None => {
                tracing::warn!("Ignoring backup line {}", line_num + 1);
                summary.ignored += 1;
            }
        }
    }

    ledger.transact(|tx| {
        for (day, steps) in &rows {
            if tx.overwrite_or_insert(*day, *steps) {
                summary.inserted += 1;
            } else {
                summary.overwritten += 1;
            }
        }
        Ok(())
    })?;

    tracing::info!(
        "Imported {} entries ({} new, {} overwritten, {} ignored) from {:?}",
        summary.imported(),
        summary.inserted,
        summary.overwritten,
        summary.ignored,
        path
    );
    Ok(summary)
}

fn parse_row(record: &csv::StringRecord) -> Option<(i64, i64)> {
    let day: i64 = record.get(0)?.trim().parse().ok()?;
    let steps: i64 = record.get(1)?.trim().parse().ok()?;
    if day <= SENTINEL_DAY || steps < 0 {
        return None;
    }
    Some((day, steps))
}
