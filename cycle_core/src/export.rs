//! CSV export and journal compaction for cycle records.
//!
//! Both operations fsync their output before touching the journal. Each
//! compaction moves the old journal to its own timestamped `*.processed`
//! archive so earlier archives are never overwritten.

use crate::records::{read_events, read_events_locked, replay, JournalLock};
use crate::{CycleRecord, RecordEvent, Result};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A row in the CSV output, matching the backend `cycles` columns
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    user_id: String,
    start_date: String,
    current_phase: String,
    day_of_cycle: u32,
    notes: Option<String>,
    created_at: String,
}

impl From<&CycleRecord> for CsvRow {
    fn from(record: &CycleRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            user_id: record.user_id.clone(),
            start_date: record.start_date.to_string(),
            current_phase: record.current_phase.to_string(),
            day_of_cycle: record.day_of_cycle,
            notes: record.notes.clone(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

fn sorted_records(events: &[RecordEvent]) -> Vec<CycleRecord> {
    let mut records: Vec<_> = replay(events).into_values().collect();
    records.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    records
}

/// Write every live record to `csv_path`, replacing any previous export.
///
/// Rows are ordered by start date. Returns the number of rows written.
pub fn export_records_csv(journal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = sorted_records(&read_events(journal_path)?);

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(csv_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    for record in &records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    tracing::info!("Exported {} cycle records to {:?}", records.len(), csv_path);
    Ok(records.len())
}

/// Unused archive path for a compaction at `at`.
///
/// `cycle_records.jsonl` becomes
/// `cycle_records.jsonl.20240101T120000.000000Z.processed`, with a `-N`
/// suffix on the timestamp if that name is already taken.
pub fn processed_path(journal_path: &Path, at: DateTime<Utc>) -> PathBuf {
    let stamp = at.format("%Y%m%dT%H%M%S%.6fZ").to_string();
    let mut attempt = 0u32;
    loop {
        let mut name = journal_path.as_os_str().to_owned();
        if attempt == 0 {
            name.push(format!(".{stamp}.processed"));
        } else {
            name.push(format!(".{stamp}-{attempt}.processed"));
        }
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}

/// Rewrite the journal as one `created` event per live record.
///
/// The journal lock is held from the read until the new journal is in
/// place, so appends wait for compaction instead of landing in the archive.
/// Returns the number of records carried over.
pub fn compact_journal(journal_path: &Path) -> Result<usize> {
    if !journal_path.exists() {
        tracing::info!("No journal to compact");
        return Ok(0);
    }

    let _lock = JournalLock::exclusive(journal_path)?;
    let records = sorted_records(&read_events_locked(journal_path)?);

    let mut staging = journal_path.as_os_str().to_owned();
    staging.push(".compacting");
    let staging = PathBuf::from(staging);

    let file = File::create(&staging)?;
    let mut writer = BufWriter::new(&file);
    for record in &records {
        let event = RecordEvent::Created {
            record: record.clone(),
        };
        serde_json::to_writer(&mut writer, &event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    drop(writer);
    file.sync_all()?;

    let archived = processed_path(journal_path, Utc::now());
    std::fs::rename(journal_path, &archived)?;
    std::fs::rename(&staging, journal_path)?;

    tracing::info!(
        "Compacted journal to {} records, archived old journal to {:?}",
        records.len(),
        archived
    );
    Ok(records.len())
}

/// Remove archived journals left by compaction
pub fn cleanup_processed_journals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed journal: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journals", count);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordStore;
    use crate::NewCycleRecord;
    use chrono::{NaiveDate, Utc};

    fn input(start: NaiveDate, phase: &str, day: i64) -> NewCycleRecord {
        NewCycleRecord {
            user_id: "local".into(),
            start_date: start,
            current_phase: phase.into(),
            day_of_cycle: day,
            notes: Some("cramps, tired".into()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_export_writes_live_records_in_date_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("records.jsonl");
        let csv_path = temp_dir.path().join("out/records.csv");

        let mut store = RecordStore::new(&journal);
        store.create(input(date(2024, 2, 1), "luteal", 20), Utc::now()).unwrap();
        store.create(input(date(2024, 1, 1), "menstrual", 2), Utc::now()).unwrap();
        let gone = store.create(input(date(2024, 3, 1), "ovulation", 14), Utc::now()).unwrap();
        store.delete(gone.id, Utc::now()).unwrap();

        let count = export_records_csv(&journal, &csv_path).unwrap();
        assert_eq!(count, 2);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[3], "current_phase");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "2024-01-01");
        assert_eq!(&rows[0][3], "menstrual");
        assert_eq!(&rows[1][3], "luteal");
        assert_eq!(&rows[1][5], "cramps, tired");
    }

    #[test]
    fn test_export_with_no_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let count = export_records_csv(
            &temp_dir.path().join("missing.jsonl"),
            &temp_dir.path().join("records.csv"),
        )
        .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_compact_keeps_only_live_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("records.jsonl");

        let mut store = RecordStore::new(&journal);
        let kept = store.create(input(date(2024, 1, 1), "menstrual", 2), Utc::now()).unwrap();
        let gone = store.create(input(date(2024, 2, 1), "luteal", 20), Utc::now()).unwrap();
        store
            .update(
                kept.id,
                &crate::CycleRecordPatch {
                    day_of_cycle: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        store.delete(gone.id, Utc::now()).unwrap();

        let before = read_events(&journal).unwrap().len();
        assert_eq!(before, 4);

        let count = compact_journal(&journal).unwrap();
        assert_eq!(count, 1);

        let events = read_events(&journal).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(archives(temp_dir.path()).len(), 1);

        let records = store.records().unwrap();
        assert_eq!(records[&kept.id].day_of_cycle, 3);
    }

    fn archives(dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "processed"))
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_second_compaction_keeps_first_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("records.jsonl");

        let mut store = RecordStore::new(&journal);
        let gone = store.create(input(date(2024, 1, 1), "menstrual", 2), Utc::now()).unwrap();
        store.delete(gone.id, Utc::now()).unwrap();

        assert_eq!(compact_journal(&journal).unwrap(), 0);
        assert_eq!(compact_journal(&journal).unwrap(), 0);

        let archives = archives(temp_dir.path());
        assert_eq!(archives.len(), 2);

        let line_counts: Vec<usize> = archives
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap().lines().count())
            .collect();
        assert!(line_counts.contains(&2), "first archive lost: {:?}", line_counts);
    }

    #[test]
    fn test_processed_path_never_reuses_a_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("records.jsonl");
        let at = Utc::now();

        let first = processed_path(&journal, at);
        File::create(&first).unwrap();
        let second = processed_path(&journal, at);

        assert_ne!(first, second);
        assert!(first.to_string_lossy().starts_with(&*journal.to_string_lossy()));
        assert_eq!(second.extension().unwrap(), "processed");
    }

    #[test]
    fn test_append_after_compaction_lands_in_live_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = temp_dir.path().join("records.jsonl");

        let mut store = RecordStore::new(&journal);
        store.create(input(date(2024, 1, 1), "menstrual", 2), Utc::now()).unwrap();
        compact_journal(&journal).unwrap();
        let added = store.create(input(date(2024, 2, 1), "luteal", 20), Utc::now()).unwrap();

        assert_eq!(read_events(&journal).unwrap().len(), 2);
        assert!(store.records().unwrap().contains_key(&added.id));
    }

    #[test]
    fn test_cleanup_processed_journals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("a.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("b.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("keep.jsonl")).unwrap();

        let count = cleanup_processed_journals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }
}
