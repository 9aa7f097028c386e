//! Cycle record journal.
//!
//! Record changes are appended to a JSONL (JSON Lines) file with file
//! locking, and the current record set is rebuilt by replaying the journal.
//! Validation follows the backend's rules for the same resource: the phase
//! must be one of the four known names and `day_of_cycle` must be in 1..=40.

use crate::error::FieldError;
use crate::{
    CyclePhase, CycleRecord, CycleRecordPatch, Error, NewCycleRecord, RecordEvent, Result,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Smallest valid `day_of_cycle`
pub const MIN_DAY_OF_CYCLE: i64 = 1;

/// Largest valid `day_of_cycle`
pub const MAX_DAY_OF_CYCLE: i64 = 40;

/// Longest accepted note
pub const MAX_NOTES_LEN: usize = 500;

/// Sink for record change events
pub trait RecordSink {
    fn append(&mut self, event: &RecordEvent) -> Result<()>;
}

/// Sidecar file locked around every journal read, append and compaction.
///
/// The journal itself is replaced during compaction, so locking it directly
/// would let a writer holding the old inode append to the archived copy.
pub fn lock_path(journal_path: &Path) -> PathBuf {
    let mut name = journal_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Advisory lock on a journal's sidecar, released on drop
pub(crate) struct JournalLock {
    file: File,
}

impl JournalLock {
    fn open(journal_path: &Path) -> Result<File> {
        if let Some(parent) = journal_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(journal_path))?)
    }

    pub(crate) fn exclusive(journal_path: &Path) -> Result<Self> {
        let file = Self::open(journal_path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    pub(crate) fn shared(journal_path: &Path) -> Result<Self> {
        let file = Self::open(journal_path)?;
        file.lock_shared()?;
        Ok(Self { file })
    }
}

impl Drop for JournalLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// JSONL-based record journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlJournal {
    fn append(&mut self, event: &RecordEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;

        // Open only once the lock is held so a concurrent compaction has
        // finished swapping files
        let _lock = JournalLock::exclusive(&self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::debug!("Appended event for record {} to journal", event.record_id());
        Ok(())
    }
}

/// Read all events from a journal file, skipping unreadable lines
pub fn read_events(path: &Path) -> Result<Vec<RecordEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let _lock = JournalLock::shared(path)?;
    read_events_locked(path)
}

/// Same as [`read_events`] for callers already holding the journal lock
pub(crate) fn read_events_locked(path: &Path) -> Result<Vec<RecordEvent>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut events = Vec::new();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_num += 1;

        // Bytes are decoded per line so one damaged line can't hide the rest
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!("Skipping journal line {}: not valid UTF-8 ({})", line_num, e);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<RecordEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse journal event at line {}: {}", line_num, e);
            }
        }
    }

    tracing::debug!("Read {} events from journal", events.len());
    Ok(events)
}

/// Fold events into the current record set
pub fn replay(events: &[RecordEvent]) -> HashMap<Uuid, CycleRecord> {
    let mut records = HashMap::new();
    for event in events {
        match event {
            RecordEvent::Created { record } | RecordEvent::Updated { record } => {
                records.insert(record.id, record.clone());
            }
            RecordEvent::Deleted { id, .. } => {
                records.remove(id);
            }
        }
    }
    records
}

// ============================================================================
// Validation
// ============================================================================

fn check_phase(phase: &str, errors: &mut Vec<FieldError>) -> Option<CyclePhase> {
    match phase.parse::<CyclePhase>() {
        Ok(phase) => Some(phase),
        Err(_) => {
            errors.push(FieldError::new(
                "current_phase",
                format!(
                    "must be one of menstrual, follicular, ovulation, luteal (got {:?})",
                    phase
                ),
            ));
            None
        }
    }
}

fn check_day(day: i64, errors: &mut Vec<FieldError>) -> Option<u32> {
    if (MIN_DAY_OF_CYCLE..=MAX_DAY_OF_CYCLE).contains(&day) {
        Some(day as u32)
    } else {
        errors.push(FieldError::new(
            "day_of_cycle",
            format!(
                "must be between {} and {} (got {})",
                MIN_DAY_OF_CYCLE, MAX_DAY_OF_CYCLE, day
            ),
        ));
        None
    }
}

fn check_notes(notes: Option<&str>, errors: &mut Vec<FieldError>) {
    if let Some(notes) = notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            errors.push(FieldError::new(
                "notes",
                format!("must be at most {} characters", MAX_NOTES_LEN),
            ));
        }
    }
}

impl NewCycleRecord {
    fn check(&self) -> (Option<(CyclePhase, u32)>, Vec<FieldError>) {
        let mut errors = Vec::new();
        if self.user_id.trim().is_empty() {
            errors.push(FieldError::new("user_id", "must not be empty"));
        }
        let phase = check_phase(&self.current_phase, &mut errors);
        let day = check_day(self.day_of_cycle, &mut errors);
        check_notes(self.notes.as_deref(), &mut errors);
        (phase.zip(day), errors)
    }

    /// Validate every field, collecting all problems
    pub fn validate(&self) -> Vec<FieldError> {
        self.check().1
    }

    /// Turn validated input into a record
    pub fn into_record(self, created_at: DateTime<Utc>) -> Result<CycleRecord> {
        let (checked, errors) = self.check();
        let Some((current_phase, day_of_cycle)) = checked.filter(|_| errors.is_empty()) else {
            return Err(Error::Validation(errors));
        };

        Ok(CycleRecord {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            start_date: self.start_date,
            current_phase,
            day_of_cycle,
            notes: self.notes,
            created_at,
        })
    }
}

impl CycleRecordPatch {
    fn check(&self) -> (Option<CyclePhase>, Option<u32>, Vec<FieldError>) {
        let mut errors = Vec::new();
        let phase = self
            .current_phase
            .as_deref()
            .and_then(|p| check_phase(p, &mut errors));
        let day = self.day_of_cycle.and_then(|d| check_day(d, &mut errors));
        check_notes(self.notes.as_deref(), &mut errors);
        (phase, day, errors)
    }

    /// Validate only the fields being changed
    pub fn validate(&self) -> Vec<FieldError> {
        self.check().2
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.current_phase.is_none()
            && self.day_of_cycle.is_none()
            && self.notes.is_none()
    }

    /// Apply the patch to a record, validating first
    pub fn apply_to(&self, record: &CycleRecord) -> Result<CycleRecord> {
        let (phase, day, errors) = self.check();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let mut updated = record.clone();
        if let Some(start_date) = self.start_date {
            updated.start_date = start_date;
        }
        if let Some(phase) = phase {
            updated.current_phase = phase;
        }
        if let Some(day) = day {
            updated.day_of_cycle = day;
        }
        if let Some(notes) = &self.notes {
            updated.notes = Some(notes.clone());
        }
        Ok(updated)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Create/update/delete/query over the journal
pub struct RecordStore {
    journal: JsonlJournal,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            journal: JsonlJournal::new(path),
        }
    }

    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    /// Current record set
    pub fn records(&self) -> Result<HashMap<Uuid, CycleRecord>> {
        Ok(replay(&read_events(self.journal.path())?))
    }

    /// Validate and persist a new record
    pub fn create(&mut self, input: NewCycleRecord, now: DateTime<Utc>) -> Result<CycleRecord> {
        let record = input.into_record(now)?;
        self.journal.append(&RecordEvent::Created {
            record: record.clone(),
        })?;
        tracing::info!(
            "Created cycle record {} ({} day {})",
            record.id,
            record.current_phase,
            record.day_of_cycle
        );
        Ok(record)
    }

    /// Validate and apply a partial update
    pub fn update(&mut self, id: Uuid, patch: &CycleRecordPatch) -> Result<CycleRecord> {
        let records = self.records()?;
        let existing = records.get(&id).ok_or(Error::RecordNotFound(id))?;

        let updated = patch.apply_to(existing)?;
        self.journal.append(&RecordEvent::Updated {
            record: updated.clone(),
        })?;
        tracing::info!("Updated cycle record {}", id);
        Ok(updated)
    }

    /// Delete a record
    pub fn delete(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<CycleRecord> {
        let mut records = self.records()?;
        let removed = records.remove(&id).ok_or(Error::RecordNotFound(id))?;

        self.journal.append(&RecordEvent::Deleted { id, at: now })?;
        tracing::info!("Deleted cycle record {}", id);
        Ok(removed)
    }

    /// A user's records, newest `start_date` first (ties: newest `created_at`)
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<CycleRecord>> {
        let mut records: Vec<_> = self
            .records()?
            .into_values()
            .filter(|r| r.user_id == user_id)
            .collect();

        records.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    /// The user's most recent record, if any
    pub fn current_for_user(&self, user_id: &str) -> Result<Option<CycleRecord>> {
        Ok(self.list_for_user(user_id)?.into_iter().next())
    }
}
