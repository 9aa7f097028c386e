//! External profile loader.
//!
//! Reads the profile the mobile app keeps in device storage:
//! `{ "lastPeriodDate": "2024-01-01", "cycleLength": 28 }`. The app stores
//! values as strings at times, so `cycleLength` may be a number or a numeric
//! string, and `lastPeriodDate` may carry a time component.

use crate::{CycleProfile, Result};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Storage file format (matches the app's key-value entry)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    last_period_date: String,
    #[serde(default)]
    cycle_length: Option<Value>,
}

/// Load a profile exported from app storage.
///
/// Returns None if the file doesn't exist or can't be understood; the
/// reason is logged. A missing `cycleLength` uses `default_length`.
pub fn load_external_profile(path: &Path, default_length: u32) -> Result<Option<CycleProfile>> {
    if !path.exists() {
        tracing::debug!("No stored profile found at {:?}", path);
        return Ok(None);
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(
                "Failed to read stored profile at {:?}: {}. Ignoring it.",
                path,
                e
            );
            return Ok(None);
        }
    };

    let stored: StoredProfile = match serde_json::from_str(&contents) {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(
                "Failed to parse stored profile at {:?}: {}. Ignoring it.",
                path,
                e
            );
            return Ok(None);
        }
    };

    let Some(last_period_date) = parse_storage_date(&stored.last_period_date) else {
        tracing::warn!(
            "Stored profile has an unreadable lastPeriodDate {:?}. Ignoring it.",
            stored.last_period_date
        );
        return Ok(None);
    };

    let cycle_length = match stored.cycle_length.as_ref() {
        None | Some(Value::Null) => default_length,
        Some(value) => match parse_cycle_length(value) {
            Some(length) => length,
            None => {
                tracing::warn!(
                    "Stored profile has an unreadable cycleLength {}. Ignoring it.",
                    value
                );
                return Ok(None);
            }
        },
    };

    tracing::info!(
        "Loaded stored profile: period started {}, {}-day cycle",
        last_period_date,
        cycle_length
    );

    Ok(Some(CycleProfile::new(last_period_date, cycle_length)))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part is kept)
fn parse_storage_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Accepts a positive integer or a string holding one
fn parse_cycle_length(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
        let path = dir.path().join("profile.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_load_stored_profile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(&temp_dir, r#"{ "lastPeriodDate": "2024-01-01", "cycleLength": 30 }"#);

        let profile = load_external_profile(&path, 28).unwrap().unwrap();
        assert_eq!(profile.last_period_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(profile.cycle_length, 30);
    }

    #[test]
    fn test_string_length_and_timestamp_date() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            &temp_dir,
            r#"{ "lastPeriodDate": "2024-01-05T08:30:00.000Z", "cycleLength": "26" }"#,
        );

        let profile = load_external_profile(&path, 28).unwrap().unwrap();
        assert_eq!(profile.last_period_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(profile.cycle_length, 26);
    }

    #[test]
    fn test_missing_length_uses_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(&temp_dir, r#"{ "lastPeriodDate": "2024-01-01" }"#);

        let profile = load_external_profile(&path, 28).unwrap().unwrap();
        assert_eq!(profile.cycle_length, 28);
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        assert!(load_external_profile(&path, 28).unwrap().is_none());
    }

    #[test]
    fn test_malformed_files_are_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();

        for json in [
            "{ invalid json }",
            r#"{ "cycleLength": 28 }"#,
            r#"{ "lastPeriodDate": "last tuesday", "cycleLength": 28 }"#,
            r#"{ "lastPeriodDate": "2024-01-01", "cycleLength": "long" }"#,
            r#"{ "lastPeriodDate": "2024-01-01", "cycleLength": -3 }"#,
        ] {
            let path = write(&temp_dir, json);
            assert!(
                load_external_profile(&path, 28).unwrap().is_none(),
                "expected {} to be ignored",
                json
            );
        }
    }
}
