//! Core domain types for the Cyclefit system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Cycle phases and the user's cycle profile
//! - Calendar cell descriptors and static phase content
//! - Cycle records (local mirror of the backend cycle resource)
//! - Reward progress and persistent user state

use crate::Error;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Shortest cycle length accepted at onboarding.
pub const MIN_CYCLE_LENGTH: u32 = 1;

/// Longest cycle length accepted at onboarding. Matches the `day_of_cycle`
/// bound on cycle records so engine output always fits a record.
pub const MAX_CYCLE_LENGTH: u32 = 40;

/// Cycle length used when the user has not supplied one.
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

/// Number of days the menstrual phase always spans.
pub const MENSTRUAL_DAYS: i64 = 5;

// ============================================================================
// Phase Types
// ============================================================================

/// One of the four segments of a menstrual cycle.
///
/// Order within a cycle: menstrual → follicular → ovulation → luteal, then
/// back to menstrual of the next cycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl CyclePhase {
    /// All phases in cycle order
    pub const ALL: [CyclePhase; 4] = [
        CyclePhase::Menstrual,
        CyclePhase::Follicular,
        CyclePhase::Ovulation,
        CyclePhase::Luteal,
    ];

    /// Wire name shared with the backend (`"menstrual"`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "menstrual",
            CyclePhase::Follicular => "follicular",
            CyclePhase::Ovulation => "ovulation",
            CyclePhase::Luteal => "luteal",
        }
    }

    /// The phase that follows this one, wrapping luteal back to menstrual
    pub fn next(self) -> Self {
        match self {
            CyclePhase::Menstrual => CyclePhase::Follicular,
            CyclePhase::Follicular => CyclePhase::Ovulation,
            CyclePhase::Ovulation => CyclePhase::Luteal,
            CyclePhase::Luteal => CyclePhase::Menstrual,
        }
    }

    /// Lenient parse used by display code.
    ///
    /// Unrecognized names resolve to `Menstrual` so that a render always has
    /// a phase to show. Validation boundaries use `FromStr` instead.
    pub fn from_name_or_default(name: &str) -> Self {
        match name.parse::<CyclePhase>() {
            Ok(phase) => phase,
            Err(_) => {
                tracing::debug!("Unknown phase name {:?}, defaulting to menstrual", name);
                CyclePhase::Menstrual
            }
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CyclePhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "menstrual" => Ok(CyclePhase::Menstrual),
            "follicular" => Ok(CyclePhase::Follicular),
            "ovulation" => Ok(CyclePhase::Ovulation),
            "luteal" => Ok(CyclePhase::Luteal),
            _ => Err(Error::UnknownPhase(s.to_string())),
        }
    }
}

// ============================================================================
// Profile Types
// ============================================================================

/// The user's cycle profile, as captured during onboarding.
///
/// Serialized in the same camelCase shape the app keeps in device storage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleProfile {
    /// First day of the most recent period
    pub last_period_date: NaiveDate,
    /// Average number of days per cycle
    pub cycle_length: u32,
}

impl CycleProfile {
    pub fn new(last_period_date: NaiveDate, cycle_length: u32) -> Self {
        Self {
            last_period_date,
            cycle_length,
        }
    }

    /// Onboarding validation. The engine itself accepts any profile.
    pub fn validate(&self) -> crate::Result<()> {
        if !(MIN_CYCLE_LENGTH..=MAX_CYCLE_LENGTH).contains(&self.cycle_length) {
            return Err(Error::Profile(format!(
                "cycle length must be between {} and {} days, got {}",
                MIN_CYCLE_LENGTH, MAX_CYCLE_LENGTH, self.cycle_length
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Calendar Types
// ============================================================================

/// One cell of the month calendar grid
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CycleDayDescriptor {
    pub date: NaiveDate,
    /// `None` for dates before the recorded period start
    pub cycle_day: Option<u32>,
    pub phase: Option<CyclePhase>,
    pub is_current_month: bool,
    pub is_today: bool,
}

/// Static display copy for a phase
#[derive(Clone, Debug, Serialize)]
pub struct PhaseInfo {
    pub phase: CyclePhase,
    pub name: &'static str,
    pub description: &'static str,
    pub message: &'static str,
    pub workout: &'static str,
    pub nutrition: &'static str,
    pub recovery: &'static str,
}

// ============================================================================
// Cycle Record Types
// ============================================================================

/// A persisted cycle-tracking record.
///
/// Mirrors the backend `cycles` table: same four-value phase enum and the
/// same 1-based day numbering.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    pub id: Uuid,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub current_phase: CyclePhase,
    pub day_of_cycle: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated input for creating a record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCycleRecord {
    pub user_id: String,
    pub start_date: NaiveDate,
    pub current_phase: String,
    pub day_of_cycle: i64,
    pub notes: Option<String>,
}

/// Unvalidated partial update; `None` leaves a field unchanged
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CycleRecordPatch {
    pub start_date: Option<NaiveDate>,
    pub current_phase: Option<String>,
    pub day_of_cycle: Option<i64>,
    pub notes: Option<String>,
}

/// Journal entry for a change to the record set
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordEvent {
    Created { record: CycleRecord },
    Updated { record: CycleRecord },
    Deleted { id: Uuid, at: DateTime<Utc> },
}

impl RecordEvent {
    /// ID of the record this event touches
    pub fn record_id(&self) -> Uuid {
        match self {
            RecordEvent::Created { record } | RecordEvent::Updated { record } => record.id,
            RecordEvent::Deleted { id, .. } => *id,
        }
    }
}

// ============================================================================
// Reward Types
// ============================================================================

/// Kind of recommendation a user can complete
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Workout,
    Nutrition,
    Recovery,
}

impl FromStr for ActivityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "workout" => Ok(ActivityKind::Workout),
            "nutrition" => Ok(ActivityKind::Nutrition),
            "recovery" => Ok(ActivityKind::Recovery),
            other => Err(Error::Other(format!("Unknown activity kind: {}", other))),
        }
    }
}

/// A completed activity and the points it earned
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub phase: CyclePhase,
    pub on: NaiveDate,
    pub points: u32,
}

/// Gamification progress
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RewardState {
    pub points: u32,
    pub level: u32,
    pub streak_days: u32,
    pub last_activity_on: Option<NaiveDate>,
    #[serde(default)]
    pub history: Vec<ActivityEntry>,
}

impl Default for RewardState {
    fn default() -> Self {
        Self {
            points: 0,
            level: 1,
            streak_days: 0,
            last_activity_on: None,
            history: Vec::new(),
        }
    }
}

/// User's persistent state across invocations
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserState {
    pub profile: Option<CycleProfile>,
    #[serde(default)]
    pub rewards: RewardState,
}
