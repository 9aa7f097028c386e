#![forbid(unsafe_code)]

//! Core domain model and business logic for Cyclefit.
//!
//! This crate provides:
//! - Domain types (phases, profiles, calendar cells, cycle records)
//! - Cycle phase engine and month calendar grid
//! - Static phase content
//! - Persistence (state file, record journal, CSV export)
//! - Points, levels and streaks

pub mod types;
pub mod error;
pub mod content;
pub mod config;
pub mod logging;
pub mod engine;
pub mod calendar;
pub mod state;
pub mod records;
pub mod export;
pub mod external;
pub mod rewards;

// Re-export commonly used types
pub use error::{Error, FieldError, Result};
pub use types::*;
pub use content::{phase_info, phase_info_by_name};
pub use config::Config;
pub use engine::{
    current_phase, cycle_day_for_date, days_between, days_elapsed_in_phase, phase_for_cycle_day,
    phase_for_date, snapshot, PhaseSnapshot,
};
pub use calendar::{build_month_grid, GRID_DAYS};
pub use records::{JsonlJournal, RecordSink, RecordStore};
pub use external::load_external_profile;
pub use rewards::{record_activity, Award};
