//! Month calendar grid.
//!
//! Builds the fixed 6-week grid the calendar view renders, annotating every
//! cell with its cycle day and phase.

use crate::engine::{cycle_day_for_date, phase_for_cycle_day};
use crate::{CycleDayDescriptor, CycleProfile};
use chrono::{Datelike, Days, NaiveDate};

/// Cells in a month grid: six full Sunday-first weeks
pub const GRID_DAYS: usize = 42;

/// Sunday on or before `date`, if chrono can represent it
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let offset = date.weekday().num_days_from_sunday();
    date.checked_sub_days(Days::new(u64::from(offset)))
}

/// First cell of the grid for the month starting at `first`, or None when
/// any of the 42 days falls outside chrono's date range
fn grid_anchor(first: NaiveDate) -> Option<NaiveDate> {
    let anchor = week_start(first)?;
    anchor.checked_add_days(Days::new(GRID_DAYS as u64 - 1))?;
    Some(anchor)
}

/// First day of the viewed month.
///
/// `month` is 1-based. Values outside 1..=12 roll into neighbouring years
/// (13 is January of the following year, 0 is December of the previous one).
/// Years chrono cannot represent fall back to `today`'s month.
pub fn first_of_month(year: i32, month: u32, today: NaiveDate) -> NaiveDate {
    let total = i64::from(year) * 12 + i64::from(month) - 1;
    let normalized_year = total.div_euclid(12);
    let normalized_month = total.rem_euclid(12) as u32 + 1;

    i32::try_from(normalized_year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, normalized_month, 1))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Cannot display {}-{:02}, showing the current month instead",
                year,
                month
            );
            today.with_day(1).unwrap_or(today)
        })
}

/// Build the 42-cell grid for a month, ordered by date.
///
/// `month` is 1-based (2 = February) and rolls over like
/// [`first_of_month`]. Months whose grid would run past the ends of chrono's
/// date range show `today`'s month instead.
pub fn build_month_grid(
    profile: &CycleProfile,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Vec<CycleDayDescriptor> {
    let requested = first_of_month(year, month, today);
    let (first, anchor) = match grid_anchor(requested) {
        Some(anchor) => (requested, anchor),
        None => {
            tracing::warn!(
                "Grid for {}-{:02} runs outside the supported date range, showing the current month instead",
                requested.year(),
                requested.month()
            );
            fallback_month(today)
        }
    };
    let cycle_length = profile.cycle_length.max(1);

    let grid: Vec<CycleDayDescriptor> = anchor
        .iter_days()
        .take(GRID_DAYS)
        .map(|date| {
            let cycle_day = cycle_day_for_date(profile, date);
            let phase = cycle_day.map(|day| phase_for_cycle_day(i64::from(day), cycle_length));

            CycleDayDescriptor {
                date,
                cycle_day,
                phase,
                is_current_month: date.month() == first.month() && date.year() == first.year(),
                is_today: date == today,
            }
        })
        .collect();

    tracing::debug!(
        "Built grid for {}-{:02} starting {}",
        first.year(),
        first.month(),
        anchor
    );

    grid
}

/// Today's month, or the Unix epoch month if even that grid is out of range
fn fallback_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    match grid_anchor(first) {
        Some(anchor) => (first, anchor),
        None => {
            let epoch = NaiveDate::default();
            (epoch, grid_anchor(epoch).unwrap_or(epoch))
        }
    }
}
