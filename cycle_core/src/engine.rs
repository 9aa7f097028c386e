//! Cycle phase engine.
//!
//! Pure date arithmetic that maps a cycle profile onto phases:
//! - Whole-day offsets between calendar dates
//! - Classification of a 1-based cycle day into a phase
//! - Phase, cycle day and days-in-phase queries for a given date
//!
//! Nothing in here reads the clock. Callers pass "today" explicitly.

use crate::{CyclePhase, CycleProfile, PhaseInfo, MENSTRUAL_DAYS};
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

/// Dashboard view of where the user is in their cycle on a given day
#[derive(Clone, Debug, Serialize)]
pub struct PhaseSnapshot {
    pub date: NaiveDate,
    pub cycle_day: Option<u32>,
    pub phase: CyclePhase,
    pub days_in_phase: u32,
    pub days_until_next_period: Option<u32>,
    pub info: &'static PhaseInfo,
}

/// Signed number of whole days from `from` to `to`.
///
/// Negative when `to` precedes `from`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Day offset between two instants, compared as local calendar dates.
///
/// Time of day is dropped before subtracting, so 23:59 and 00:01 the next
/// morning are one day apart and DST transitions never shift the result.
pub fn days_between_instants<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> i64 {
    days_between(from.date_naive(), to.date_naive())
}

/// Classify a 1-based cycle day.
///
/// - days 1..=5 are menstrual
/// - follicular runs from day 6 to the day before the midpoint
/// - ovulation is the midpoint day (`cycle_length / 2`)
/// - everything after the midpoint is luteal
///
/// For cycles of 11 days or fewer the follicular window is empty, so days
/// after 5 go straight to ovulation or luteal. Days `<= 0` fall into the
/// menstrual branch.
pub fn phase_for_cycle_day(cycle_day: i64, cycle_length: u32) -> CyclePhase {
    let midpoint = i64::from(cycle_length / 2);

    if cycle_day <= MENSTRUAL_DAYS {
        CyclePhase::Menstrual
    } else if cycle_day <= midpoint - 1 {
        CyclePhase::Follicular
    } else if cycle_day == midpoint {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    }
}

/// Cycle length as the engine uses it. A zero length would make the
/// modulo undefined, so it is treated as a one-day cycle.
fn effective_length(profile: &CycleProfile) -> u32 {
    profile.cycle_length.max(1)
}

/// Cycle day (`1..=cycle_length`) for `target`, or `None` before the
/// recorded period start.
pub fn cycle_day_for_date(profile: &CycleProfile, target: NaiveDate) -> Option<u32> {
    let days_since_start = days_between(profile.last_period_date, target);
    if days_since_start < 0 {
        return None;
    }

    let length = i64::from(effective_length(profile));
    // rem_euclid keeps the result in 0..length, so the cast cannot truncate
    Some((days_since_start.rem_euclid(length) + 1) as u32)
}

/// Phase for `target`, or `None` before the recorded period start
pub fn phase_for_date(profile: &CycleProfile, target: NaiveDate) -> Option<CyclePhase> {
    cycle_day_for_date(profile, target)
        .map(|day| phase_for_cycle_day(i64::from(day), effective_length(profile)))
}

/// Phase the user is in on `today`.
///
/// A period start after `today` cannot be classified, so it reports
/// menstrual.
pub fn current_phase(profile: &CycleProfile, today: NaiveDate) -> CyclePhase {
    match phase_for_date(profile, today) {
        Some(phase) => phase,
        None => {
            tracing::debug!(
                "Period start {} is after {}, defaulting to menstrual",
                profile.last_period_date,
                today
            );
            CyclePhase::Menstrual
        }
    }
}

/// How many days (1-based) the user has been in `phase` as of `today`.
///
/// Only meaningful when `phase` is the current phase. A mismatched phase, or
/// a period start after `today`, reports 1.
pub fn days_elapsed_in_phase(profile: &CycleProfile, phase: CyclePhase, today: NaiveDate) -> u32 {
    let Some(day) = cycle_day_for_date(profile, today) else {
        return 1;
    };

    let length = effective_length(profile);
    if phase_for_cycle_day(i64::from(day), length) != phase {
        tracing::debug!(
            "Cycle day {} is not in the {} phase, reporting day 1",
            day,
            phase
        );
        return 1;
    }

    match phase {
        CyclePhase::Menstrual => day,
        CyclePhase::Follicular => day - MENSTRUAL_DAYS as u32,
        CyclePhase::Ovulation => 1,
        CyclePhase::Luteal => day - length / 2,
    }
}

/// Everything the dashboard card needs for `today`
pub fn snapshot(profile: &CycleProfile, today: NaiveDate) -> PhaseSnapshot {
    let cycle_day = cycle_day_for_date(profile, today);
    let phase = current_phase(profile, today);
    let days_in_phase = days_elapsed_in_phase(profile, phase, today);
    let days_until_next_period = cycle_day.map(|day| effective_length(profile) - day + 1);

    tracing::info!(
        "Snapshot for {}: cycle day {:?}, {} (day {} of phase)",
        today,
        cycle_day,
        phase,
        days_in_phase
    );

    PhaseSnapshot {
        date: today,
        cycle_day,
        phase,
        days_in_phase,
        days_until_next_period,
        info: crate::content::phase_info(phase),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile_28() -> CycleProfile {
        CycleProfile::new(date(2024, 1, 1), 28)
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(days_between(date(2024, 1, 1), date(2024, 1, 14)), 13);
        assert_eq!(days_between(date(2024, 1, 14), date(2024, 1, 1)), -13);
        assert_eq!(days_between(date(2024, 2, 28), date(2024, 3, 1)), 2);
    }

    #[test]
    fn test_days_between_instants_ignores_time_of_day() {
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 0, 1, 0).unwrap();
        assert_eq!(days_between_instants(&late, &early), 1);

        let morning = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        assert_eq!(days_between_instants(&early, &morning), 0);
    }

    #[test]
    fn test_days_between_instants_uses_local_dates() {
        // 22:00 UTC on Mar 30 is already Mar 31 in UTC+3
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let from = tz.with_ymd_and_hms(2024, 3, 31, 1, 0, 0).unwrap();
        let to = tz.with_ymd_and_hms(2024, 4, 1, 23, 0, 0).unwrap();
        assert_eq!(days_between_instants(&from, &to), 1);
    }

    #[test]
    fn test_phase_partition_for_28_day_cycle() {
        for day in 1..=5 {
            assert_eq!(phase_for_cycle_day(day, 28), CyclePhase::Menstrual, "day {}", day);
        }
        for day in 6..=13 {
            assert_eq!(phase_for_cycle_day(day, 28), CyclePhase::Follicular, "day {}", day);
        }
        assert_eq!(phase_for_cycle_day(14, 28), CyclePhase::Ovulation);
        for day in 15..=28 {
            assert_eq!(phase_for_cycle_day(day, 28), CyclePhase::Luteal, "day {}", day);
        }
    }

    #[test]
    fn test_non_positive_cycle_day_is_menstrual() {
        assert_eq!(phase_for_cycle_day(0, 28), CyclePhase::Menstrual);
        assert_eq!(phase_for_cycle_day(-7, 28), CyclePhase::Menstrual);
    }

    #[test]
    fn test_short_cycle_has_no_follicular_window() {
        // Midpoint 5 is swallowed by the menstrual window, so ovulation never
        // appears and every day after 5 is luteal.
        let phases: Vec<_> = (1..=10).map(|d| phase_for_cycle_day(d, 10)).collect();
        assert!(phases[..5].iter().all(|p| *p == CyclePhase::Menstrual));
        assert!(phases[5..].iter().all(|p| *p == CyclePhase::Luteal));
        assert!(!phases.contains(&CyclePhase::Follicular));
        assert!(!phases.contains(&CyclePhase::Ovulation));
    }

    #[test]
    fn test_twelve_day_cycle_goes_straight_to_ovulation() {
        assert_eq!(phase_for_cycle_day(5, 12), CyclePhase::Menstrual);
        assert_eq!(phase_for_cycle_day(6, 12), CyclePhase::Ovulation);
        assert_eq!(phase_for_cycle_day(7, 12), CyclePhase::Luteal);
    }

    #[test]
    fn test_example_scenarios() {
        let profile = profile_28();

        assert_eq!(cycle_day_for_date(&profile, date(2024, 1, 1)), Some(1));
        assert_eq!(current_phase(&profile, date(2024, 1, 1)), CyclePhase::Menstrual);

        assert_eq!(cycle_day_for_date(&profile, date(2024, 1, 14)), Some(14));
        assert_eq!(current_phase(&profile, date(2024, 1, 14)), CyclePhase::Ovulation);

        assert_eq!(cycle_day_for_date(&profile, date(2024, 1, 29)), Some(1));
        assert_eq!(current_phase(&profile, date(2024, 1, 29)), CyclePhase::Menstrual);
    }

    #[test]
    fn test_dates_before_start_have_no_cycle_day() {
        let profile = profile_28();
        assert_eq!(cycle_day_for_date(&profile, date(2023, 12, 31)), None);
        assert_eq!(phase_for_date(&profile, date(2023, 12, 31)), None);
        assert_eq!(cycle_day_for_date(&profile, date(2020, 6, 1)), None);
    }

    #[test]
    fn test_future_start_defaults_to_menstrual() {
        let profile = CycleProfile::new(date(2024, 3, 1), 28);
        assert_eq!(current_phase(&profile, date(2024, 2, 1)), CyclePhase::Menstrual);
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Menstrual, date(2024, 2, 1)),
            1
        );
    }

    #[test]
    fn test_cycle_day_always_within_cycle_length() {
        for length in [1u32, 10, 21, 28, 35, 40] {
            let profile = CycleProfile::new(date(2024, 1, 1), length);
            for offset in 0..400 {
                let day = cycle_day_for_date(&profile, date(2024, 1, 1) + Duration::days(offset))
                    .unwrap();
                assert!(
                    (1..=length).contains(&day),
                    "length {} offset {} gave day {}",
                    length,
                    offset,
                    day
                );
            }
        }
    }

    #[test]
    fn test_cycle_day_repeats_every_cycle_length() {
        for length in [21u32, 28, 33] {
            let profile = CycleProfile::new(date(2024, 1, 1), length);
            for offset in 0..120 {
                let day = date(2024, 1, 1) + Duration::days(offset);
                let later = day + Duration::days(i64::from(length));
                assert_eq!(
                    cycle_day_for_date(&profile, day),
                    cycle_day_for_date(&profile, later)
                );
            }
        }
    }

    #[test]
    fn test_zero_length_does_not_panic() {
        let profile = CycleProfile::new(date(2024, 1, 1), 0);
        assert_eq!(cycle_day_for_date(&profile, date(2024, 1, 20)), Some(1));
        assert_eq!(current_phase(&profile, date(2024, 1, 20)), CyclePhase::Menstrual);
    }

    #[test]
    fn test_days_elapsed_in_each_phase() {
        let profile = profile_28();

        // cycle day 3
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Menstrual, date(2024, 1, 3)),
            3
        );
        // cycle day 9
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Follicular, date(2024, 1, 9)),
            4
        );
        // cycle day 14
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Ovulation, date(2024, 1, 14)),
            1
        );
        // cycle day 20
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Luteal, date(2024, 1, 20)),
            6
        );
    }

    #[test]
    fn test_days_elapsed_for_mismatched_phase_is_one() {
        let profile = profile_28();
        // cycle day 20 is luteal
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Follicular, date(2024, 1, 20)),
            1
        );
        assert_eq!(
            days_elapsed_in_phase(&profile, CyclePhase::Menstrual, date(2024, 1, 20)),
            1
        );
    }

    #[test]
    fn test_snapshot() {
        crate::logging::init_test();
        let profile = profile_28();
        let snap = snapshot(&profile, date(2024, 1, 20));

        assert_eq!(snap.cycle_day, Some(20));
        assert_eq!(snap.phase, CyclePhase::Luteal);
        assert_eq!(snap.days_in_phase, 6);
        assert_eq!(snap.days_until_next_period, Some(9));
        assert_eq!(snap.info.phase, CyclePhase::Luteal);
    }

    #[test]
    fn test_snapshot_before_start() {
        let profile = profile_28();
        let snap = snapshot(&profile, date(2023, 12, 25));

        assert_eq!(snap.cycle_day, None);
        assert_eq!(snap.phase, CyclePhase::Menstrual);
        assert_eq!(snap.days_in_phase, 1);
        assert_eq!(snap.days_until_next_period, None);
    }
}
