//! Points, levels and streaks for completed recommendations.
//!
//! Rules:
//! - Each completed activity earns base points by kind (configurable)
//! - Completing the current phase's focus activity earns a bonus
//! - Level = 1 + points / points_per_level
//! - Streak counts consecutive calendar days with at least one activity
//! - Only the most recent `MAX_HISTORY` activities are kept

use crate::{ActivityEntry, ActivityKind, Config, CyclePhase, RewardState};
use chrono::NaiveDate;
use serde::Serialize;

/// Activities kept in `RewardState::history`; older entries are dropped
pub const MAX_HISTORY: usize = 50;

/// Outcome of recording one activity
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Award {
    pub points: u32,
    pub bonus: u32,
    pub total_points: u32,
    pub level: u32,
    pub leveled_up: bool,
    pub streak_days: u32,
}

/// The activity each phase's recommendations emphasise
pub fn focus_activity(phase: CyclePhase) -> ActivityKind {
    match phase {
        CyclePhase::Menstrual => ActivityKind::Recovery,
        CyclePhase::Follicular => ActivityKind::Workout,
        CyclePhase::Ovulation => ActivityKind::Workout,
        CyclePhase::Luteal => ActivityKind::Nutrition,
    }
}

/// Level reached with `points`
pub fn level_for_points(points: u32, points_per_level: u32) -> u32 {
    1 + points / points_per_level.max(1)
}

fn base_points(kind: ActivityKind, config: &Config) -> u32 {
    match kind {
        ActivityKind::Workout => config.rewards.workout_points,
        ActivityKind::Nutrition => config.rewards.nutrition_points,
        ActivityKind::Recovery => config.rewards.recovery_points,
    }
}

/// Advance the daily streak for an activity on `on`
pub fn update_streak(rewards: &mut RewardState, on: NaiveDate) {
    match rewards.last_activity_on {
        None => rewards.streak_days = 1,
        Some(last) if on == last => {
            rewards.streak_days = rewards.streak_days.max(1);
        }
        Some(last) if on < last => {
            tracing::debug!("Backdated activity on {} does not affect streak", on);
            return;
        }
        Some(last) if last.succ_opt() == Some(on) => rewards.streak_days += 1,
        Some(_) => rewards.streak_days = 1,
    }
    rewards.last_activity_on = Some(on);
}

/// Record a completed activity and award points
pub fn record_activity(
    rewards: &mut RewardState,
    kind: ActivityKind,
    phase: CyclePhase,
    on: NaiveDate,
    config: &Config,
) -> Award {
    let points = base_points(kind, config);
    let bonus = if focus_activity(phase) == kind {
        config.rewards.phase_bonus
    } else {
        0
    };
    let earned = points.saturating_add(bonus);

    let previous_level = rewards.level;
    rewards.points = rewards.points.saturating_add(earned);
    rewards.level = level_for_points(rewards.points, config.rewards.points_per_level);
    update_streak(rewards, on);

    rewards.history.push(ActivityEntry {
        kind,
        phase,
        on,
        points: earned,
    });
    if rewards.history.len() > MAX_HISTORY {
        let excess = rewards.history.len() - MAX_HISTORY;
        rewards.history.drain(..excess);
    }

    let leveled_up = rewards.level > previous_level;
    if leveled_up {
        tracing::info!("Reached level {} with {} points", rewards.level, rewards.points);
    }
    tracing::info!(
        "Recorded {:?} during {} phase: +{} points (bonus {})",
        kind,
        phase,
        earned,
        bonus
    );

    Award {
        points,
        bonus,
        total_points: rewards.points,
        level: rewards.level,
        leveled_up,
        streak_days: rewards.streak_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_focus_activity_earns_bonus() {
        let config = Config::default();
        let mut rewards = RewardState::default();

        let award = record_activity(
            &mut rewards,
            ActivityKind::Workout,
            CyclePhase::Follicular,
            date(2024, 1, 8),
            &config,
        );
        assert_eq!(award.points, 20);
        assert_eq!(award.bonus, 5);
        assert_eq!(award.total_points, 25);
    }

    #[test]
    fn test_off_focus_activity_has_no_bonus() {
        let config = Config::default();
        let mut rewards = RewardState::default();

        let award = record_activity(
            &mut rewards,
            ActivityKind::Workout,
            CyclePhase::Menstrual,
            date(2024, 1, 2),
            &config,
        );
        assert_eq!(award.bonus, 0);
        assert_eq!(rewards.points, 20);
        assert_eq!(rewards.history.len(), 1);
    }

    #[test]
    fn test_level_up() {
        let config = Config::default();
        let mut rewards = RewardState {
            points: 90,
            ..RewardState::default()
        };

        let award = record_activity(
            &mut rewards,
            ActivityKind::Recovery,
            CyclePhase::Menstrual,
            date(2024, 1, 2),
            &config,
        );
        assert_eq!(award.total_points, 105);
        assert_eq!(award.level, 2);
        assert!(award.leveled_up);
    }

    #[test]
    fn test_history_keeps_most_recent_entries() {
        let config = Config::default();
        let mut rewards = RewardState::default();
        let start = date(2024, 1, 1);

        for offset in 0..(MAX_HISTORY as u64 + 10) {
            let on = start + chrono::Days::new(offset);
            record_activity(&mut rewards, ActivityKind::Nutrition, CyclePhase::Luteal, on, &config);
        }

        assert_eq!(rewards.history.len(), MAX_HISTORY);
        assert_eq!(rewards.history[0].on, start + chrono::Days::new(10));
        assert_eq!(
            rewards.history.last().unwrap().on,
            start + chrono::Days::new(MAX_HISTORY as u64 + 9)
        );
        // Totals still count every activity
        assert_eq!(rewards.points, 15 * (MAX_HISTORY as u32 + 10));
    }

    #[test]
    fn test_level_for_points() {
        assert_eq!(level_for_points(0, 100), 1);
        assert_eq!(level_for_points(99, 100), 1);
        assert_eq!(level_for_points(100, 100), 2);
        assert_eq!(level_for_points(350, 100), 4);
        assert_eq!(level_for_points(5, 0), 6);
    }

    #[test]
    fn test_streak_progression() {
        let mut rewards = RewardState::default();

        update_streak(&mut rewards, date(2024, 1, 1));
        assert_eq!(rewards.streak_days, 1);

        update_streak(&mut rewards, date(2024, 1, 1));
        assert_eq!(rewards.streak_days, 1);

        update_streak(&mut rewards, date(2024, 1, 2));
        update_streak(&mut rewards, date(2024, 1, 3));
        assert_eq!(rewards.streak_days, 3);

        // A missed day resets
        update_streak(&mut rewards, date(2024, 1, 5));
        assert_eq!(rewards.streak_days, 1);
        assert_eq!(rewards.last_activity_on, Some(date(2024, 1, 5)));
    }

    #[test]
    fn test_backdated_activity_keeps_streak() {
        let mut rewards = RewardState::default();
        update_streak(&mut rewards, date(2024, 1, 10));
        update_streak(&mut rewards, date(2024, 1, 11));

        update_streak(&mut rewards, date(2024, 1, 3));
        assert_eq!(rewards.streak_days, 2);
        assert_eq!(rewards.last_activity_on, Some(date(2024, 1, 11)));
    }
}
