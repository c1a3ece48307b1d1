//! crates/omniread_core/src/streak.rs
//!
//! Calendar math for the reading-streak tracker. "Today" is always an
//! explicit argument so callers (and tests) control time; history keys are
//! ISO calendar dates in UTC, never local-format strings.

use chrono::{Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Bounds for the configurable daily reading goal, in minutes.
pub const MIN_DAILY_GOAL_MINUTES: u32 = 1;
pub const MAX_DAILY_GOAL_MINUTES: u32 = 1440;

/// The history key for one calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn validate_goal(minutes: u32) -> Result<u32, String> {
    if (MIN_DAILY_GOAL_MINUTES..=MAX_DAILY_GOAL_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(format!(
            "goalMinutes must be between {MIN_DAILY_GOAL_MINUTES} and {MAX_DAILY_GOAL_MINUTES}"
        ))
    }
}

/// One day of the weekly activity view.
#[derive(Debug, Clone, PartialEq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub minutes: u64,
    /// Share of the daily goal reached, clamped to [0, 100].
    pub percent_of_goal: f64,
}

/// Derives the Monday..Sunday activity row for the week containing `today`.
///
/// Absent dates count as zero. When `live_today_seconds` is given it stands
/// in for today's persisted bucket, so an in-session accumulator shows up
/// without waiting for the next sync.
pub fn weekly_activity(
    history: &BTreeMap<String, u64>,
    daily_goal_minutes: u32,
    today: NaiveDate,
    live_today_seconds: Option<u64>,
) -> Vec<DayActivity> {
    let monday = today.week(Weekday::Mon).first_day();
    (0..7)
        .map(|offset| {
            let date = monday + Duration::days(offset);
            let mut seconds = history.get(&date_key(date)).copied().unwrap_or(0);
            if date == today {
                if let Some(live) = live_today_seconds {
                    seconds = live;
                }
            }
            let minutes = seconds / 60;
            DayActivity {
                date,
                minutes,
                percent_of_goal: percent_of_goal(minutes, daily_goal_minutes),
            }
        })
        .collect()
}

/// Goal completion as a clamped percentage.
pub fn percent_of_goal(minutes: u64, daily_goal_minutes: u32) -> f64 {
    if daily_goal_minutes == 0 {
        return 0.0;
    }
    (minutes as f64 / daily_goal_minutes as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_keys_are_iso_calendar_dates() {
        assert_eq!(date_key(date(2024, 3, 9)), "2024-03-09");
    }

    #[test]
    fn goal_bounds_are_enforced() {
        assert!(validate_goal(0).is_err());
        assert!(validate_goal(1441).is_err());
        assert_eq!(validate_goal(1), Ok(1));
        assert_eq!(validate_goal(30), Ok(30));
        assert_eq!(validate_goal(1440), Ok(1440));
    }

    #[test]
    fn week_always_spans_monday_through_sunday() {
        // 2024-03-06 is a Wednesday; its week starts 2024-03-04.
        let days = weekly_activity(&BTreeMap::new(), 30, date(2024, 3, 6), None);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, date(2024, 3, 4));
        assert_eq!(days[6].date, date(2024, 3, 10));
    }

    #[test]
    fn goal_fraction_is_clamped_and_zero_for_absent_days() {
        // Monday: 600s at a 10-minute goal reaches exactly 100%.
        let mut history = BTreeMap::new();
        history.insert("2024-03-04".to_string(), 600);
        // Thursday overshoots the goal; the fraction must stay clamped.
        history.insert("2024-03-07".to_string(), 6000);

        let days = weekly_activity(&history, 10, date(2024, 3, 6), None);
        assert_eq!(days[0].percent_of_goal, 100.0);
        assert_eq!(days[0].minutes, 10);
        // Tuesday has no bucket at all.
        assert_eq!(days[1].percent_of_goal, 0.0);
        assert_eq!(days[1].minutes, 0);
        assert_eq!(days[3].percent_of_goal, 100.0);
    }

    #[test]
    fn live_accumulator_replaces_todays_bucket_only() {
        let mut history = BTreeMap::new();
        history.insert("2024-03-04".to_string(), 300);
        history.insert("2024-03-06".to_string(), 60);

        let days = weekly_activity(&history, 10, date(2024, 3, 6), Some(480));
        // Monday keeps its persisted value.
        assert_eq!(days[0].minutes, 5);
        // Wednesday (today) shows the live count instead of the stored 60s.
        assert_eq!(days[2].minutes, 8);
        assert_eq!(days[2].percent_of_goal, 80.0);
    }

    #[test]
    fn seconds_below_a_minute_floor_to_zero() {
        let mut history = BTreeMap::new();
        history.insert("2024-03-04".to_string(), 59);
        let days = weekly_activity(&history, 10, date(2024, 3, 4), None);
        assert_eq!(days[0].minutes, 0);
        assert_eq!(days[0].percent_of_goal, 0.0);
    }
}
