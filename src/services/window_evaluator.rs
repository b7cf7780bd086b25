//! Recurring time window evaluation.
//!
//! Given a target instant already converted to a profile's timezone and the
//! profile's window rule list, determines whether the instant falls inside
//! any rule's active interval and computes the next instant at which the
//! activation state flips. All intervals are half-open: `from` inclusive,
//! `to` exclusive, so exact boundary instants are never double-counted.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::models::profile::{Frequency, HourMinute, TimeWindow};

/// Outcome of evaluating one profile's window list at a target instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvaluation {
    /// Whether the target falls inside some window's active interval.
    pub is_active: bool,
    /// The next instant at which the activation state flips: the end of the
    /// longest-running active window, or the start of the nearest upcoming
    /// occurrence when nothing is active. Always strictly after the target.
    pub boundary: DateTime<Utc>,
    /// Index into the evaluated window list of the rule that produced the
    /// boundary.
    pub window_index: usize,
}

/// Evaluate a profile's windows at `target`.
///
/// Windows that are malformed for their frequency, or entirely in the past
/// (spent Fixed windows), contribute nothing. Returns `None` when no window
/// yields a relevant boundary; the caller treats that as "this profile
/// currently contributes nothing".
pub fn get_active_window(target: DateTime<Tz>, windows: &[TimeWindow]) -> Option<WindowEvaluation> {
    let mut best_active: Option<(DateTime<Tz>, usize)> = None;
    let mut best_upcoming: Option<(DateTime<Tz>, usize)> = None;

    for (index, window) in windows.iter().enumerate() {
        let Some((is_active, boundary)) = evaluate_window(target, window) else {
            continue;
        };
        if is_active {
            // The profile stays active until its last active window ends.
            match best_active {
                Some((current, _)) if current >= boundary => {}
                _ => best_active = Some((boundary, index)),
            }
        } else {
            match best_upcoming {
                Some((current, _)) if current <= boundary => {}
                _ => best_upcoming = Some((boundary, index)),
            }
        }
    }

    if let Some((boundary, window_index)) = best_active {
        return Some(WindowEvaluation {
            is_active: true,
            boundary: boundary.with_timezone(&Utc),
            window_index,
        });
    }
    best_upcoming.map(|(boundary, window_index)| WindowEvaluation {
        is_active: false,
        boundary: boundary.with_timezone(&Utc),
        window_index,
    })
}

/// Evaluate one window. Returns `(is_active, boundary)` or `None` when the
/// rule contributes nothing at or after `target`.
fn evaluate_window(target: DateTime<Tz>, window: &TimeWindow) -> Option<(bool, DateTime<Tz>)> {
    match window.frequency {
        Frequency::Fixed => evaluate_fixed(target, window),
        Frequency::Daily => evaluate_daily(target, window),
        Frequency::Weekly => evaluate_weekly(target, window),
        Frequency::WeeklyRange => evaluate_weekly_range(target, window),
        Frequency::Monthly => evaluate_monthly(target, window),
    }
}

fn evaluate_fixed(target: DateTime<Tz>, window: &TimeWindow) -> Option<(bool, DateTime<Tz>)> {
    let (Some(from), Some(to)) = (window.time_from, window.time_to) else {
        warn!("fixed window missing absolute timestamps, skipping");
        return None;
    };
    if to <= from {
        warn!("fixed window has non-positive span, skipping");
        return None;
    }
    let tz = target.timezone();
    let from = from.with_timezone(&tz);
    let to = to.with_timezone(&tz);
    if target < from {
        Some((false, from))
    } else if target < to {
        Some((true, to))
    } else {
        // One-shot window entirely in the past.
        None
    }
}

fn evaluate_daily(target: DateTime<Tz>, window: &TimeWindow) -> Option<(bool, DateTime<Tz>)> {
    let (from, to) = day_bounds(window)?;
    let tz = target.timezone();
    let today = target.date_naive();

    let start = at_time_of_day(&tz, today, from);
    let end = at_time_of_day(&tz, today, to);
    if target < start {
        Some((false, start))
    } else if target < end {
        Some((true, end))
    } else {
        Some((false, at_time_of_day(&tz, today + Duration::days(1), from)))
    }
}

fn evaluate_weekly(target: DateTime<Tz>, window: &TimeWindow) -> Option<(bool, DateTime<Tz>)> {
    let (from, to) = day_bounds(window)?;
    if window.weekdays.is_empty() {
        warn!("weekly window has no weekdays, skipping");
        return None;
    }
    let tz = target.timezone();
    let today = target.date_naive();

    for day_offset in 0..=7i64 {
        let date = today + Duration::days(day_offset);
        if !window.weekdays.contains(&date.weekday()) {
            continue;
        }
        let start = at_time_of_day(&tz, date, from);
        let end = at_time_of_day(&tz, date, to);
        if target < start {
            return Some((false, start));
        }
        if target < end {
            return Some((true, end));
        }
        // Today's occurrence already over; keep looking forward.
    }
    None
}

fn evaluate_weekly_range(target: DateTime<Tz>, window: &TimeWindow) -> Option<(bool, DateTime<Tz>)> {
    let (Some(hm_from), Some(hm_to)) = (window.hour_minute_from, window.hour_minute_to) else {
        warn!("weekly range window missing time-of-day bounds, skipping");
        return None;
    };
    let (Some(weekday_from), Some(weekday_to)) = (window.weekday_from, window.weekday_to) else {
        warn!("weekly range window missing weekday bounds, skipping");
        return None;
    };
    let tz = target.timezone();
    let today = target.date_naive();

    // Most recent start weekday on or before today.
    let days_back = (today.weekday().num_days_from_monday() + 7
        - weekday_from.num_days_from_monday())
        % 7;
    let start_date = today - Duration::days(days_back as i64);
    let span_days = (weekday_to.num_days_from_monday() + 7 - weekday_from.num_days_from_monday())
        % 7;
    let mut end_date = start_date + Duration::days(span_days as i64);

    let start = at_time_of_day(&tz, start_date, hm_from);
    let mut end = at_time_of_day(&tz, end_date, hm_to);
    if end <= start {
        // Same weekday with a non-positive time span wraps a full week.
        end_date += Duration::days(7);
        end = at_time_of_day(&tz, end_date, hm_to);
    }

    if target < start {
        // The previous occurrence may still be running (spans that wrap the
        // week boundary).
        let prev_start = at_time_of_day(&tz, start_date - Duration::days(7), hm_from);
        let prev_end = at_time_of_day(&tz, end_date - Duration::days(7), hm_to);
        if target >= prev_start && target < prev_end {
            return Some((true, prev_end));
        }
        return Some((false, start));
    }
    if target < end {
        return Some((true, end));
    }
    Some((
        false,
        at_time_of_day(&tz, start_date + Duration::days(7), hm_from),
    ))
}

fn evaluate_monthly(target: DateTime<Tz>, window: &TimeWindow) -> Option<(bool, DateTime<Tz>)> {
    let (hm_from, hm_to) = (window.hour_minute_from?, window.hour_minute_to?);
    let (Some(day_from), Some(day_to)) = (window.day_from, window.day_to) else {
        warn!("monthly window missing day-of-month bounds, skipping");
        return None;
    };
    if day_from == 0 || day_to == 0 {
        warn!("monthly window has zero day-of-month, skipping");
        return None;
    }
    let tz = target.timezone();
    let today = target.date_naive();

    let mut next_start: Option<DateTime<Tz>> = None;
    // The previous month's occurrence can reach into this month when the
    // day range wraps, so examine three consecutive months.
    for month_offset in -1..=1 {
        let (year, month) = shift_month(today.year(), today.month(), month_offset);
        let Some((start, end)) = monthly_occurrence(&tz, year, month, day_from, day_to, hm_from, hm_to)
        else {
            continue;
        };
        if target >= start && target < end {
            return Some((true, end));
        }
        if target < start {
            next_start = Some(match next_start {
                Some(current) if current <= start => current,
                _ => start,
            });
        }
    }
    next_start.map(|start| (false, start))
}

/// One month's occurrence of a day-of-month range window. Day values past
/// the month's length clamp to its last day.
fn monthly_occurrence(
    tz: &Tz,
    year: i32,
    month: u32,
    day_from: u32,
    day_to: u32,
    hm_from: HourMinute,
    hm_to: HourMinute,
) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let start_day = day_from.min(days_in_month(year, month));
    let start_date = NaiveDate::from_ymd_opt(year, month, start_day)?;

    let end_date = if day_to >= day_from {
        NaiveDate::from_ymd_opt(year, month, day_to.min(days_in_month(year, month)))?
    } else {
        let (end_year, end_month) = shift_month(year, month, 1);
        NaiveDate::from_ymd_opt(end_year, end_month, day_to.min(days_in_month(end_year, end_month)))?
    };

    let start = at_time_of_day(tz, start_date, hm_from);
    let end = at_time_of_day(tz, end_date, hm_to);
    (end > start).then_some((start, end))
}

/// Shared time-of-day bounds for daily and weekly rules. A non-positive
/// span makes the window contribute nothing.
fn day_bounds(window: &TimeWindow) -> Option<(HourMinute, HourMinute)> {
    let (Some(from), Some(to)) = (window.hour_minute_from, window.hour_minute_to) else {
        warn!("window missing time-of-day bounds, skipping");
        return None;
    };
    if to <= from {
        warn!("window has non-positive time-of-day span, skipping");
        return None;
    }
    Some((from, to))
}

/// Localize `date` at `time` in `tz`, handling DST transitions: ambiguous
/// local times resolve to the earlier instant, nonexistent ones shift
/// forward past the gap.
fn at_time_of_day(tz: &Tz, date: NaiveDate, time: HourMinute) -> DateTime<Tz> {
    let naive = date.and_time(chrono::NaiveTime::MIN) + time.since_midnight();
    resolve_local(tz, naive)
}

fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => match tz.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earlier, _) => earlier,
            LocalResult::None => tz.from_utc_datetime(&naive),
        },
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn shift_month(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + offset;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use chrono_tz::Tz;

    fn hm(h: u8, m: u8) -> HourMinute {
        HourMinute::new(h, m).unwrap()
    }

    fn at(tz: Tz, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn daily(from: HourMinute, to: HourMinute) -> TimeWindow {
        let mut w = TimeWindow::new(Frequency::Daily);
        w.hour_minute_from = Some(from);
        w.hour_minute_to = Some(to);
        w
    }

    #[test]
    fn test_fixed_window_half_open_boundaries() {
        let tz = Tz::UTC;
        let mut w = TimeWindow::new(Frequency::Fixed);
        w.time_from = Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap());
        w.time_to = Some(Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap());

        // Inclusive at the start instant.
        let at_start = get_active_window(at(tz, 2026, 3, 1, 10, 0), &[w.clone()]).unwrap();
        assert!(at_start.is_active);
        assert_eq!(at_start.boundary, w.time_to.unwrap());

        // Exclusive at the end instant: the window is spent and contributes
        // nothing.
        assert!(get_active_window(at(tz, 2026, 3, 1, 11, 0), &[w.clone()]).is_none());

        // Before the start: upcoming.
        let before = get_active_window(at(tz, 2026, 3, 1, 9, 0), &[w.clone()]).unwrap();
        assert!(!before.is_active);
        assert_eq!(before.boundary, w.time_from.unwrap());
    }

    #[test]
    fn test_daily_window_recurs() {
        let tz = Tz::UTC;
        let w = daily(hm(9, 0), hm(17, 0));

        let inside = get_active_window(at(tz, 2026, 3, 2, 12, 0), &[w.clone()]).unwrap();
        assert!(inside.is_active);
        assert_eq!(inside.boundary, Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap());

        let after = get_active_window(at(tz, 2026, 3, 2, 18, 0), &[w.clone()]).unwrap();
        assert!(!after.is_active);
        assert_eq!(after.boundary, Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());

        let before = get_active_window(at(tz, 2026, 3, 2, 8, 0), &[w]).unwrap();
        assert!(!before.is_active);
        assert_eq!(before.boundary, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_daily_full_day_covers_midnight() {
        let tz = Tz::UTC;
        let w = daily(hm(0, 0), hm(24, 0));

        let midnight = get_active_window(at(tz, 2026, 3, 2, 0, 0), &[w.clone()]).unwrap();
        assert!(midnight.is_active);
        assert_eq!(
            midnight.boundary,
            Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap()
        );

        let late = get_active_window(at(tz, 2026, 3, 2, 23, 59), &[w]).unwrap();
        assert!(late.is_active);
    }

    #[test]
    fn test_daily_respects_profile_timezone() {
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let w = daily(hm(9, 0), hm(17, 0));

        // 05:00 UTC is 10:30 in Kolkata: inside the window.
        let target = Utc
            .with_ymd_and_hms(2026, 3, 2, 5, 0, 0)
            .unwrap()
            .with_timezone(&tz);
        let eval = get_active_window(target, &[w]).unwrap();
        assert!(eval.is_active);
        // 17:00 IST is 11:30 UTC.
        assert_eq!(
            eval.boundary,
            Utc.with_ymd_and_hms(2026, 3, 2, 11, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_explicit_weekday_set() {
        let tz = Tz::UTC;
        let mut w = daily(hm(9, 0), hm(17, 0));
        w.frequency = Frequency::Weekly;
        w.weekdays = vec![Weekday::Mon, Weekday::Wed];

        // 2026-03-02 is a Monday.
        let monday = get_active_window(at(tz, 2026, 3, 2, 10, 0), &[w.clone()]).unwrap();
        assert!(monday.is_active);

        // Tuesday: next occurrence is Wednesday 09:00.
        let tuesday = get_active_window(at(tz, 2026, 3, 3, 10, 0), &[w.clone()]).unwrap();
        assert!(!tuesday.is_active);
        assert_eq!(
            tuesday.boundary,
            Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()
        );

        // Monday after hours: Wednesday is still nearer than next Monday.
        let monday_evening = get_active_window(at(tz, 2026, 3, 2, 20, 0), &[w]).unwrap();
        assert!(!monday_evening.is_active);
        assert_eq!(
            monday_evening.boundary,
            Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_range_spans_weekend() {
        let tz = Tz::UTC;
        let mut w = TimeWindow::new(Frequency::WeeklyRange);
        w.hour_minute_from = Some(hm(18, 0));
        w.hour_minute_to = Some(hm(9, 0));
        w.weekday_from = Some(Weekday::Fri);
        w.weekday_to = Some(Weekday::Mon);

        // 2026-03-07 is a Saturday: inside Fri 18:00 .. Mon 09:00.
        let saturday = get_active_window(at(tz, 2026, 3, 7, 12, 0), &[w.clone()]).unwrap();
        assert!(saturday.is_active);
        assert_eq!(
            saturday.boundary,
            Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap()
        );

        // Monday 08:59 still inside; 09:00 is out (exclusive end).
        assert!(
            get_active_window(at(tz, 2026, 3, 9, 8, 59), &[w.clone()])
                .unwrap()
                .is_active
        );
        let monday_nine = get_active_window(at(tz, 2026, 3, 9, 9, 0), &[w.clone()]).unwrap();
        assert!(!monday_nine.is_active);
        assert_eq!(
            monday_nine.boundary,
            Utc.with_ymd_and_hms(2026, 3, 13, 18, 0, 0).unwrap()
        );

        // Wednesday: upcoming Friday start.
        let wednesday = get_active_window(at(tz, 2026, 3, 4, 12, 0), &[w]).unwrap();
        assert!(!wednesday.is_active);
        assert_eq!(
            wednesday.boundary,
            Utc.with_ymd_and_hms(2026, 3, 6, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_window_and_next_month_boundary() {
        let tz = Tz::UTC;
        let mut w = TimeWindow::new(Frequency::Monthly);
        w.hour_minute_from = Some(hm(0, 0));
        w.hour_minute_to = Some(hm(23, 0));
        w.day_from = Some(1);
        w.day_to = Some(5);

        let inside = get_active_window(at(tz, 2026, 3, 3, 12, 0), &[w.clone()]).unwrap();
        assert!(inside.is_active);
        assert_eq!(
            inside.boundary,
            Utc.with_ymd_and_hms(2026, 3, 5, 23, 0, 0).unwrap()
        );

        let after = get_active_window(at(tz, 2026, 3, 20, 12, 0), &[w]).unwrap();
        assert!(!after.is_active);
        assert_eq!(
            after.boundary,
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_day_range_wraps_into_next_month() {
        let tz = Tz::UTC;
        let mut w = TimeWindow::new(Frequency::Monthly);
        w.hour_minute_from = Some(hm(22, 0));
        w.hour_minute_to = Some(hm(6, 0));
        w.day_from = Some(28);
        w.day_to = Some(2);

        // March 1st: inside the occurrence that started February 28th.
        let eval = get_active_window(at(tz, 2026, 3, 1, 12, 0), &[w]).unwrap();
        assert!(eval.is_active);
        assert_eq!(
            eval.boundary,
            Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let tz = Tz::UTC;
        let mut w = TimeWindow::new(Frequency::Monthly);
        w.hour_minute_from = Some(hm(0, 0));
        w.hour_minute_to = Some(hm(23, 0));
        w.day_from = Some(30);
        w.day_to = Some(31);

        // February 2026 has 28 days; the 30..31 range clamps to the 28th.
        let eval = get_active_window(at(tz, 2026, 2, 28, 12, 0), &[w.clone()]).unwrap();
        assert!(eval.is_active);
        assert_eq!(
            eval.boundary,
            Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap()
        );

        // Mid-February: next start is the clamped 28th, not a skipped month.
        let upcoming = get_active_window(at(tz, 2026, 2, 10, 12, 0), &[w]).unwrap();
        assert!(!upcoming.is_active);
        assert_eq!(
            upcoming.boundary,
            Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_multiple_windows_active_reports_latest_end() {
        let tz = Tz::UTC;
        let short = daily(hm(10, 0), hm(12, 0));
        let long = daily(hm(11, 0), hm(15, 0));

        let eval = get_active_window(at(tz, 2026, 3, 2, 11, 30), &[short, long]).unwrap();
        assert!(eval.is_active);
        assert_eq!(
            eval.boundary,
            Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
        );
        assert_eq!(eval.window_index, 1);
    }

    #[test]
    fn test_multiple_windows_inactive_reports_earliest_start() {
        let tz = Tz::UTC;
        let later = daily(hm(14, 0), hm(16, 0));
        let sooner = daily(hm(10, 0), hm(12, 0));

        let eval = get_active_window(at(tz, 2026, 3, 2, 8, 0), &[later, sooner]).unwrap();
        assert!(!eval.is_active);
        assert_eq!(
            eval.boundary,
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(eval.window_index, 1);
    }

    #[test]
    fn test_active_window_outranks_sooner_upcoming_start() {
        let tz = Tz::UTC;
        let active = daily(hm(10, 0), hm(14, 0));
        let upcoming = daily(hm(12, 0), hm(13, 0));

        // 11:00: inside the first window; the second starts sooner than the
        // first ends, but the profile must still report active.
        let eval = get_active_window(at(tz, 2026, 3, 2, 11, 0), &[upcoming, active]).unwrap();
        assert!(eval.is_active);
        assert_eq!(eval.window_index, 1);
    }

    #[test]
    fn test_malformed_windows_contribute_nothing() {
        let tz = Tz::UTC;
        let no_bounds = TimeWindow::new(Frequency::Daily);
        let inverted = daily(hm(17, 0), hm(9, 0));
        let mut empty_weekly = daily(hm(9, 0), hm(17, 0));
        empty_weekly.frequency = Frequency::Weekly;

        assert!(get_active_window(
            at(tz, 2026, 3, 2, 12, 0),
            &[no_bounds, inverted, empty_weekly]
        )
        .is_none());
        assert!(get_active_window(at(tz, 2026, 3, 2, 12, 0), &[]).is_none());
    }
}
