//! Daily run scheduling for the daemon.

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Weekday};

/// Next weekday occurrence of `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let mut date = now.date();
    if now.time() >= at {
        date = date + Days::new(1);
    }
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date = date + Days::new(1);
    }
    date.and_time(at)
}

/// Wall-clock time from `now` until the next run.
pub fn duration_until_next_run(now: NaiveDateTime, at: NaiveTime) -> std::time::Duration {
    (next_run_after(now, at) - now)
        .to_std()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn six_pm() -> NaiveTime {
        NaiveTime::from_hms_opt(18, 0, 0).unwrap()
    }

    #[test]
    fn test_later_today() {
        // Tuesday morning
        assert_eq!(next_run_after(at(2024, 5, 7, 9, 0), six_pm()), at(2024, 5, 7, 18, 0));
    }

    #[test]
    fn test_after_run_time_moves_to_tomorrow() {
        assert_eq!(next_run_after(at(2024, 5, 7, 18, 0), six_pm()), at(2024, 5, 8, 18, 0));
    }

    #[test]
    fn test_skips_weekend() {
        // Friday evening -> Monday
        assert_eq!(next_run_after(at(2024, 5, 10, 19, 30), six_pm()), at(2024, 5, 13, 18, 0));
        // Saturday morning -> Monday
        assert_eq!(next_run_after(at(2024, 5, 11, 8, 0), six_pm()), at(2024, 5, 13, 18, 0));
    }

    #[test]
    fn test_duration_until_next_run() {
        let wait = duration_until_next_run(at(2024, 5, 7, 17, 30), six_pm());
        assert_eq!(wait, std::time::Duration::from_secs(30 * 60));
    }
}
