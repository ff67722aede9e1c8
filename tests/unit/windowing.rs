//! Window planning properties over many ranges

use chrono::{Days, NaiveDate};
use plenary_speech_downloader::window::{plan_windows, WindowError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_windows_cover_range_exactly() {
    let base = date(2015, 12, 20);
    for span in [0u64, 1, 2, 29, 30, 31, 32, 59, 61, 365, 400] {
        for max_days in [1u32, 2, 7, 30, 31, 90] {
            let start = base;
            let end = base.checked_add_days(Days::new(span)).unwrap();
            let windows = plan_windows(start, end, max_days).unwrap();

            assert_eq!(windows.first().unwrap().start, start);
            assert_eq!(windows.last().unwrap().end, end);

            for w in &windows {
                assert!(w.start <= w.end);
                assert!(w.days() >= 1 && w.days() <= i64::from(max_days));
            }
            for pair in windows.windows(2) {
                assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
            }

            let total: i64 = windows.iter().map(|w| w.days()).sum();
            assert_eq!(total, span as i64 + 1, "span {span}, max {max_days}");
        }
    }
}

#[test]
fn test_leap_year_february() {
    let windows = plan_windows(date(2020, 2, 1), date(2020, 3, 31), 29).unwrap();
    assert_eq!(windows[0].end, date(2020, 2, 29));
    assert_eq!(windows[1].start, date(2020, 3, 1));
}

#[test]
fn test_invalid_inputs() {
    assert_eq!(
        plan_windows(date(2020, 1, 2), date(2020, 1, 1), 31),
        Err(WindowError::InvalidRange {
            start: date(2020, 1, 2),
            end: date(2020, 1, 1)
        })
    );
    assert_eq!(
        plan_windows(date(2020, 1, 1), date(2020, 1, 1), 0),
        Err(WindowError::ZeroLength)
    );
}
