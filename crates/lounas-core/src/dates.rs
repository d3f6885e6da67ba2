//! Local-calendar-day helpers shared by the parsers and the engine.
//!
//! Freshness is always evaluated against a *reference date* — the local
//! calendar day at the caller's clock — so everything here takes or returns
//! plain [`NaiveDate`] values and leaves "now" to the call sites.

use chrono::{Datelike, Local, NaiveDate, Utc, Weekday};

/// The local calendar day used as the reference date for freshness.
#[must_use]
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD` key for a calendar day.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Lowercase English weekday token, used as the scrape provider's
/// `print_lunch_day` query parameter.
#[must_use]
pub fn weekday_token(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Resolve a year-less `D.M` date against a reference date.
///
/// Considers the reference year and its two neighbours and picks the
/// candidate closest in absolute days to the reference; this disambiguates
/// dates written near a year boundary (a `31.12.` seen on January 2nd means
/// last year, not eleven months ahead). Returns `None` when the day/month
/// pair never forms a real calendar date in any candidate year.
#[must_use]
pub fn infer_year(day: u32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let mut best: Option<(i64, NaiveDate)> = None;
    for year in [
        reference.year() - 1,
        reference.year(),
        reference.year() + 1,
    ] {
        let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        let distance = (candidate - reference).num_days().abs();
        if best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, date)| date)
}

/// Current wall-clock time as epoch milliseconds.
#[must_use]
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn date_key_is_zero_padded() {
        assert_eq!(date_key(date(2026, 2, 3)), "2026-02-03");
    }

    #[test]
    fn weekday_tokens_are_lowercase_english() {
        assert_eq!(weekday_token(date(2026, 2, 19)), "thursday");
        assert_eq!(weekday_token(date(2026, 2, 22)), "sunday");
    }

    #[test]
    fn infer_year_prefers_the_reference_year_mid_year() {
        assert_eq!(
            infer_year(20, 2, date(2026, 2, 21)),
            Some(date(2026, 2, 20))
        );
    }

    #[test]
    fn infer_year_picks_last_year_across_the_boundary() {
        // Seen on January 2nd, "31.12." means two days ago, not next December.
        assert_eq!(
            infer_year(31, 12, date(2026, 1, 2)),
            Some(date(2025, 12, 31))
        );
    }

    #[test]
    fn infer_year_picks_next_year_across_the_boundary() {
        assert_eq!(
            infer_year(2, 1, date(2025, 12, 30)),
            Some(date(2026, 1, 2))
        );
    }

    #[test]
    fn infer_year_rejects_impossible_dates() {
        assert_eq!(infer_year(31, 4, date(2026, 2, 21)), None);
        assert_eq!(infer_year(0, 1, date(2026, 2, 21)), None);
        assert_eq!(infer_year(1, 13, date(2026, 2, 21)), None);
    }

    #[test]
    fn infer_year_handles_leap_days() {
        // 29.2 exists in 2024 only; nearest candidate wins even when the
        // reference year lacks the day.
        assert_eq!(
            infer_year(29, 2, date(2025, 1, 15)),
            Some(date(2024, 2, 29))
        );
    }
}
