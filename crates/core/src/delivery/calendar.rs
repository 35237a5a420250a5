use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::delivery::{BusyPeriod, QuantityThreshold};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advances `days` weekdays past `start`. The start date itself is never counted, so any
/// positive count lands strictly after it; zero returns `start` unchanged.
pub fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut current = start;
    let mut counted = 0;

    while counted < days {
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if is_business_day(current) {
            counted += 1;
        }
    }

    current
}

/// First declared period containing `date`. Overlaps resolve by declaration order only.
pub fn find_busy_period(periods: &[BusyPeriod], date: NaiveDate) -> Option<&BusyPeriod> {
    periods.iter().find(|period| period.contains(date))
}

/// Days of the first band whose ceiling reaches `quantity`. A table without a covering band
/// falls back to its last band.
pub fn quantity_surcharge_days(thresholds: &[QuantityThreshold], quantity: u32) -> u32 {
    thresholds
        .iter()
        .find(|band| band.covers(quantity))
        .or_else(|| thresholds.last())
        .map_or(0, |band| band.additional_days)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};

    use super::{add_business_days, find_busy_period, is_business_day, quantity_surcharge_days};
    use crate::domain::delivery::{BusyPeriod, MonthDay, QuantityThreshold};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn period(label: &str, start: (u32, u32), end: (u32, u32), days: u32) -> BusyPeriod {
        BusyPeriod {
            label: label.to_string(),
            start: MonthDay::new(start.0, start.1),
            end: MonthDay::new(end.0, end.1),
            additional_days: days,
        }
    }

    #[test]
    fn five_business_days_from_monday_is_next_monday() {
        let monday = date(2026, 10, 19);
        assert_eq!(monday.weekday(), Weekday::Mon);

        assert_eq!(add_business_days(monday, 5), date(2026, 10, 26));
    }

    #[test]
    fn friday_plus_one_skips_the_weekend() {
        let friday = date(2026, 10, 23);
        assert_eq!(add_business_days(friday, 1), date(2026, 10, 26));
    }

    #[test]
    fn weekend_start_counts_from_the_following_monday() {
        let saturday = date(2026, 10, 24);
        assert_eq!(add_business_days(saturday, 1), date(2026, 10, 26));
        assert_eq!(add_business_days(saturday, 0), saturday);
    }

    #[test]
    fn result_is_always_a_business_day_strictly_after_start() {
        let start = date(2026, 1, 1);
        for offset in 0..14 {
            let from = start + chrono::Duration::days(offset);
            for days in 1..12 {
                let landed = add_business_days(from, days);
                assert!(landed > from);
                assert!(is_business_day(landed));
            }
        }
    }

    #[test]
    fn overlapping_busy_periods_resolve_to_first_declared() {
        let periods = vec![
            period("Broad", (11, 1), (12, 31), 2),
            period("Narrow", (12, 1), (12, 10), 7),
        ];

        let matched = find_busy_period(&periods, date(2026, 12, 5)).expect("in a busy period");
        assert_eq!(matched.label, "Broad");

        let reversed: Vec<BusyPeriod> = periods.into_iter().rev().collect();
        let matched = find_busy_period(&reversed, date(2026, 12, 5)).expect("in a busy period");
        assert_eq!(matched.label, "Narrow");
    }

    #[test]
    fn dates_outside_every_period_match_nothing() {
        let periods = vec![period("Summer", (5, 15), (7, 31), 3)];
        assert!(find_busy_period(&periods, date(2026, 8, 1)).is_none());
        assert!(find_busy_period(&periods, date(2026, 5, 14)).is_none());
    }

    #[test]
    fn quantity_bands_use_first_covering_band() {
        let bands = vec![
            QuantityThreshold { max_quantity: Some(100), additional_days: 0 },
            QuantityThreshold { max_quantity: Some(300), additional_days: 3 },
            QuantityThreshold { max_quantity: Some(1000), additional_days: 5 },
            QuantityThreshold { max_quantity: None, additional_days: 8 },
        ];

        assert_eq!(quantity_surcharge_days(&bands, 100), 0);
        assert_eq!(quantity_surcharge_days(&bands, 101), 3);
        assert_eq!(quantity_surcharge_days(&bands, 300), 3);
        assert_eq!(quantity_surcharge_days(&bands, 5000), 8);
    }

    #[test]
    fn missing_unbounded_band_falls_back_to_last() {
        let bands = vec![QuantityThreshold { max_quantity: Some(500), additional_days: 2 }];
        assert_eq!(quantity_surcharge_days(&bands, 900), 2);
        assert_eq!(quantity_surcharge_days(&[], 900), 0);
    }
}
