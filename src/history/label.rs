use time::{Date, OffsetDateTime, UtcOffset};

/// Calendar date of a timestamp as seen in the display offset.
pub fn local_date(ts: OffsetDateTime, offset: UtcOffset) -> Date {
    ts.to_offset(offset).date()
}

/// Relative label for a day: "Today", "Yesterday", the weekday name for the
/// trailing six days, otherwise "Month Day, Year".
///
/// Compares whole calendar dates; time of day on either side never shifts
/// the result. `today` is always passed in so callers can pin the clock.
pub fn day_label(date: Date, today: Date) -> String {
    let days_back = (today - date).whole_days();
    match days_back {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => date.weekday().to_string(),
        _ => format!("{} {}, {}", date.month(), date.day(), date.year()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    const TODAY: Date = date!(2024 - 03 - 20);

    #[test]
    fn same_day_is_today() {
        assert_eq!(day_label(date!(2024 - 03 - 20), TODAY), "Today");
    }

    #[test]
    fn one_day_back_is_yesterday() {
        assert_eq!(day_label(date!(2024 - 03 - 19), TODAY), "Yesterday");
    }

    #[test]
    fn trailing_week_uses_weekday_names() {
        assert_eq!(day_label(date!(2024 - 03 - 18), TODAY), "Monday");
        assert_eq!(day_label(date!(2024 - 03 - 17), TODAY), "Sunday");
        assert_eq!(day_label(date!(2024 - 03 - 15), TODAY), "Friday");
        // Six days back is the last day still labelled by weekday.
        assert_eq!(day_label(date!(2024 - 03 - 14), TODAY), "Thursday");
    }

    #[test]
    fn seven_days_back_is_a_full_date() {
        assert_eq!(day_label(date!(2024 - 03 - 13), TODAY), "March 13, 2024");
    }

    #[test]
    fn older_dates_are_full_dates() {
        assert_eq!(day_label(date!(2024 - 02 - 15), TODAY), "February 15, 2024");
        assert_eq!(day_label(date!(2023 - 12 - 25), TODAY), "December 25, 2023");
    }

    #[test]
    fn future_dates_are_full_dates() {
        assert_eq!(day_label(date!(2024 - 03 - 21), TODAY), "March 21, 2024");
    }

    #[test]
    fn label_ignores_time_of_day() {
        let late = local_date(datetime!(2024 - 03 - 19 23:59 UTC), UtcOffset::UTC);
        let early = local_date(datetime!(2024 - 03 - 19 00:01 UTC), UtcOffset::UTC);
        assert_eq!(day_label(late, TODAY), "Yesterday");
        assert_eq!(day_label(early, TODAY), "Yesterday");
    }

    #[test]
    fn local_date_respects_offset() {
        // 23:30 UTC is already the next day at +02:00.
        let ts = datetime!(2024 - 03 - 19 23:30 UTC);
        assert_eq!(local_date(ts, UtcOffset::UTC), date!(2024 - 03 - 19));
        assert_eq!(local_date(ts, offset!(+2)), date!(2024 - 03 - 20));
    }
}
