use chrono::{Datelike, NaiveDate, Weekday};

/// Counts the weekdays in the inclusive range `[from, to]`.
///
/// Used as the denominator of the coverage heuristic: a rough proxy for
/// expected trading days that ignores public holidays.
pub fn count_weekdays(from: NaiveDate, to: NaiveDate) -> usize {
    let mut count = 0;
    let mut day = from;
    while day <= to {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    count
}
