use chrono::{Duration, NaiveDate};

/// An inclusive calendar-day window handed to a single provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Splits `[from, to]` into consecutive windows of at most `chunk_days`
/// calendar days each. Used to stay under per-request limits of upstream
/// providers.
///
/// Degenerate inputs (`from > to` or `chunk_days == 0`) yield no windows.
pub fn split_date_range(from: NaiveDate, to: NaiveDate, chunk_days: u32) -> Vec<DateRange> {
    if from > to || chunk_days == 0 {
        return Vec::new();
    }

    let step = Duration::days(i64::from(chunk_days));
    let mut chunks = Vec::new();
    let mut cur = from;
    while cur <= to {
        let end = (cur + step - Duration::days(1)).min(to);
        chunks.push(DateRange { from: cur, to: end });
        cur += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn single_chunk() {
        let chunks = split_date_range(date(1, 1), date(1, 10), 60);
        assert_eq!(
            chunks,
            vec![DateRange {
                from: date(1, 1),
                to: date(1, 10)
            }]
        );
    }

    #[test]
    fn multiple_chunks() {
        let chunks = split_date_range(date(1, 1), date(3, 31), 30);
        assert_eq!(chunks.len(), 4);
        assert_eq!(
            chunks[0],
            DateRange {
                from: date(1, 1),
                to: date(1, 30)
            }
        );
        assert_eq!(
            chunks[3],
            DateRange {
                from: date(3, 31),
                to: date(3, 31)
            }
        );
    }

    #[test]
    fn exact_chunk_boundary() {
        let chunks = split_date_range(date(1, 1), date(1, 30), 30);
        assert_eq!(
            chunks,
            vec![DateRange {
                from: date(1, 1),
                to: date(1, 30)
            }]
        );
    }

    #[test]
    fn from_after_to_is_empty() {
        assert!(split_date_range(date(3, 1), date(1, 1), 30).is_empty());
    }

    #[test]
    fn zero_chunk_days_is_empty() {
        assert!(split_date_range(date(1, 1), date(1, 10), 0).is_empty());
    }

    #[test]
    fn same_day_is_one_chunk() {
        let chunks = split_date_range(date(1, 1), date(1, 1), 30);
        assert_eq!(
            chunks,
            vec![DateRange {
                from: date(1, 1),
                to: date(1, 1)
            }]
        );
    }
}
