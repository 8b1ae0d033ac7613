//! Utility functions and helpers.

pub mod clock;
pub mod concurrency;
pub mod http;
pub mod log;
pub mod retry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use concurrency::{Progress, run_with_limit};
pub use retry::{RetryPolicy, with_retry};

/// Parse a comma separated year list, skipping blanks and junk.
pub fn parse_year_list(raw: &str) -> Vec<i32> {
    raw.split(',')
        .filter_map(|y| y.trim().parse::<i32>().ok())
        .filter(|y| *y > 0)
        .collect()
}

/// Parse an inclusive `START-END` year range.
///
/// Returns `None` when either bound is missing or the range is reversed.
pub fn parse_year_range(raw: &str) -> Option<Vec<i32>> {
    let (start, end) = raw.split_once('-')?;
    let start: i32 = start.trim().parse().ok()?;
    let end: i32 = end.trim().parse().ok()?;
    if start <= 0 || end < start {
        return None;
    }
    Some((start..=end).collect())
}

/// Resolve sync target years: range first, then list, then `fallback`.
pub fn resolve_target_years(range: Option<&str>, list: Option<&str>, fallback: i32) -> Vec<i32> {
    if let Some(years) = range.and_then(parse_year_range) {
        return years;
    }
    if let Some(years) = list.map(parse_year_list).filter(|y| !y.is_empty()) {
        return years;
    }
    vec![fallback]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_list() {
        assert_eq!(parse_year_list("2022, 2024,,x"), vec![2022, 2024]);
        assert!(parse_year_list("").is_empty());
    }

    #[test]
    fn test_parse_year_range() {
        assert_eq!(parse_year_range("2020-2023"), Some(vec![2020, 2021, 2022, 2023]));
        assert_eq!(parse_year_range("2023-2023"), Some(vec![2023]));
        assert_eq!(parse_year_range("2024-2020"), None);
        assert_eq!(parse_year_range("2024"), None);
    }

    #[test]
    fn test_resolve_target_years() {
        assert_eq!(
            resolve_target_years(Some("2023-2024"), Some("2010"), 2026),
            vec![2023, 2024]
        );
        assert_eq!(
            resolve_target_years(Some("bad"), Some("2010,2011"), 2026),
            vec![2010, 2011]
        );
        assert_eq!(resolve_target_years(None, None, 2026), vec![2026]);
    }
}
