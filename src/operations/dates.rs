//! Count how many dates in a file fall on a given weekday

use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::{read_text, saved_to, write_output};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use tracing::debug;

/// Date-only formats tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%d/%m/%Y",
];

/// Date-time formats tried in order
const DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub async fn count_days(call: &ValidatedCall) -> Result<String> {
    let weekday = parse_weekday(call.text("days")?)?;
    let input = call.path("input")?;
    let output = call.path("output")?;

    let content = read_text(input).await?;
    let count = count_weekday(&content, weekday);
    debug!(?weekday, count, "counted dates");

    write_output(output, count.to_string()).await?;
    Ok(saved_to(output))
}

/// Lines that do not parse as a date are skipped
pub fn count_weekday(content: &str, weekday: Weekday) -> usize {
    content
        .lines()
        .filter_map(|line| parse_date(line.trim()))
        .filter(|date| date.weekday() == weekday)
        .count()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// Full or abbreviated English day name, case-insensitive ("Tues", "wed")
pub fn parse_weekday(s: &str) -> Result<Weekday> {
    let lower = s.trim().to_lowercase();
    let name = lower.trim_end_matches('s');
    let days = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    if name.len() >= 2 {
        if let Some((_, day)) = days.iter().find(|(full, _)| full.starts_with(name)) {
            return Ok(*day);
        }
    }
    Err(DispatchError::invalid("days", format!("'{}' is not a day of the week", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Arguments;
    use crate::operations::catalog::OperationId;
    use serde_json::json;
    use tempfile::TempDir;

    fn call(days: &str, input: &std::path::Path, output: &std::path::Path) -> ValidatedCall {
        let arguments: Arguments = json!({
            "days": days,
            "input": input.to_str().unwrap(),
            "output": output.to_str().unwrap(),
        })
        .as_object()
        .cloned()
        .unwrap();
        ValidatedCall {
            operation: OperationId::CountDays,
            arguments,
        }
    }

    #[test]
    fn test_parse_weekday_variants() {
        assert_eq!(parse_weekday("Monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("Mondays").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("Tues").unwrap(), Weekday::Tue);
        assert_eq!(parse_weekday("wed").unwrap(), Weekday::Wed);
        assert_eq!(parse_weekday("THURSDAY").unwrap(), Weekday::Thu);
        assert_eq!(parse_weekday("Su").unwrap(), Weekday::Sun);
        assert!(parse_weekday("Funday").is_err());
        assert!(parse_weekday("").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        for s in [
            "2024-03-14",
            "2024/03/14",
            "14-Mar-2024",
            "Mar 14, 2024",
            "2024/03/14 10:22:05",
            "2024-03-14T08:00:00+02:00",
        ] {
            assert_eq!(parse_date(s), Some(expected), "{}", s);
        }
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_count_weekday_skips_garbage() {
        // 2024-01-01 and 2024-01-08 are Mondays
        let content = "2024-01-01\n\ngarbage\n2024-01-02\n2024/01/08 09:00:00\n";
        assert_eq!(count_weekday(content, Weekday::Mon), 2);
        assert_eq!(count_weekday(content, Weekday::Tue), 1);
        assert_eq!(count_weekday(content, Weekday::Sun), 0);
    }

    #[tokio::test]
    async fn test_single_thursday_writes_one_and_zero() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("dates.txt");
        std::fs::write(&input, "2024-03-14").unwrap();

        let out = dir.path().join("thursday.txt");
        count_days(&call("Thursday", &input, &out)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "1");

        let out = dir.path().join("friday.txt");
        count_days(&call("Friday", &input, &out)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_missing_input_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = count_days(&call(
            "Monday",
            &dir.path().join("missing.txt"),
            &dir.path().join("out.txt"),
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
        assert!(!dir.path().join("out.txt").exists());
    }
}
