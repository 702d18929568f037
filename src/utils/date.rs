// Date expression parsing for filter values
// Absolute dates and relative expressions ("yesterday", "-7 days", "2 weeks ago")

use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, Offset, Utc};

/// SQL datetime format used for entry dates (UTC)
pub const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output format of a resolved date filter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `%Y-%m-%d %H:%M:%S`, converted to UTC
    Sql,
    /// `%Y-%m-%d` in site local time
    Local,
    /// Unix timestamp in seconds
    Unix,
}

impl DateFormat {
    /// Format a site-local datetime
    pub fn format(&self, local: NaiveDateTime, offset: FixedOffset) -> String {
        let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
        match self {
            DateFormat::Sql => utc.format(SQL_FORMAT).to_string(),
            DateFormat::Local => local.format("%Y-%m-%d").to_string(),
            DateFormat::Unix => utc.and_utc().timestamp().to_string(),
        }
    }

    /// Value used when the expression cannot be parsed (the Unix epoch)
    pub fn sentinel(&self) -> String {
        self.format(NaiveDateTime::default(), Utc.fix())
    }
}

/// Resolve a date expression into a formatted filter value.
/// Malformed expressions are logged and yield the format's sentinel.
pub fn resolve_date_value(expr: &str, format: DateFormat, now: DateTime<Utc>, offset: FixedOffset) -> String {
    match parse_relative_date(expr, now, offset) {
        Ok(local) => format.format(local, offset),
        Err(e) => {
            log::warn!("Invalid date filter value '{}': {}", expr, e);
            format.sentinel()
        }
    }
}

/// Parse an absolute or relative date expression into site-local time
pub fn parse_relative_date(expr: &str, now: DateTime<Utc>, offset: FixedOffset) -> Result<NaiveDateTime> {
    let expr = expr.trim();
    if expr.is_empty() {
        anyhow::bail!("Empty date expression");
    }

    if let Some(absolute) = parse_absolute(expr) {
        return Ok(absolute);
    }

    let local_now = now.with_timezone(&offset).naive_local();
    let midnight = local_now.date().and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    let lower = expr.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    let mut i = 0;

    let mut current = match tokens[0] {
        "now" => { i += 1; local_now }
        "today" | "midnight" => { i += 1; midnight }
        "yesterday" => { i += 1; midnight - Duration::days(1) }
        "tomorrow" => { i += 1; midnight + Duration::days(1) }
        _ => local_now,
    };

    if i == 0 && tokens.len() < 2 {
        anyhow::bail!("Unsupported date expression: {}", expr);
    }

    while i < tokens.len() {
        let amount: i64 = match tokens[i] {
            "next" => 1,
            "last" => -1,
            t => t.parse().map_err(|_| anyhow::anyhow!("Unsupported date expression: {}", expr))?,
        };
        let unit = tokens.get(i + 1)
            .ok_or_else(|| anyhow::anyhow!("Missing unit in date expression: {}", expr))?;
        i += 2;

        let amount = if tokens.get(i) == Some(&"ago") {
            i += 1;
            -amount
        } else {
            amount
        };

        current = apply_offset(current, amount, unit)
            .ok_or_else(|| anyhow::anyhow!("Unsupported date expression: {}", expr))?;
    }

    Ok(current)
}

fn apply_offset(base: NaiveDateTime, amount: i64, unit: &str) -> Option<NaiveDateTime> {
    let unit = unit.strip_suffix('s').unwrap_or(unit);
    match unit {
        "sec" | "second" => base.checked_add_signed(Duration::seconds(amount)),
        "min" | "minute" => base.checked_add_signed(Duration::minutes(amount)),
        "hour" => base.checked_add_signed(Duration::hours(amount)),
        "day" => base.checked_add_signed(Duration::days(amount)),
        "week" => base.checked_add_signed(Duration::weeks(amount)),
        "month" => add_months(base, amount),
        "year" => add_months(base, amount.checked_mul(12)?),
        _ => None,
    }
}

fn add_months(base: NaiveDateTime, amount: i64) -> Option<NaiveDateTime> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        base.checked_add_months(months)
    } else {
        base.checked_sub_months(months)
    }
}

fn parse_absolute(expr: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(expr, format) {
            return Some(datetime);
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(expr, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a stored date value (entry property or date field) for comparison
pub fn parse_stored_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    parse_absolute(value).or_else(|| {
        value.parse::<i64>().ok()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.naive_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_absolute_dates() {
        assert_eq!(parse_relative_date("2026-01-10", now(), utc()).unwrap(), at(2026, 1, 10, 0, 0));
        assert_eq!(parse_relative_date("2026-01-10 08:15", now(), utc()).unwrap(), at(2026, 1, 10, 8, 15));
        assert_eq!(parse_relative_date("01/10/2026", now(), utc()).unwrap(), at(2026, 1, 10, 0, 0));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse_relative_date("today", now(), utc()).unwrap(), at(2026, 3, 15, 0, 0));
        assert_eq!(parse_relative_date("yesterday", now(), utc()).unwrap(), at(2026, 3, 14, 0, 0));
        assert_eq!(parse_relative_date("tomorrow", now(), utc()).unwrap(), at(2026, 3, 16, 0, 0));
        assert_eq!(parse_relative_date("now", now(), utc()).unwrap(), at(2026, 3, 15, 14, 30));
    }

    #[test]
    fn test_relative_offsets() {
        assert_eq!(parse_relative_date("-7 days", now(), utc()).unwrap(), at(2026, 3, 8, 14, 30));
        assert_eq!(parse_relative_date("2 weeks ago", now(), utc()).unwrap(), at(2026, 3, 1, 14, 30));
        assert_eq!(parse_relative_date("today +1 month", now(), utc()).unwrap(), at(2026, 4, 15, 0, 0));
        assert_eq!(parse_relative_date("last year", now(), utc()).unwrap(), at(2025, 3, 15, 14, 30));
    }

    #[test]
    fn test_site_offset_applies_to_relative_dates() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = parse_relative_date("today", now(), plus_two).unwrap();
        assert_eq!(local, at(2026, 3, 15, 0, 0));
        assert_eq!(DateFormat::Sql.format(local, plus_two), "2026-03-14 22:00:00");
        assert_eq!(DateFormat::Local.format(local, plus_two), "2026-03-15");
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(parse_relative_date("", now(), utc()).is_err());
        assert!(parse_relative_date("someday", now(), utc()).is_err());
        assert!(parse_relative_date("-7 fortnights", now(), utc()).is_err());
        assert!(parse_relative_date("3", now(), utc()).is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_sentinel() {
        assert_eq!(resolve_date_value("banana", DateFormat::Sql, now(), utc()), "1970-01-01 00:00:00");
        assert_eq!(resolve_date_value("banana", DateFormat::Unix, now(), utc()), "0");
        assert_eq!(resolve_date_value("2026-01-10", DateFormat::Unix, now(), utc()), "1768003200");
    }

    #[test]
    fn test_parse_stored_date() {
        assert_eq!(parse_stored_date("2026-01-10 08:15:00"), Some(at(2026, 1, 10, 8, 15)));
        assert_eq!(parse_stored_date("2026-01-10"), Some(at(2026, 1, 10, 0, 0)));
        assert!(parse_stored_date("").is_none());
        assert!(parse_stored_date("red").is_none());
    }
}
