use chrono::{DateTime, Local, TimeZone};

/// Placeholder shown when a date of birth is missing or unparsable
pub const MISSING_DOB: &str = "-";

/// Format an ISO-8601 instant as a `dd.mm.yyyy` date in the local zone.
pub fn format_dob(iso: Option<&str>) -> String {
    format_dob_in(iso, &Local)
}

/// Format an ISO-8601 instant as a `dd.mm.yyyy` date in `tz`.
pub fn format_dob_in<Tz: TimeZone>(iso: Option<&str>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(date) = iso.map(str::trim).filter(|s| !s.is_empty()) else {
        return MISSING_DOB.to_string();
    };

    match DateTime::parse_from_rfc3339(date) {
        Ok(dt) => dt.with_timezone(tz).format("%d.%m.%Y").to_string(),
        Err(_) => MISSING_DOB.to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_format_dob_utc() {
        assert_eq!(format_dob_in(Some("1989-05-03T00:00:00Z"), &Utc), "03.05.1989");
        assert_eq!(format_dob_in(Some("1961-12-24T18:02:45.125Z"), &Utc), "24.12.1961");
    }

    #[test]
    fn test_format_dob_shifts_to_zone() {
        let west = FixedOffset::west_opt(5 * 3600).expect("valid offset");
        assert_eq!(format_dob_in(Some("1989-05-03T00:00:00Z"), &west), "02.05.1989");
    }

    #[test]
    fn test_format_dob_missing() {
        assert_eq!(format_dob(None), "-");
        assert_eq!(format_dob(Some("")), "-");
        assert_eq!(format_dob(Some("   ")), "-");
    }

    #[test]
    fn test_format_dob_unparsable() {
        assert_eq!(format_dob(Some("yesterday")), "-");
        assert_eq!(format_dob(Some("1989-05-03")), "-"); // date without time is not an instant
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Zoë Müller", 6), "Zoë...");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some("x@example.com"), "-"), "x@example.com");
        assert_eq!(format_optional(None, "-"), "-");
    }
}
