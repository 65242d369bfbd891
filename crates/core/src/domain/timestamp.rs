//! Lenient timestamp handling for backend payloads.
//!
//! The backend emits SQLite `CURRENT_TIMESTAMP` strings (`2024-05-01 09:30:00`) for most
//! columns and RFC 3339 for a few. Anything that cannot be parsed decodes to `None` so a
//! malformed field renders as "Unknown" instead of failing the whole payload.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub mod lenient {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::parse_timestamp;

    #[test]
    fn parses_sqlite_current_timestamp() {
        let parsed = parse_timestamp("2024-05-01 09:30:15").expect("sqlite timestamp");
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 5, 1));
        assert_eq!((parsed.hour(), parsed.minute(), parsed.second()), (9, 30, 15));
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_timestamp("2024-05-01T11:30:15+02:00").expect("rfc3339 timestamp");
        assert_eq!(parsed.hour(), 9);
    }

    #[test]
    fn garbage_and_blank_values_decode_to_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
