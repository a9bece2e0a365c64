//! Timestamp and date parsing shared by the store, the REST surface, and the CLI.

use chrono::{prelude::*, Duration, SecondsFormat};

use crate::error::{Result, TaskError};

const LOCAL_INPUT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a task timestamp. Accepts RFC 3339 instants and `datetime-local` style
/// inputs (`2024-01-01T09:00`), the latter resolved in the local time zone.
pub fn parse_timestamp(spec: &str) -> Result<DateTime<Utc>> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(TaskError::validation("Timestamp cannot be empty"));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in LOCAL_INPUT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    TaskError::validation(format!("Could not resolve local time for '{trimmed}'"))
                });
        }
    }

    Err(TaskError::validation(format!(
        "Unrecognized timestamp '{trimmed}'. Use RFC 3339 (2024-01-01T09:00:00Z) or YYYY-MM-DDTHH:MM"
    )))
}

/// Canonical wire and storage form: RFC 3339, UTC, millisecond precision.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lenient read path for stored values, which may also carry SQLite's
/// `CURRENT_TIMESTAMP` layout.
pub fn parse_stored_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, SQLITE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a calendar day for timeline and calendar queries.
pub fn parse_date(spec: &str) -> Result<NaiveDate> {
    let trimmed = spec.trim();
    let today = Local::now().date_naive();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        TaskError::validation(format!(
            "Unrecognized date '{trimmed}'. Try YYYY-MM-DD, today, tomorrow"
        ))
    })
}

pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&super::super::format_timestamp(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::super::parse_timestamp(&raw)
                    .map(Some)
                    .map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-01-01T09:00:00Z", 9)]
    #[case("2024-01-01T09:00:00.000Z", 9)]
    #[case("2024-01-01T11:00:00+02:00", 9)]
    fn parses_rfc3339_instants(#[case] input: &str, #[case] hour: u32) {
        let parsed = parse_timestamp(input).unwrap();
        assert_eq!(parsed.hour(), hour);
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn parses_datetime_local_inputs() {
        let parsed = parse_timestamp("2024-03-05T14:30").unwrap();
        let local = parsed.with_timezone(&Local);
        assert_eq!(local.hour(), 14);
        assert_eq!(local.minute(), 30);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not a date")]
    #[case("2024-13-40T99:00")]
    fn rejects_unparsable_timestamps(#[case] input: &str) {
        assert!(matches!(
            parse_timestamp(input),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn formats_with_millis_and_z_suffix() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-01T09:00:00.000Z");
    }

    #[test]
    fn stored_timestamps_accept_sqlite_layout() {
        let parsed = parse_stored_timestamp("2024-02-03 04:05:06").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap());
        assert!(parse_stored_timestamp("garbage").is_none());
    }

    #[test]
    fn parses_relative_and_iso_dates() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date("today").unwrap(), today);
        assert_eq!(parse_date("tomorrow").unwrap(), today + Duration::days(1));
        assert_eq!(
            parse_date("2024-06-30").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        );
        assert!(parse_date("30/06/2024").is_err());
    }
}
