use std::time::{SystemTime, UNIX_EPOCH};

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const NANOS_PER_MILLI: i128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalText {
    Date(Date),
    DateTime(OffsetDateTime),
}

#[must_use]
pub fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
        })
}

#[must_use]
pub fn format_unix_ms(timestamp_unix_ms: u64) -> String {
    let nanos = i128::from(timestamp_unix_ms)
        .checked_mul(NANOS_PER_MILLI)
        .unwrap_or(i128::MAX);
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    )
}

/// Recognizes the textual date and datetime shapes SQL engines commonly
/// hand back: RFC 3339, `YYYY-MM-DD`, and `YYYY-MM-DD[ T]HH:MM:SS[.fff]`.
/// Datetimes without an offset are read as UTC.
#[must_use]
pub fn parse_temporal_text(raw: &str) -> Option<TemporalText> {
    let candidate = raw.trim();
    // Cheap shape check before trying the parsers: every accepted form
    // starts with a four digit year followed by `-`.
    let bytes = candidate.as_bytes();
    if bytes.len() < 10 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
        return Some(TemporalText::DateTime(parsed));
    }

    if let Ok(date) = Date::parse(candidate, format_description!("[year]-[month]-[day]")) {
        return Some(TemporalText::Date(date));
    }

    parse_naive_datetime(candidate).map(|naive| TemporalText::DateTime(naive.assume_utc()))
}

fn parse_naive_datetime(candidate: &str) -> Option<PrimitiveDateTime> {
    let formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ];

    formats
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(candidate, format).ok())
}

#[must_use]
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[must_use]
pub fn format_datetime(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::{TemporalText, format_date, format_datetime, format_unix_ms, parse_temporal_text};

    #[test]
    fn formats_unix_millis_as_utc() {
        assert_eq!(format_unix_ms(1_770_274_803_042), "2026-02-05T07:00:03.042Z");
    }

    #[test]
    fn parses_plain_dates() {
        assert_eq!(
            parse_temporal_text("2024-03-09"),
            Some(TemporalText::Date(date!(2024 - 03 - 09)))
        );
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_temporal_text("2026-02-05T09:00:03+02:00");
        assert_eq!(
            parsed,
            Some(TemporalText::DateTime(datetime!(2026-02-05 09:00:03 +02:00)))
        );
    }

    #[test]
    fn parses_sqlite_datetime_text_as_utc() {
        assert_eq!(
            parse_temporal_text("2024-03-09 13:45:00"),
            Some(TemporalText::DateTime(datetime!(2024-03-09 13:45:00 UTC)))
        );
        assert!(parse_temporal_text("2024-03-09T13:45:00.250").is_some());
    }

    #[test]
    fn rejects_non_temporal_text() {
        assert_eq!(parse_temporal_text("next friday"), None);
        assert_eq!(parse_temporal_text("2024"), None);
        assert_eq!(parse_temporal_text("2024-13-45"), None);
        assert_eq!(parse_temporal_text("1234-ab-cdef"), None);
    }

    #[test]
    fn formats_round_trip_shapes() {
        assert_eq!(format_date(date!(2024 - 01 - 05)), "2024-01-05");
        assert_eq!(
            format_datetime(datetime!(2024-01-05 10:30:00 UTC)),
            "2024-01-05T10:30:00Z"
        );
    }
}
