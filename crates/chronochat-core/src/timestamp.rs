use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, VisualizeError};
use crate::{Dataset, RawValue};

/// Decimal digit count of a seconds-precision epoch between 2001 and 2286.
const EPOCH_SECONDS_DIGITS: usize = 10;

/// Last second of the year 9999; larger numbers are milli/micro/nanosecond epochs.
const MAX_EPOCH_SECONDS: f64 = 253_402_318_799.999_999;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampEncoding {
    /// Numeric seconds since the Unix epoch.
    EpochSeconds,
    /// Anything else: calendar strings, or numbers that are not 10-digit epochs.
    CalendarString,
    /// The column has no value to classify.
    Unparseable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampSpec {
    pub column: String,
    pub encoding: TimestampEncoding,
}

#[derive(Debug, Clone)]
pub struct NormalizedTimestamps {
    pub spec: TimestampSpec,
    /// One entry per dataset row, `None` where the value could not be read.
    pub values: Vec<Option<DateTime<Utc>>>,
}

impl NormalizedTimestamps {
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_none()).count()
    }
}

/// Classifies a timestamp column from its first non-missing value.
pub fn classify_timestamps<'a, I>(values: I) -> TimestampEncoding
where
    I: IntoIterator<Item = &'a RawValue>,
{
    let Some(first) = values.into_iter().find(|value| !value.is_missing()) else {
        return TimestampEncoding::Unparseable;
    };

    match first.as_f64() {
        Some(seconds) if seconds.is_finite() && integer_digits(seconds) == EPOCH_SECONDS_DIGITS => {
            TimestampEncoding::EpochSeconds
        }
        _ => TimestampEncoding::CalendarString,
    }
}

fn integer_digits(value: f64) -> usize {
    (value.trunc() as i64).to_string().len()
}

/// Converts the named column into UTC calendar timestamps, one per row.
///
/// An `EpochSeconds` column is read strictly as seconds: numeric cells and
/// numeric text convert, anything else (or anything past the year 9999) is
/// missing. Otherwise each cell is read on its own: numbers go through
/// [`scaled_epoch_to_datetime`] and text through [`parse_calendar`].
pub fn normalize_timestamps(dataset: &Dataset, column: &str) -> Result<NormalizedTimestamps> {
    let raw = dataset
        .column(column)
        .ok_or_else(|| VisualizeError::SchemaMismatch {
            column: column.to_string(),
        })?;

    let encoding = classify_timestamps(raw.iter().copied());
    let values: Vec<Option<DateTime<Utc>>> = raw
        .iter()
        .map(|value| match encoding {
            TimestampEncoding::EpochSeconds => convert_epoch_seconds(value),
            TimestampEncoding::CalendarString => convert_mixed(value),
            TimestampEncoding::Unparseable => None,
        })
        .collect();

    let normalized = NormalizedTimestamps {
        spec: TimestampSpec {
            column: column.to_string(),
            encoding,
        },
        values,
    };
    debug!(
        column,
        ?encoding,
        unparsed = normalized.missing_count(),
        "normalized timestamp column"
    );
    Ok(normalized)
}

fn convert_epoch_seconds(value: &RawValue) -> Option<DateTime<Utc>> {
    let seconds = match value {
        RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
        other => other.as_f64()?,
    };
    if seconds.abs() > MAX_EPOCH_SECONDS {
        return None;
    }
    epoch_to_datetime(seconds)
}

fn convert_mixed(value: &RawValue) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Missing => None,
        RawValue::Integer(_) | RawValue::Float(_) => {
            value.as_f64().and_then(scaled_epoch_to_datetime)
        }
        RawValue::Text(text) => parse_calendar(text),
    }
}

/// Reads a numeric epoch whose unit is unknown. Values beyond the seconds
/// range are taken as milliseconds, then microseconds, then nanoseconds.
pub fn scaled_epoch_to_datetime(value: f64) -> Option<DateTime<Utc>> {
    let magnitude = value.abs();
    let seconds = if magnitude <= MAX_EPOCH_SECONDS {
        value
    } else if magnitude < MAX_EPOCH_SECONDS * 1e3 {
        value / 1e3
    } else if magnitude < MAX_EPOCH_SECONDS * 1e6 {
        value / 1e6
    } else if magnitude < MAX_EPOCH_SECONDS * 1e9 {
        value / 1e9
    } else {
        return None;
    };
    epoch_to_datetime(seconds)
}

/// Interprets fractional seconds since the epoch as a UTC instant, keeping
/// microsecond precision.
pub fn epoch_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_micros(micros as i64)
}

/// Best-effort parse of a free-form date/time string. Naive values are taken
/// as UTC, numeric strings as epochs (see [`scaled_epoch_to_datetime`]), and
/// day-first is assumed for slash-separated dates.
pub fn parse_calendar(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(number) = trimmed.parse::<f64>() {
        return scaled_epoch_to_datetime(number);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ten_digit_numbers_are_epoch_seconds() {
        let values = [RawValue::Missing, RawValue::Integer(1_700_000_000)];
        assert_eq!(classify_timestamps(&values), TimestampEncoding::EpochSeconds);

        let float = [RawValue::Float(1_700_000_000.75)];
        assert_eq!(classify_timestamps(&float), TimestampEncoding::EpochSeconds);
    }

    #[test]
    fn other_shapes_are_calendar_strings() {
        let millis = [RawValue::Integer(1_700_000_000_000)];
        assert_eq!(classify_timestamps(&millis), TimestampEncoding::CalendarString);

        let text = [RawValue::Text("1700000000".into())];
        assert_eq!(classify_timestamps(&text), TimestampEncoding::CalendarString);

        let empty = [RawValue::Missing, RawValue::Missing];
        assert_eq!(classify_timestamps(&empty), TimestampEncoding::Unparseable);
    }

    #[test]
    fn parses_common_calendar_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap();
        for input in [
            "2024-03-01 09:15:00",
            "2024-03-01T09:15:00",
            "2024-03-01T09:15:00Z",
            "2024-03-01T11:15:00+02:00",
            "2024/03/01 09:15",
            "01/03/2024 09:15",
            "Fri, 01 Mar 2024 09:15:00 +0000",
        ] {
            assert_eq!(parse_calendar(input), Some(expected), "input {input}");
        }

        assert_eq!(
            parse_calendar("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_calendar("not-a-date"), None);
        assert_eq!(parse_calendar("  "), None);
    }

    #[test]
    fn millisecond_epochs_are_rescaled() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        let dataset = Dataset::from_json_records(
            r#"[{"timestamp": 1700000000000, "status": 4}, {"timestamp": "1700000000000000", "status": 5}]"#,
        )
        .expect("json");

        let normalized = normalize_timestamps(&dataset, "timestamp").expect("normalize");
        assert_eq!(normalized.spec.encoding, TimestampEncoding::CalendarString);
        assert_eq!(normalized.values, vec![Some(expected), Some(expected)]);
        assert_eq!(scaled_epoch_to_datetime(1_700_000_000_000_000_000.0), Some(expected));
        assert_eq!(scaled_epoch_to_datetime(1e30), None);
    }

    #[test]
    fn epoch_columns_read_numeric_text_and_drop_calendar_text() {
        let dataset = Dataset::from_json_records(
            r#"[{"timestamp": 1700000000}, {"timestamp": "1700003600"}, {"timestamp": "2024-03-01"}, {"timestamp": 1700000000000}]"#,
        )
        .expect("json");

        let normalized = normalize_timestamps(&dataset, "timestamp").expect("normalize");
        assert_eq!(normalized.spec.encoding, TimestampEncoding::EpochSeconds);
        assert_eq!(
            normalized.values,
            vec![
                Some(Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()),
                Some(Utc.with_ymd_and_hms(2023, 11, 14, 23, 13, 20).unwrap()),
                None,
                None,
            ]
        );
    }

    #[test]
    fn fractional_epochs_keep_microseconds() {
        let dt = epoch_to_datetime(1_700_000_000.25).expect("valid epoch");
        assert_eq!(dt.timestamp_micros(), 1_700_000_000_250_000);
        assert_eq!(epoch_to_datetime(f64::NAN), None);
        assert_eq!(epoch_to_datetime(1e300), None);
    }
}
