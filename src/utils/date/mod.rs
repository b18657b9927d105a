// Date utility functions
// Expiration parsing and display helpers shared by the model and the UI

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse an expiration value as sent by the policy API.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (treated as UTC), plain
/// dates (`YYYY-MM-DD` or legacy `MM/DD/YYYY`, both UTC midnight) and integer
/// epoch seconds. Returns `None` for anything else.
pub fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    trimmed
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// Formats an expiration for the policies table in the local timezone.
pub fn format_date_local(value: DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%b %-d, %Y").to_string()
}

/// Wire representation used when submitting a policy form.
pub fn to_wire_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
