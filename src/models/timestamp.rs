//! Parser for the `YYYY-MM-DDTHH:MM:SS[.fraction]` timestamps found in raw
//! log lines. Fractional seconds are accepted but truncated to whole seconds.

use chrono::{DateTime, NaiveDate, Utc};

use super::visit::ModelError;

pub fn parse_log_timestamp(text: &str) -> Result<DateTime<Utc>, ModelError> {
    let malformed = |reason: &'static str| ModelError::MalformedTimestamp {
        input: text.to_string(),
        reason,
    };

    let (date_part, time_part) = text
        .split_once('T')
        .ok_or_else(|| malformed("missing 'T' separator"))?;

    let date_fields: Vec<&str> = date_part.split('-').collect();
    let [year, month, day] = date_fields[..] else {
        return Err(malformed("expected a YYYY-MM-DD date"));
    };
    let time_fields: Vec<&str> = time_part.split(':').collect();
    let [hour, minute, second] = time_fields[..] else {
        return Err(malformed("expected a HH:MM:SS time"));
    };

    let year: i32 = year.trim().parse().map_err(|_| malformed("invalid year"))?;
    let month: u32 = month.trim().parse().map_err(|_| malformed("invalid month"))?;
    let day: u32 = day.trim().parse().map_err(|_| malformed("invalid day"))?;
    let hour: u32 = hour.trim().parse().map_err(|_| malformed("invalid hour"))?;
    let minute: u32 = minute
        .trim()
        .parse()
        .map_err(|_| malformed("invalid minute"))?;

    // Anything after '.' is sub-second precision and is dropped
    let second = second.trim();
    let second = second.split_once('.').map_or(second, |(whole, _)| whole);
    let second: u32 = second.parse().map_err(|_| malformed("invalid second"))?;

    let datetime = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| malformed("date or time out of range"))?;

    Ok(datetime.and_utc())
}
