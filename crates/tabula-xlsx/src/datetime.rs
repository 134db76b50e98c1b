//! W3CDTF timestamps used by `docProps/core.xml`
//!
//! Only the profile `YYYY-M(M)-D(D)THH:MM:SSZ` is accepted. Output is always
//! zero-padded to two digits (except the year) and ends in a literal `Z`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{XlsxError, XlsxResult};

/// Parse a W3CDTF timestamp.
///
/// Separators are located in sequence (`-`, `-`, `T`, `:`, `:`, `Z`); every
/// segment must be a non-empty run of ASCII digits and nothing may follow the
/// `Z`.
pub fn parse_w3cdtf(text: &str) -> XlsxResult<NaiveDateTime> {
    let malformed = || XlsxError::Parse(format!("malformed W3CDTF timestamp '{}'", text));

    let mut fields = [0u32; 6];
    let mut rest = text;
    for (slot, separator) in fields.iter_mut().zip(['-', '-', 'T', ':', ':', 'Z']) {
        let (segment, tail) = rest.split_once(separator).ok_or_else(malformed)?;
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        *slot = segment.parse().map_err(|_| malformed())?;
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(malformed());
    }

    let [year, month, day, hour, minute, second] = fields;
    let year = i32::try_from(year).map_err(|_| malformed())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| XlsxError::Parse(format!("invalid date/time in '{}'", text)))
}

/// Format a timestamp as W3CDTF (`2024-01-02T03:04:05Z`)
pub fn format_w3cdtf(datetime: &NaiveDateTime) -> String {
    format!(
        "{}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        datetime.year(),
        datetime.month(),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    )
}
