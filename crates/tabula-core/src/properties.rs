//! Document properties and the date epoch
//!
//! Spreadsheets store dates as serial numbers (days since a base date). In
//! the 1900 system the historical "1900 leap year" bug is kept: serial 60 is
//! the non-existent day 1900-02-29.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Date epoch used to interpret numeric date/time cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Calendar {
    /// 1900-based (Windows); serial 1 = 1900-01-01
    #[default]
    Windows1900,
    /// 1904-based (Mac); serial 0 = 1904-01-01
    Mac1904,
}

impl Calendar {
    /// Whether this is the 1904 system (`date1904` in the workbook part)
    pub fn is_1904(&self) -> bool {
        matches!(self, Calendar::Mac1904)
    }

    /// Convert a date/time to a serial number.
    ///
    /// Dates before the epoch fail with [`Error::OutOfRange`].
    pub fn to_serial(&self, datetime: NaiveDateTime) -> Result<f64> {
        let date = datetime.date();
        let days = match self {
            Calendar::Windows1900 => {
                let leap_bug = ymd(1900, 3, 1)?;
                let base = if date < leap_bug {
                    ymd(1899, 12, 31)?
                } else {
                    ymd(1899, 12, 30)?
                };
                date.signed_duration_since(base).num_days()
            }
            Calendar::Mac1904 => date.signed_duration_since(ymd(1904, 1, 1)?).num_days(),
        };

        let min_days = if self.is_1904() { 0 } else { 1 };
        if days < min_days {
            return Err(Error::out_of_range(format!(
                "{} is before the {:?} epoch",
                datetime, self
            )));
        }

        let seconds = f64::from(datetime.time().num_seconds_from_midnight());
        Ok(days as f64 + seconds / SECONDS_PER_DAY)
    }

    /// Convert a serial number back to a date/time, rounded to the second.
    pub fn from_serial(&self, serial: f64) -> Result<NaiveDateTime> {
        if !serial.is_finite() || serial < 0.0 {
            return Err(Error::out_of_range(format!("invalid date serial {}", serial)));
        }

        let mut days = serial.floor() as i64;
        let mut seconds = ((serial - serial.floor()) * SECONDS_PER_DAY).round() as i64;
        if seconds >= SECONDS_PER_DAY as i64 {
            days += 1;
            seconds = 0;
        }

        let date = match self {
            Calendar::Windows1900 => {
                if days == 60 {
                    return Err(Error::out_of_range(
                        "serial 60 is the non-existent 1900-02-29",
                    ));
                }
                if days == 0 {
                    return Err(Error::out_of_range("serial 0 precedes 1900-01-01"));
                }
                let (base, offset) = if days < 60 {
                    (ymd(1899, 12, 31)?, days)
                } else {
                    (ymd(1899, 12, 30)?, days)
                };
                base.checked_add_signed(Duration::days(offset))
            }
            Calendar::Mac1904 => ymd(1904, 1, 1)?.checked_add_signed(Duration::days(days)),
        }
        .ok_or_else(|| Error::out_of_range(format!("date serial {} overflows", serial)))?;

        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)
            .ok_or_else(|| Error::out_of_range(format!("date serial {} overflows", serial)))?;

        Ok(date.and_time(time))
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::other(format!("invalid date {}-{}-{}", year, month, day)))
}

/// Current local time truncated to whole seconds
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Document metadata stored in `docProps/core.xml`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentProperties {
    pub creator: String,
    pub last_modified_by: String,
    pub title: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
    /// Date epoch; owned by the workbook so it can refuse changes once dates exist
    pub(crate) calendar: Calendar,
}

impl DocumentProperties {
    pub fn new() -> Self {
        let now = now();
        Self {
            creator: String::new(),
            last_modified_by: String::new(),
            title: String::new(),
            created: now,
            modified: now,
            calendar: Calendar::default(),
        }
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }
}

impl Default for DocumentProperties {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_windows_serials() {
        let cal = Calendar::Windows1900;
        assert_eq!(cal.to_serial(dt(1900, 1, 1, 0, 0, 0)).unwrap(), 1.0);
        assert_eq!(cal.to_serial(dt(1900, 2, 28, 0, 0, 0)).unwrap(), 59.0);
        assert_eq!(cal.to_serial(dt(1900, 3, 1, 0, 0, 0)).unwrap(), 61.0);
        assert_eq!(cal.to_serial(dt(2024, 1, 2, 12, 0, 0)).unwrap(), 45293.5);
    }

    #[test]
    fn test_windows_leap_bug_serial_rejected() {
        assert!(matches!(
            Calendar::Windows1900.from_serial(60.0),
            Err(Error::OutOfRange(_))
        ));
        assert_eq!(
            Calendar::Windows1900.from_serial(61.0).unwrap(),
            dt(1900, 3, 1, 0, 0, 0)
        );
    }

    #[test]
    fn test_mac_serials() {
        let cal = Calendar::Mac1904;
        assert_eq!(cal.to_serial(dt(1904, 1, 1, 0, 0, 0)).unwrap(), 0.0);
        assert_eq!(cal.from_serial(1.25).unwrap(), dt(1904, 1, 2, 6, 0, 0));
        assert!(cal.to_serial(dt(1903, 12, 31, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_serial_roundtrip_to_the_second() {
        for cal in [Calendar::Windows1900, Calendar::Mac1904] {
            let value = dt(2024, 1, 2, 3, 4, 5);
            let serial = cal.to_serial(value).unwrap();
            assert_eq!(cal.from_serial(serial).unwrap(), value);
        }
    }
}
