//! IPTC style calendar dates and times of day.
use std::fmt;

use jiff::civil;
use jiff::tz::{Offset, TimeZone};
use jiff::Timestamp;

use crate::error::{ErrorCode, TiffError, TiffResult};

fn digits(text: &[u8]) -> Option<u32> {
    if text.is_empty() || !text.iter().all(u8::is_ascii_digit) {
        return None;
    }
    text.iter()
        .try_fold(0u32, |acc, &d| acc.checked_mul(10)?.checked_add(u32::from(d - b'0')))
}

fn invalid_date(text: impl fmt::Display) -> TiffError {
    TiffError::new(ErrorCode::InvalidDate).arg(text)
}

fn invalid_time(text: impl fmt::Display) -> TiffError {
    TiffError::new(ErrorCode::InvalidTime).arg(text)
}

/// A calendar date, `YYYY-MM-DD`.
///
/// The binary form is the eight ASCII digits `YYYYMMDD`. A default value holds no date (all
/// components zero) and does not convert to a timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DateValue {
    year: i16,
    month: i8,
    day: i8,
}

impl DateValue {
    pub fn new(year: i16, month: i8, day: i8) -> TiffResult<Self> {
        civil::Date::new(year, month, day)
            .map_err(|_| invalid_date(format_args!("{year:04}-{month:02}-{day:02}")))?;
        Ok(DateValue { year, month, day })
    }

    pub fn year(&self) -> i16 {
        self.year
    }

    pub fn month(&self) -> i8 {
        self.month
    }

    pub fn day(&self) -> i8 {
        self.day
    }

    /// Parse `YYYY-MM-DD`, `YYYY:MM:DD` or `YYYYMMDD`.
    pub fn read_str(&mut self, text: &str) -> TiffResult<()> {
        let raw = text.as_bytes();
        let compact: Vec<u8> = match raw {
            [_, _, _, _, s1, _, _, s2, _, _] if s1 == s2 && matches!(*s1, b'-' | b':') => {
                raw.iter()
                    .enumerate()
                    .filter(|&(i, _)| i != 4 && i != 7)
                    .map(|(_, &b)| b)
                    .collect()
            }
            _ if raw.len() == 8 => raw.to_vec(),
            _ => return Err(invalid_date(text)),
        };

        let (year, month, day) = match (
            digits(&compact[..4]),
            digits(&compact[4..6]),
            digits(&compact[6..8]),
        ) {
            (Some(y), Some(m), Some(d)) => (y, m, d),
            _ => return Err(invalid_date(text)),
        };

        // Four and two digit numbers always fit.
        let date = civil::Date::new(year as i16, month as i8, day as i8)
            .map_err(|_| invalid_date(text))?;
        *self = DateValue {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        };
        Ok(())
    }

    pub fn read(&mut self, bytes: &[u8]) -> TiffResult<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| invalid_date(String::from_utf8_lossy(bytes)))?;
        self.read_str(text.trim_end_matches('\0'))
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> usize {
        let text = format!("{:04}{:02}{:02}", self.year, self.month, self.day);
        out.extend_from_slice(text.as_bytes());
        text.len()
    }

    pub fn date(&self) -> TiffResult<civil::Date> {
        civil::Date::new(self.year, self.month, self.day).map_err(|_| invalid_date(self))
    }

    /// Seconds since the Unix epoch at midnight UTC of this date.
    pub fn to_i64(&self) -> TiffResult<i64> {
        let zoned = self
            .date()?
            .to_zoned(TimeZone::UTC)
            .map_err(|err| out_of_range(self, "Date", err))?;
        Ok(zoned.timestamp().as_second())
    }

    /// The instant described by this date and `time`, honoring the time's zone offset.
    pub fn at(&self, time: &TimeValue) -> TiffResult<Timestamp> {
        let dt = civil::DateTime::new(
            self.year,
            self.month,
            self.day,
            time.hour,
            time.minute,
            time.second,
            0,
        )
        .map_err(|_| invalid_date(format_args!("{self} {time}")))?;
        let offset = Offset::from_seconds(time.offset_seconds())
            .map_err(|err| out_of_range(time, "Time", err))?;
        offset
            .to_timestamp(dt)
            .map_err(|err| out_of_range(format_args!("{self} {time}"), "Date", err))
    }
}

fn out_of_range(value: impl fmt::Display, type_name: &str, err: jiff::Error) -> TiffError {
    log::debug!("{value}: {err}");
    TiffError::new(ErrorCode::ValueOutOfRange)
        .arg(value)
        .arg(type_name)
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A time of day with a zone offset, `HH:MM:SS±HH:MM`.
///
/// The binary form is the eleven ASCII characters `HHMMSS±HHMM`. The zone minutes carry the
/// same sign as the zone hours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimeValue {
    hour: i8,
    minute: i8,
    second: i8,
    tz_hour: i8,
    tz_minute: i8,
}

impl TimeValue {
    pub fn new(hour: i8, minute: i8, second: i8, tz_hour: i8, tz_minute: i8) -> TiffResult<Self> {
        let value = TimeValue {
            hour,
            minute,
            second,
            tz_hour,
            tz_minute,
        };
        value.check().map_err(|_| invalid_time(value))?;
        Ok(value)
    }

    fn check(&self) -> Result<(), ()> {
        civil::Time::new(self.hour, self.minute, self.second, 0).map_err(|_| ())?;
        let same_sign =
            self.tz_hour == 0 || self.tz_minute == 0 || (self.tz_hour < 0) == (self.tz_minute < 0);
        if !same_sign || self.tz_hour.unsigned_abs() > 23 || self.tz_minute.unsigned_abs() > 59 {
            return Err(());
        }
        Ok(())
    }

    pub fn hour(&self) -> i8 {
        self.hour
    }

    pub fn minute(&self) -> i8 {
        self.minute
    }

    pub fn second(&self) -> i8 {
        self.second
    }

    pub fn tz_hour(&self) -> i8 {
        self.tz_hour
    }

    pub fn tz_minute(&self) -> i8 {
        self.tz_minute
    }

    fn offset_seconds(&self) -> i32 {
        i32::from(self.tz_hour) * 3600 + i32::from(self.tz_minute) * 60
    }

    /// Parse `HH:MM:SS±HH:MM` or the compact `HHMMSS±HHMM`.
    pub fn read_str(&mut self, text: &str) -> TiffResult<()> {
        let raw = text.as_bytes();
        let fields: [&[u8]; 6] = match raw.len() {
            14 if raw[2] == b':' && raw[5] == b':' && raw[11] == b':' => [
                &raw[0..2],
                &raw[3..5],
                &raw[6..8],
                &raw[8..9],
                &raw[9..11],
                &raw[12..14],
            ],
            11 => [
                &raw[0..2],
                &raw[2..4],
                &raw[4..6],
                &raw[6..7],
                &raw[7..9],
                &raw[9..11],
            ],
            _ => return Err(invalid_time(text)),
        };

        let sign: i8 = match fields[3] {
            b"+" => 1,
            b"-" => -1,
            _ => return Err(invalid_time(text)),
        };
        let mut numbers = [0i8; 5];
        for (slot, field) in numbers
            .iter_mut()
            .zip([fields[0], fields[1], fields[2], fields[4], fields[5]])
        {
            // Two digits always fit.
            *slot = digits(field).ok_or_else(|| invalid_time(text))? as i8;
        }

        let value = TimeValue {
            hour: numbers[0],
            minute: numbers[1],
            second: numbers[2],
            tz_hour: sign * numbers[3],
            tz_minute: sign * numbers[4],
        };
        value.check().map_err(|_| invalid_time(text))?;
        *self = value;
        Ok(())
    }

    pub fn read(&mut self, bytes: &[u8]) -> TiffResult<()> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| invalid_time(String::from_utf8_lossy(bytes)))?;
        self.read_str(text.trim_end_matches('\0'))
    }

    fn sign(&self) -> char {
        if self.tz_hour < 0 || self.tz_minute < 0 {
            '-'
        } else {
            '+'
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> usize {
        let text = format!(
            "{:02}{:02}{:02}{}{:02}{:02}",
            self.hour,
            self.minute,
            self.second,
            self.sign(),
            self.tz_hour.unsigned_abs(),
            self.tz_minute.unsigned_abs()
        );
        out.extend_from_slice(text.as_bytes());
        text.len()
    }

    /// Seconds since midnight UTC.
    pub fn to_i64(&self) -> i64 {
        let local =
            i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second);
        (local - i64::from(self.offset_seconds())).rem_euclid(86_400)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}:{:02}",
            self.hour,
            self.minute,
            self.second,
            self.sign(),
            self.tz_hour.unsigned_abs(),
            self.tz_minute.unsigned_abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_text_forms() {
        for text in ["2021:01:05", "2021-01-05", "20210105"] {
            let mut d = DateValue::default();
            d.read_str(text).unwrap();
            assert_eq!((d.year(), d.month(), d.day()), (2021, 1, 5), "{text}");
            assert_eq!(d.to_string(), "2021-01-05");
        }
    }

    #[test]
    fn impossible_dates_are_rejected() {
        let mut d = DateValue::new(1999, 12, 31).unwrap();
        for text in ["2021-13-99", "2021-02-29", "2021-1-5", "2021:01-05", "2021010", "abcd0105"] {
            let err = d.read_str(text).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidDate, "{text}");
        }
        assert_eq!(d, DateValue::new(1999, 12, 31).unwrap(), "unchanged on error");
    }

    #[test]
    fn date_binary_form() {
        let mut d = DateValue::default();
        d.read(b"20240229").unwrap();
        let mut out = Vec::new();
        assert_eq!(d.encode(&mut out), 8);
        assert_eq!(out, b"20240229");
    }

    #[test]
    fn date_to_epoch_seconds() {
        assert_eq!(DateValue::new(1970, 1, 2).unwrap().to_i64().unwrap(), 86_400);
        assert!(DateValue::default().to_i64().is_err());
    }

    #[test]
    fn time_text_and_binary_forms() {
        let mut t = TimeValue::default();
        t.read_str("14:30:05-05:30").unwrap();
        assert_eq!(t.tz_hour(), -5);
        assert_eq!(t.tz_minute(), -30);
        assert_eq!(t.to_string(), "14:30:05-05:30");

        let mut out = Vec::new();
        assert_eq!(t.encode(&mut out), 11);
        assert_eq!(out, b"143005-0530");

        let mut u = TimeValue::default();
        u.read(&out).unwrap();
        assert_eq!(u, t);
    }

    #[test]
    fn time_range_checks() {
        let mut t = TimeValue::default();
        for text in ["24:00:00+00:00", "12:60:00+00:00", "12:00:00+24:00", "12:00:00 00:00", "12:00:00"] {
            assert_eq!(t.read_str(text).unwrap_err().code(), ErrorCode::InvalidTime, "{text}");
        }
    }

    #[test]
    fn time_of_utc_day() {
        let t = TimeValue::new(1, 0, 0, 2, 0).unwrap();
        assert_eq!(t.to_i64(), 23 * 3600);
        let t = TimeValue::new(23, 0, 0, -2, 0).unwrap();
        assert_eq!(t.to_i64(), 3600);
    }

    #[test]
    fn date_at_time() {
        let d = DateValue::new(2000, 1, 1).unwrap();
        let t = TimeValue::new(1, 0, 0, 1, 0).unwrap();
        assert_eq!(d.at(&t).unwrap().as_second(), 946_684_800);

        let edge = DateValue::new(9999, 12, 31).unwrap();
        let late = TimeValue::new(23, 59, 59, -23, -59).unwrap();
        assert_eq!(edge.at(&late).unwrap_err().code(), ErrorCode::ValueOutOfRange);
    }
}
