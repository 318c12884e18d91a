//! Date and time values as exiftool prints them.
//!
//! exiftool writes dates as `YYYY:MM:DD`, times as `HH:MM:SS[.fff][zone]`
//! and timestamps as `YYYY:MM:DD HH:MM:SS[.fff][zone]`, where the zone is
//! `Z`, `+HH:MM` or `+HHMM`. Values without a zone are kept local.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DATE_FORMATS: &[&str] = &["%Y:%m:%d", "%Y-%m-%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not an exiftool {kind}: {value:?}")]
pub struct ParseDateTimeError {
    kind: &'static str,
    value: String,
}

impl ParseDateTimeError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A calendar date, e.g. `GPSDateStamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExifDate(pub NaiveDate);

/// A time of day with an optional zone, e.g. `GPSTimeStamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExifTime {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

/// A timestamp with an optional zone, e.g. `DateTimeOriginal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExifDateTime {
    pub date_time: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl ExifDateTime {
    /// The timestamp as an absolute point in time, if its zone is known.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.offset
            .and_then(|offset| offset.from_local_datetime(&self.date_time).single())
    }
}

impl FromStr for ExifDate {
    type Err = ParseDateTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
            .map(ExifDate)
            .ok_or_else(|| ParseDateTimeError::new("date", s))
    }
}

impl FromStr for ExifTime {
    type Err = ParseDateTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (local, offset) = split_offset(s).ok_or_else(|| ParseDateTimeError::new("time", s))?;
        let time = TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(local, format).ok())
            .ok_or_else(|| ParseDateTimeError::new("time", s))?;
        Ok(Self { time, offset })
    }
}

impl FromStr for ExifDateTime {
    type Err = ParseDateTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (local, offset) =
            split_offset(s).ok_or_else(|| ParseDateTimeError::new("date/time", s))?;
        let date_time = DATE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
            .ok_or_else(|| ParseDateTimeError::new("date/time", s))?;
        Ok(Self { date_time, offset })
    }
}

/// Splits a trailing zone off the time part. `None` if the zone is malformed.
fn split_offset(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(local) = s.strip_suffix('Z') {
        return Some((local, FixedOffset::east_opt(0)));
    }
    let time_start = s.rfind([' ', 'T']).map_or(0, |i| i + 1);
    match s[time_start..].find(['+', '-']) {
        Some(i) => {
            let split = time_start + i;
            let offset = parse_offset(&s[split..])?;
            Some((&s[..split], Some(offset)))
        }
        None => Some((s, None)),
    }
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl fmt::Display for ExifDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y:%m:%d"))
    }
}

impl fmt::Display for ExifTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M:%S%.f"))?;
        match self.offset {
            Some(offset) => write!(f, "{offset}"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ExifDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date_time.format("%Y:%m:%d %H:%M:%S%.f"))?;
        match self.offset {
            Some(offset) => write!(f, "{offset}"),
            None => Ok(()),
        }
    }
}

macro_rules! string_serde {
    ($($ty:ty),*) => {$(
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    )*};
}

string_serde!(ExifDate, ExifTime, ExifDateTime);
