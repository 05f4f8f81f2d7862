//! Date, time and duration values (`xs:dateTime`, `xs:date`,
//! `xs:duration`).
//!
//! Only the lexical layer is implemented: values are validated and kept as
//! their components, without calendar arithmetic or zone conversion.

use std::fmt;

use super::{all_digits, trim_xml, XmlValue};
use crate::error::{Result, TreeError};

/// The zone designator of a date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeZone {
    /// Written `Z`.
    Utc,
    /// Written `+hh:mm` / `-hh:mm`; the offset in minutes.
    Offset(i16),
}

impl TimeZone {
    /// The offset from UTC in minutes.
    #[must_use]
    pub fn offset_minutes(self) -> i16 {
        match self {
            Self::Utc => 0,
            Self::Offset(minutes) => minutes,
        }
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Utc => f.write_str("Z"),
            Self::Offset(minutes) => write_offset(f, minutes),
        }
    }
}

fn write_offset(f: &mut fmt::Formatter<'_>, minutes: i16) -> fmt::Result {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.unsigned_abs();
    write!(f, "{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Parses exactly `len` ASCII digits.
fn fixed_digits(text: &str, len: usize) -> Option<u32> {
    (text.len() == len && all_digits(text))
        .then(|| text.parse().ok())
        .flatten()
}

/// Splits a trailing zone designator off a date or date-time.
fn split_zone(text: &str) -> Option<(&str, Option<TimeZone>)> {
    if let Some(body) = text.strip_suffix('Z') {
        return Some((body, Some(TimeZone::Utc)));
    }
    let bytes = text.as_bytes();
    if bytes.len() > 6 && matches!(bytes[bytes.len() - 6], b'+' | b'-') && bytes[bytes.len() - 3] == b':' {
        let (body, zone) = text.split_at(text.len() - 6);
        let hours = fixed_digits(&zone[1..3], 2)?;
        let minutes = fixed_digits(&zone[4..6], 2)?;
        if hours > 14 || minutes > 59 || (hours == 14 && minutes > 0) {
            return None;
        }
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let total = (hours * 60 + minutes) as i16;
        let offset = if zone.starts_with('-') { -total } else { total };
        return Some((body, Some(TimeZone::Offset(offset))));
    }
    Some((text, None))
}

/// Parses a fraction of a second (digits after the point) to nanoseconds.
fn parse_nanos(fraction: &str) -> Option<u32> {
    if !all_digits(fraction) {
        return None;
    }
    let mut digits: String = fraction.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    digits.parse().ok()
}

fn write_nanos(f: &mut fmt::Formatter<'_>, nanos: u32) -> fmt::Result {
    if nanos == 0 {
        return Ok(());
    }
    let digits = format!("{nanos:09}");
    write!(f, ".{}", digits.trim_end_matches('0'))
}

/// A calendar date and time of day with an optional zone, as written in
/// `xs:dateTime` or `xs:date` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    /// Year, four or more digits.
    pub year: i32,
    /// Month, 1 to 12.
    pub month: u8,
    /// Day of the month, 1 to 31.
    pub day: u8,
    /// Hour, 0 to 23.
    pub hour: u8,
    /// Minute, 0 to 59.
    pub minute: u8,
    /// Second, 0 to 59.
    pub second: u8,
    /// Fraction of a second in nanoseconds.
    pub nanosecond: u32,
    /// The zone designator, if one was written.
    pub zone: Option<TimeZone>,
}

impl DateTime {
    /// Creates a date-time with no zone.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] if a component is out of range.
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Result<Self> {
        let value = Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanosecond: 0,
            zone: None,
        };
        if value.in_range() {
            Ok(value)
        } else {
            Err(TreeError::format(&value.to_string(), Self::TYPE_NAME))
        }
    }

    fn in_range(&self) -> bool {
        (1..=9999).contains(&self.year)
            && (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
            && self.nanosecond < 1_000_000_000
    }

    /// Parses the components; the zone is split off by the caller.
    fn parse_body(body: &str) -> Option<Self> {
        let (date, time) = match body.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (body, None),
        };
        let mut parts = date.splitn(3, '-');
        let year = parts.next()?;
        if year.len() < 4 || !all_digits(year) {
            return None;
        }
        let month = fixed_digits(parts.next()?, 2)?;
        let day = fixed_digits(parts.next()?, 2)?;
        let (hour, minute, second, nanosecond) = match time {
            Some(time) => {
                let mut parts = time.splitn(3, ':');
                let hour = fixed_digits(parts.next()?, 2)?;
                let minute = fixed_digits(parts.next()?, 2)?;
                let seconds = parts.next()?;
                let (whole, fraction) = match seconds.split_once('.') {
                    Some((whole, fraction)) => (whole, Some(fraction)),
                    None => (seconds, None),
                };
                let second = fixed_digits(whole, 2)?;
                let nanos = match fraction {
                    Some(fraction) => parse_nanos(fraction)?,
                    None => 0,
                };
                (hour, minute, second, nanos)
            }
            None => (0, 0, 0, 0),
        };
        let value = Self {
            year: year.parse().ok()?,
            month: u8::try_from(month).ok()?,
            day: u8::try_from(day).ok()?,
            hour: u8::try_from(hour).ok()?,
            minute: u8::try_from(minute).ok()?,
            second: u8::try_from(second).ok()?,
            nanosecond,
            zone: None,
        };
        value.in_range().then_some(value)
    }

    fn write_local(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        write_nanos(f, self.nanosecond)
    }
}

impl XmlValue for DateTime {
    const TYPE_NAME: &'static str = "dateTime";

    fn parse_xml(text: &str) -> Result<Self> {
        let error = || TreeError::format(text, Self::TYPE_NAME);
        let (body, zone) = split_zone(trim_xml(text)).ok_or_else(error)?;
        let mut value = Self::parse_body(body).ok_or_else(error)?;
        value.zone = zone;
        Ok(value)
    }

    fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_local(f)?;
        match self.zone {
            Some(zone) => write!(f, "{zone}"),
            None => Ok(()),
        }
    }
}

/// A date-time with a fixed offset from UTC. A value written without a
/// zone is taken to be at offset `+00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTimeOffset {
    /// The local date and time; its `zone` is always `None`.
    pub date_time: DateTime,
    /// Offset from UTC in minutes.
    pub offset_minutes: i16,
}

impl XmlValue for DateTimeOffset {
    const TYPE_NAME: &'static str = "dateTimeOffset";

    fn parse_xml(text: &str) -> Result<Self> {
        let error = || TreeError::format(text, Self::TYPE_NAME);
        let (body, zone) = split_zone(trim_xml(text)).ok_or_else(error)?;
        let date_time = DateTime::parse_body(body).ok_or_else(error)?;
        Ok(Self {
            date_time,
            offset_minutes: zone.map_or(0, TimeZone::offset_minutes),
        })
    }

    fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DateTimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.date_time.write_local(f)?;
        write_offset(f, self.offset_minutes)
    }
}

/// An `xs:duration`: signed years, months, days, hours, minutes and
/// seconds, kept separately since months have no fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    /// `true` for a leading `-`.
    pub negative: bool,
    /// Years.
    pub years: u32,
    /// Months.
    pub months: u32,
    /// Days.
    pub days: u32,
    /// Hours.
    pub hours: u32,
    /// Minutes.
    pub minutes: u32,
    /// Whole seconds.
    pub seconds: u32,
    /// Fraction of a second in nanoseconds.
    pub nanoseconds: u32,
}

impl Duration {
    /// Converts to a [`std::time::Duration`] when the value has no year or
    /// month part and is not negative.
    #[must_use]
    pub fn to_std(&self) -> Option<std::time::Duration> {
        if self.negative || self.years != 0 || self.months != 0 {
            return None;
        }
        let secs = u64::from(self.days) * 86_400
            + u64::from(self.hours) * 3_600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds);
        Some(std::time::Duration::new(secs, self.nanoseconds))
    }

    fn parse_body(text: &str) -> Option<Self> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let rest = rest.strip_prefix('P')?;
        let (date, time) = match rest.split_once('T') {
            Some((date, time)) => {
                if time.is_empty() {
                    return None;
                }
                (date, Some(time))
            }
            None => (rest, None),
        };
        let mut value = Self {
            negative,
            ..Self::default()
        };
        let mut any = false;

        let mut remaining = date;
        for (designator, slot) in [('Y', &mut value.years), ('M', &mut value.months), ('D', &mut value.days)] {
            if let Some((number, tail)) = remaining.split_once(designator) {
                if !all_digits(number) {
                    return None;
                }
                *slot = number.parse().ok()?;
                remaining = tail;
                any = true;
            }
        }
        if !remaining.is_empty() {
            return None;
        }

        if let Some(time) = time {
            let mut remaining = time;
            for (designator, slot) in [('H', &mut value.hours), ('M', &mut value.minutes)] {
                if let Some((number, tail)) = remaining.split_once(designator) {
                    if !all_digits(number) {
                        return None;
                    }
                    *slot = number.parse().ok()?;
                    remaining = tail;
                    any = true;
                }
            }
            if let Some(number) = remaining.strip_suffix('S') {
                let (whole, fraction) = match number.split_once('.') {
                    Some((whole, fraction)) => (whole, Some(fraction)),
                    None => (number, None),
                };
                if !all_digits(whole) {
                    return None;
                }
                value.seconds = whole.parse().ok()?;
                if let Some(fraction) = fraction {
                    value.nanoseconds = parse_nanos(fraction)?;
                }
                remaining = "";
                any = true;
            }
            if !remaining.is_empty() {
                return None;
            }
        }
        any.then_some(value)
    }
}

impl XmlValue for Duration {
    const TYPE_NAME: &'static str = "duration";

    fn parse_xml(text: &str) -> Result<Self> {
        Self::parse_body(trim_xml(text)).ok_or_else(|| TreeError::format(text, Self::TYPE_NAME))
    }

    fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        let total = value.as_secs();
        let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
        Self {
            negative: false,
            years: 0,
            months: 0,
            days: clamp(total / 86_400),
            hours: clamp(total % 86_400 / 3_600),
            minutes: clamp(total % 3_600 / 60),
            seconds: clamp(total % 60),
            nanoseconds: value.subsec_nanos(),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zero = *self
            == Self {
                negative: self.negative,
                ..Self::default()
            };
        if zero {
            return f.write_str("PT0S");
        }
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        for (amount, designator) in [(self.years, 'Y'), (self.months, 'M'), (self.days, 'D')] {
            if amount != 0 {
                write!(f, "{amount}{designator}")?;
            }
        }
        if self.hours != 0 || self.minutes != 0 || self.seconds != 0 || self.nanoseconds != 0 {
            f.write_str("T")?;
            for (amount, designator) in [(self.hours, 'H'), (self.minutes, 'M')] {
                if amount != 0 {
                    write!(f, "{amount}{designator}")?;
                }
            }
            if self.seconds != 0 || self.nanoseconds != 0 {
                write!(f, "{}", self.seconds)?;
                write_nanos(f, self.nanoseconds)?;
                f.write_str("S")?;
            }
        }
        Ok(())
    }
}
