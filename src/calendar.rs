//! Calendar-aware time decoding
//!
//! Converts numeric time coordinates with CF-style units
//! (`"days since 1950-01-01"`) into calendar datetimes for the common
//! calendars, and from there into decimal years. Packed date values such as
//! `20210701.5` with units `"day as %Y%m%d.%f"` are understood too.
//!
//! Decoding never panics; callers decide what to do with a failure.

use crate::errors::{NcSliceError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

const MICROS_PER_DAY: i64 = 86_400_000_000;
/// First day of the Gregorian calendar (1582-10-15) as Julian day number
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;
/// Julian day number of 0001-01-01 (proleptic Gregorian) minus one
const CE_JDN_OFFSET: i64 = 1_721_425;

const CUM_DAYS_NOLEAP: [u32; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const CUM_DAYS_LEAP: [u32; 13] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// Calendars of the CF conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// Julian before 1582-10-15, Gregorian from then on
    Standard,
    ProlepticGregorian,
    Julian,
    NoLeap,
    AllLeap,
    Day360,
}

impl FromStr for Calendar {
    type Err = NcSliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(NcSliceError::TimeDecode(format!("unsupported calendar '{other}'"))),
        }
    }
}

impl Calendar {
    pub fn as_str(self) -> &'static str {
        match self {
            Calendar::Standard => "standard",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Julian => "julian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        }
    }

    /// Whether `year` has a 29th of February in this calendar
    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            Calendar::ProlepticGregorian => gregorian_leap(year),
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::Standard => {
                if year > 1582 {
                    gregorian_leap(year)
                } else {
                    year.rem_euclid(4) == 0
                }
            }
            Calendar::NoLeap | Calendar::Day360 => false,
            Calendar::AllLeap => true,
        }
    }

    fn days_in_month(self, year: i32, month: u32) -> u32 {
        if self == Calendar::Day360 {
            return 30;
        }
        let cum = if self.is_leap_year(year) {
            &CUM_DAYS_LEAP
        } else {
            &CUM_DAYS_NOLEAP
        };
        cum[month as usize] - cum[month as usize - 1]
    }

    /// Day of the year, starting at 1
    pub fn day_of_year(self, year: i32, month: u32, day: u32) -> u32 {
        if self == Calendar::Day360 {
            return (month - 1) * 30 + day;
        }
        let cum = if self.is_leap_year(year) {
            &CUM_DAYS_LEAP
        } else {
            &CUM_DAYS_NOLEAP
        };
        cum[month as usize - 1] + day
    }

    /// Length of the year used for decimal years
    ///
    /// Fixed-length calendars use their constant; all others use the
    /// Gregorian leap rule.
    pub fn days_in_year(self, year: i32) -> f64 {
        match self {
            Calendar::Day360 => 360.0,
            Calendar::NoLeap => 365.0,
            Calendar::AllLeap => 366.0,
            Calendar::Standard | Calendar::ProlepticGregorian | Calendar::Julian => {
                if gregorian_leap(year) {
                    366.0
                } else {
                    365.0
                }
            }
        }
    }

    /// Continuous day number of a date in this calendar
    fn day_number(self, year: i32, month: u32, day: u32) -> Result<i64> {
        if !(1..=12).contains(&month) || day == 0 || day > self.days_in_month(year, month) {
            return Err(NcSliceError::TimeDecode(format!(
                "invalid {} date {year}-{month}-{day}",
                self.as_str()
            )));
        }
        let y = i64::from(year);
        match self {
            Calendar::ProlepticGregorian => gregorian_to_jdn(year, month, day),
            Calendar::Julian => Ok(julian_to_jdn(year, month, day)),
            Calendar::Standard => {
                if (year, month, day) >= (1582, 10, 15) {
                    gregorian_to_jdn(year, month, day)
                } else if (year, month, day) > (1582, 10, 4) {
                    Err(NcSliceError::TimeDecode(format!(
                        "date {year}-{month}-{day} does not exist in the standard calendar"
                    )))
                } else {
                    Ok(julian_to_jdn(year, month, day))
                }
            }
            Calendar::NoLeap => Ok(y * 365 + i64::from(CUM_DAYS_NOLEAP[month as usize - 1] + day - 1)),
            Calendar::AllLeap => Ok(y * 366 + i64::from(CUM_DAYS_LEAP[month as usize - 1] + day - 1)),
            Calendar::Day360 => Ok(y * 360 + i64::from((month - 1) * 30 + day - 1)),
        }
    }

    /// Inverse of [`Calendar::day_number`]
    fn date_from_day_number(self, n: i64) -> Result<(i32, u32, u32)> {
        match self {
            Calendar::ProlepticGregorian => jdn_to_gregorian(n),
            Calendar::Julian => Ok(jdn_to_julian(n)),
            Calendar::Standard => {
                if n >= GREGORIAN_REFORM_JDN {
                    jdn_to_gregorian(n)
                } else {
                    Ok(jdn_to_julian(n))
                }
            }
            Calendar::NoLeap => Ok(split_fixed_year(n, 365, &CUM_DAYS_NOLEAP)),
            Calendar::AllLeap => Ok(split_fixed_year(n, 366, &CUM_DAYS_LEAP)),
            Calendar::Day360 => {
                let year = n.div_euclid(360) as i32;
                let doy = n.rem_euclid(360) as u32;
                Ok((year, doy / 30 + 1, doy % 30 + 1))
            }
        }
    }
}

fn gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn gregorian_to_jdn(year: i32, month: u32, day: u32) -> Result<i64> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| NcSliceError::TimeDecode(format!("invalid date {year}-{month}-{day}")))?;
    Ok(i64::from(date.num_days_from_ce()) + CE_JDN_OFFSET)
}

fn jdn_to_gregorian(jdn: i64) -> Result<(i32, u32, u32)> {
    let days = i32::try_from(jdn - CE_JDN_OFFSET)
        .map_err(|_| NcSliceError::TimeDecode(format!("day number {jdn} out of range")))?;
    let date = NaiveDate::from_num_days_from_ce_opt(days)
        .ok_or_else(|| NcSliceError::TimeDecode(format!("day number {jdn} out of range")))?;
    Ok((date.year(), date.month(), date.day()))
}

fn julian_to_jdn(year: i32, month: u32, day: u32) -> i64 {
    let a = (14 - i64::from(month)) / 12;
    let y = i64::from(year) + 4800 - a;
    let m = i64::from(month) + 12 * a - 3;
    i64::from(day) + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32083
}

fn jdn_to_julian(jdn: i64) -> (i32, u32, u32) {
    let c = jdn + 32082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    (year as i32, month as u32, day as u32)
}

fn split_fixed_year(n: i64, year_len: i64, cum: &[u32; 13]) -> (i32, u32, u32) {
    let year = n.div_euclid(year_len) as i32;
    let doy = n.rem_euclid(year_len) as u32;
    let month = (1..=12).find(|&m| doy < cum[m]).unwrap_or(12);
    (year, month as u32, doy - cum[month - 1] + 1)
}

/// A point in time in a specific calendar
///
/// Unlike [`NaiveDateTime`] this can hold dates such as 30 February of a
/// `360_day` calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
    pub calendar: Calendar,
}

impl CalendarDateTime {
    /// Midnight of a date
    ///
    /// # Errors
    ///
    /// Returns an error if the date does not exist in `calendar`.
    pub fn from_ymd(calendar: Calendar, year: i32, month: u32, day: u32) -> Result<Self> {
        calendar.day_number(year, month, day)?;
        Ok(Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
            calendar,
        })
    }

    /// Same date with a time of day
    pub fn and_hms(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    pub fn day_of_year(&self) -> u32 {
        self.calendar.day_of_year(self.year, self.month, self.day)
    }

    /// `year + (day_of_year - 1 + hour/24 + minute/1440 + second/86400) / days_in_year`
    pub fn decimal_year(&self) -> f64 {
        let fraction = f64::from(self.day_of_year() - 1)
            + f64::from(self.hour) / 24.0
            + f64::from(self.minute) / 1440.0
            + f64::from(self.second) / 86400.0;
        f64::from(self.year) + fraction / self.calendar.days_in_year(self.year)
    }

    /// Proleptic Gregorian datetime from a real-world datetime
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            microsecond: dt.nanosecond() / 1000,
            calendar: Calendar::ProlepticGregorian,
        }
    }

    /// Real-world datetime, if this date exists in the proleptic Gregorian
    /// calendar with the same day count
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let representable = match self.calendar {
            Calendar::ProlepticGregorian => true,
            Calendar::Standard => (self.year, self.month, self.day) >= (1582, 10, 15),
            _ => false,
        };
        if !representable {
            return None;
        }
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_micro_opt(
            self.hour,
            self.minute,
            self.second,
            self.microsecond,
        )
    }

    /// Microseconds since the calendar's day zero
    fn to_micros(self) -> Result<i64> {
        let day = self.calendar.day_number(self.year, self.month, self.day)?;
        let tod = i64::from(self.hour) * 3_600_000_000
            + i64::from(self.minute) * 60_000_000
            + i64::from(self.second) * 1_000_000
            + i64::from(self.microsecond);
        day.checked_mul(MICROS_PER_DAY)
            .and_then(|d| d.checked_add(tod))
            .ok_or_else(|| NcSliceError::TimeDecode("date out of range".to_string()))
    }

    fn from_micros(calendar: Calendar, micros: i64) -> Result<Self> {
        let day = micros.div_euclid(MICROS_PER_DAY);
        let tod = micros.rem_euclid(MICROS_PER_DAY);
        let (year, month, day) = calendar.date_from_day_number(day)?;
        Ok(Self {
            year,
            month,
            day,
            hour: (tod / 3_600_000_000) as u32,
            minute: (tod / 60_000_000 % 60) as u32,
            second: (tod / 1_000_000 % 60) as u32,
            microsecond: (tod % 1_000_000) as u32,
            calendar,
        })
    }
}

impl fmt::Display for CalendarDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microsecond > 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

/// Parsed `"<unit> since <reference>"` time units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    /// Length of one unit in microseconds
    pub unit_micros: f64,
    pub reference: CalendarDateTime,
}

fn unit_micros(unit: &str) -> Option<f64> {
    let micros = match unit.to_lowercase().as_str() {
        "days" | "day" | "d" => 86_400e6,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3_600e6,
        "minutes" | "minute" | "mins" | "min" => 60e6,
        "seconds" | "second" | "secs" | "sec" | "s" => 1e6,
        "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" => 1e3,
        "microseconds" | "microsecond" | "usecs" | "usec" | "us" => 1.0,
        _ => return None,
    };
    Some(micros)
}

impl TimeUnits {
    /// Parse CF time units in the given calendar
    ///
    /// # Errors
    ///
    /// Returns [`NcSliceError::TimeDecode`] for units without `since`,
    /// calendar-dependent units such as months or years, or an invalid
    /// reference date.
    pub fn parse(units: &str, calendar: Calendar) -> Result<Self> {
        let bad = |why: &str| NcSliceError::TimeDecode(format!("{why}: '{units}'"));
        let mut parts = units.trim().splitn(3, char::is_whitespace);
        let unit = parts.next().ok_or_else(|| bad("empty time units"))?;
        if !parts.next().is_some_and(|s| s.eq_ignore_ascii_case("since")) {
            return Err(bad("time units without 'since'"));
        }
        let unit_micros = unit_micros(unit).ok_or_else(|| bad("unsupported time unit"))?;
        let reference = parse_reference(parts.next().unwrap_or("").trim(), calendar)
            .ok_or_else(|| bad("invalid reference date"))??;
        Ok(Self {
            unit_micros,
            reference,
        })
    }

    /// Decode one numeric value
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite values or dates out of range.
    pub fn decode(&self, value: f64) -> Result<CalendarDateTime> {
        if !value.is_finite() {
            return Err(NcSliceError::TimeDecode(format!("cannot decode time value {value}")));
        }
        let offset = (value * self.unit_micros).round();
        if offset.abs() > 9.0e18 {
            return Err(NcSliceError::TimeDecode(format!("time value {value} out of range")));
        }
        let micros = self
            .reference
            .to_micros()?
            .checked_add(offset as i64)
            .ok_or_else(|| NcSliceError::TimeDecode(format!("time value {value} out of range")))?;
        CalendarDateTime::from_micros(self.reference.calendar, micros)
    }
}

/// Parse `Y-M-D[( |T)h:m[:s[.f]]][Z|UTC|±hh[:mm]]`
///
/// The outer option is `None` for text that is not a date at all; the inner
/// result carries calendar validation errors.
fn parse_reference(text: &str, calendar: Calendar) -> Option<Result<CalendarDateTime>> {
    let text = text.trim_end_matches(|c: char| c.is_whitespace());
    let (date_part, rest) = match text.find(['T', ' ']) {
        Some(i) => (&text[..i], text[i + 1..].trim()),
        None => (text, ""),
    };

    let (sign, date_digits) = match date_part.strip_prefix('-') {
        Some(d) => (-1, d),
        None => (1, date_part),
    };
    let mut ymd = date_digits.split('-');
    let year: i32 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next().map_or(Some(1), |m| m.parse().ok())?;
    let day: u32 = ymd.next().map_or(Some(1), |d| d.parse().ok())?;
    if ymd.next().is_some() {
        return None;
    }

    let mut time_part = rest;
    let mut offset_minutes: i64 = 0;
    for suffix in ["UTC", "Z"] {
        if let Some(stripped) = time_part.strip_suffix(suffix) {
            time_part = stripped.trim();
        }
    }
    if let Some(i) = time_part.rfind(['+', '-']).filter(|&i| i > 0 || time_part.contains(':')) {
        let (clock, zone) = time_part.split_at(i);
        if let Some(minutes) = parse_zone(zone) {
            offset_minutes = minutes;
            time_part = clock.trim();
        }
    } else if let Some(minutes) = parse_zone(time_part) {
        // bare zone without a clock time, e.g. "1970-01-01 +01:00"
        offset_minutes = minutes;
        time_part = "";
    }

    let (hour, minute, second, micro) = if time_part.is_empty() {
        (0, 0, 0, 0)
    } else {
        let mut hms = time_part.split(':');
        let hour: u32 = hms.next()?.trim().parse().ok()?;
        let minute: u32 = hms.next().map_or(Some(0), |m| m.trim().parse().ok())?;
        let seconds: f64 = hms.next().map_or(Some(0.0), |s| s.trim().parse().ok())?;
        if hour > 23 || minute > 59 || !(0.0..61.0).contains(&seconds) {
            return None;
        }
        let whole = seconds.trunc();
        let micro = ((seconds - whole) * 1e6).round() as u32;
        (hour, minute, whole as u32, micro.min(999_999))
    };

    let reference = CalendarDateTime::from_ymd(calendar, sign * year, month, day).map(|d| CalendarDateTime {
        hour,
        minute,
        second: second.min(59),
        microsecond: micro,
        ..d
    });
    if offset_minutes == 0 {
        return Some(reference);
    }
    Some(reference.and_then(|r| {
        let micros = r.to_micros()? - offset_minutes * 60_000_000;
        CalendarDateTime::from_micros(calendar, micros)
    }))
}

fn parse_zone(zone: &str) -> Option<i64> {
    let sign = match zone.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (h, m) = if digits.len() <= 2 {
        (digits.parse::<i64>().ok()?, 0)
    } else {
        let split = digits.len() - 2;
        (digits[..split].parse::<i64>().ok()?, digits[split..].parse::<i64>().ok()?)
    };
    Some(sign * (h * 60 + m))
}

/// Decode a series of values with CF units and a calendar name
///
/// NaN entries (masked values) decode to `None`.
///
/// # Errors
///
/// Returns the first decoding failure; a series is decoded entirely or not
/// at all.
pub fn decode_series(values: &[f64], units: &str, calendar: &str) -> Result<Vec<Option<CalendarDateTime>>> {
    let calendar: Calendar = calendar.parse()?;
    let units = TimeUnits::parse(units, calendar)?;
    values
        .iter()
        .map(|&v| if v.is_nan() { Ok(None) } else { units.decode(v).map(Some) })
        .collect()
}

/// Whether `units` describe packed dates such as `"day as %Y%m%d.%f"`
pub fn is_packed_date_units(units: &str) -> bool {
    units.contains(" as ")
}

/// Decode packed date values such as `20210701.5` with units
/// `"day as %Y%m%d.%f"`
///
/// The integer part is left-padded with zeros to eight digits and parsed with
/// the date format; the digits after the decimal point are read as
/// microseconds (`%f`). Results are in the standard calendar.
///
/// NaN entries decode to `None`.
///
/// # Errors
///
/// Returns an error if the units carry no format or a value does not parse.
pub fn decode_packed_series(values: &[f64], units: &str) -> Result<Vec<Option<CalendarDateTime>>> {
    let format = units
        .split_whitespace()
        .nth(2)
        .ok_or_else(|| NcSliceError::TimeDecode(format!("no date format in '{units}'")))?;
    let (date_format, with_fraction) = match format.split_once(".%f") {
        Some((date, _)) => (date, true),
        None => (format, false),
    };
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                Ok(None)
            } else {
                decode_packed(v, date_format, with_fraction).map(Some)
            }
        })
        .collect()
}

fn decode_packed(value: f64, date_format: &str, with_fraction: bool) -> Result<CalendarDateTime> {
    if !value.is_finite() || value < 0.0 {
        return Err(NcSliceError::TimeDecode(format!("invalid packed date {value}")));
    }
    let text = value.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "0"));
    let padded = format!("00{int_part}");
    let padded = &padded[padded.len().saturating_sub(8)..];
    let date = NaiveDate::parse_from_str(padded, date_format)
        .map_err(|e| NcSliceError::TimeDecode(format!("cannot parse packed date '{padded}': {e}")))?;

    // `%f` semantics: "5" is 500000 microseconds
    let micro = if with_fraction {
        let digits: String = frac_part.chars().chain(std::iter::repeat('0')).take(6).collect();
        digits
            .parse::<u32>()
            .map_err(|e| NcSliceError::TimeDecode(format!("invalid fraction '{frac_part}': {e}")))?
    } else {
        0
    };
    let mut decoded = CalendarDateTime::from_ymd(Calendar::Standard, date.year(), date.month(), date.day())?;
    decoded.microsecond = micro;
    Ok(decoded)
}

/// Decimal years of a series; NaN where the date is missing
pub fn decimal_years(dates: &[Option<CalendarDateTime>]) -> Vec<f64> {
    dates
        .iter()
        .map(|d| d.as_ref().map_or(f64::NAN, CalendarDateTime::decimal_year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn julian_day_numbers_round_trip() {
        for jdn in [0, 1_721_424, 2_299_160, 2_451_545] {
            let (y, m, d) = jdn_to_julian(jdn);
            assert_eq!(julian_to_jdn(y, m, d), jdn);
        }
        // 2000-01-01 Gregorian is JD 2451545
        assert_eq!(gregorian_to_jdn(2000, 1, 1).unwrap(), 2_451_545);
    }

    #[test]
    fn standard_calendar_skips_reform_gap() {
        let units = TimeUnits::parse("days since 1582-10-04", Calendar::Standard).unwrap();
        let next = units.decode(1.0).unwrap();
        assert_eq!((next.year, next.month, next.day), (1582, 10, 15));
    }

    #[test]
    fn zone_offsets() {
        assert_eq!(parse_zone("+01:00"), Some(60));
        assert_eq!(parse_zone("-0530"), Some(-330));
        assert_eq!(parse_zone("+2"), Some(120));
        assert_eq!(parse_zone("x"), None);
    }

    #[test]
    fn fixed_year_split() {
        assert_eq!(split_fixed_year(0, 365, &CUM_DAYS_NOLEAP), (0, 1, 1));
        assert_eq!(split_fixed_year(364, 365, &CUM_DAYS_NOLEAP), (0, 12, 31));
        assert_eq!(split_fixed_year(-1, 365, &CUM_DAYS_NOLEAP), (-1, 12, 31));
    }
}
