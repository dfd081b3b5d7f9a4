//! Named mute time intervals.
//!
//! Ranges are written the usual way: `times: [{start_time: "09:00", end_time: "17:00"}]`,
//! `weekdays: ["monday:friday"]`, `days_of_month: ["1:7", "-1"]`,
//! `months: ["january:march"]`, `years: ["2024:2025"]`. All evaluation is in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const WEEKDAYS: [&str; 7] = ["sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday"];
const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuteTimeInterval {
    pub name: String,
    #[serde(default)]
    pub time_intervals: Vec<TimeInterval>,
}

impl MuteTimeInterval {
    /// Active when any of its intervals contains `t`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.time_intervals.iter().any(|ti| ti.contains(t))
    }
}

/// Every populated field must match; an empty field matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeInterval {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub times: Vec<TimeRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<WeekdayRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days_of_month: Vec<DayOfMonthRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub years: Vec<YearRange>,
}

impl TimeInterval {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        let minute = t.hour() * 60 + t.minute();
        let weekday = t.weekday().num_days_from_sunday();
        let days_in_month = days_in_month(t.year(), t.month());
        (self.times.is_empty() || self.times.iter().any(|r| r.start <= minute && minute < r.end))
            && (self.weekdays.is_empty() || self.weekdays.iter().any(|r| r.0.contains(weekday as i32)))
            && (self.days_of_month.is_empty()
                || self.days_of_month.iter().any(|r| r.contains(t.day() as i32, days_in_month)))
            && (self.months.is_empty() || self.months.iter().any(|r| r.0.contains(t.month() as i32)))
            && (self.years.is_empty() || self.years.iter().any(|r| r.0.contains(t.year())))
    }
}

fn days_in_month(year: i32, month: u32) -> i32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    chrono::NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day() as i32)
        .unwrap_or(31)
}

// ── Ranges ──────────────────────────────────────────────────────────

/// Inclusive integer range with its original spelling kept for serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct InclusiveRange {
    pub begin: i32,
    pub end: i32,
    source: String,
}

impl InclusiveRange {
    fn contains(&self, v: i32) -> bool {
        self.begin <= v && v <= self.end
    }

    fn parse(s: &str, parse_one: impl Fn(&str) -> Result<i32, String>) -> Result<Self, String> {
        let (begin, end) = match s.split_once(':') {
            Some((a, b)) => (parse_one(a)?, parse_one(b)?),
            None => {
                let v = parse_one(s)?;
                (v, v)
            }
        };
        if begin > end {
            return Err(format!("start of range {s:?} must not be after its end"));
        }
        Ok(Self { begin, end, source: s.to_string() })
    }
}

macro_rules! range_type {
    ($(#[$doc:meta])* $name:ident, $parse:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(pub InclusiveRange);

        impl std::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, String> {
                InclusiveRange::parse(s, $parse).map($name)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0.source)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(D::Error::custom)
            }
        }
    };
}

fn parse_named(s: &str, names: &[&str], offset: i32, what: &str) -> Result<i32, String> {
    let lower = s.trim().to_lowercase();
    if let Some(i) = names.iter().position(|n| *n == lower) {
        return Ok(i as i32 + offset);
    }
    lower
        .parse::<i32>()
        .ok()
        .filter(|v| *v >= offset && *v < names.len() as i32 + offset)
        .ok_or_else(|| format!("{s:?} is not a valid {what}"))
}

range_type!(
    /// `monday:friday`; sunday is 0.
    WeekdayRange,
    |s: &str| parse_named(s, &WEEKDAYS, 0, "weekday")
);
range_type!(
    /// `january:march` or `1:3`.
    MonthRange,
    |s: &str| parse_named(s, &MONTHS, 1, "month")
);
range_type!(
    YearRange,
    |s: &str| s.trim().parse::<i32>().map_err(|_| format!("{s:?} is not a valid year"))
);

/// `1:7`, `-7:-1` (negative counts back from the month's end).
#[derive(Debug, Clone, PartialEq)]
pub struct DayOfMonthRange(pub InclusiveRange);

impl DayOfMonthRange {
    fn contains(&self, day: i32, days_in_month: i32) -> bool {
        let resolve = |d: i32| if d < 0 { days_in_month + d + 1 } else { d };
        resolve(self.0.begin) <= day && day <= resolve(self.0.end)
    }
}

impl std::str::FromStr for DayOfMonthRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let parse_day = |d: &str| {
            d.trim()
                .parse::<i32>()
                .ok()
                .filter(|v| *v != 0 && (-31..=31).contains(v))
                .ok_or_else(|| format!("{d:?} is not a valid day of month"))
        };
        let (begin, end) = match s.split_once(':') {
            Some((a, b)) => (parse_day(a)?, parse_day(b)?),
            None => {
                let v = parse_day(s)?;
                (v, v)
            }
        };
        // Mixed signs cannot be compared until the month is known.
        if begin.signum() == end.signum() && begin > end {
            return Err(format!("start of range {s:?} must not be after its end"));
        }
        Ok(Self(InclusiveRange { begin, end, source: s.to_string() }))
    }
}

impl Serialize for DayOfMonthRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.source)
    }
}

impl<'de> Deserialize<'de> for DayOfMonthRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Minutes since midnight, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

fn parse_clock(s: &str) -> Result<u32, String> {
    let (h, m) = s.split_once(':').ok_or_else(|| format!("invalid time of day {s:?}"))?;
    let h: u32 = h.parse().map_err(|_| format!("invalid time of day {s:?}"))?;
    let m: u32 = m.parse().map_err(|_| format!("invalid time of day {s:?}"))?;
    if m > 59 || h > 24 || (h == 24 && m != 0) {
        return Err(format!("invalid time of day {s:?}"));
    }
    Ok(h * 60 + m)
}

fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTimeRange {
    start_time: String,
    end_time: String,
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawTimeRange { start_time: format_clock(self.start), end_time: format_clock(self.end) }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTimeRange::deserialize(deserializer)?;
        let start = parse_clock(&raw.start_time).map_err(D::Error::custom)?;
        let end = parse_clock(&raw.end_time).map_err(D::Error::custom)?;
        if start >= end {
            return Err(D::Error::custom("start_time must be before end_time"));
        }
        Ok(TimeRange { start, end })
    }
}
