use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An appointment start time, displayed and stored as a 12-hour label
/// such as `"2:00 PM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn from_time(time: NaiveTime) -> Self {
        // Slots have minute precision.
        SlotTime(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Canonical `h:mm AM/PM` label. Noon is `12:00 PM`, midnight `12:00 AM`.
    pub fn label(&self) -> String {
        let (is_pm, hour12) = self.0.hour12();
        let suffix = if is_pm { "PM" } else { "AM" };
        format!("{hour12}:{:02} {suffix}", self.0.minute())
    }

    /// Parses a 12-hour label. Accepts an optional leading zero, any
    /// amount of whitespace before the suffix, and either case.
    pub fn parse_label(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        let upper = s.to_ascii_uppercase();
        let (clock, is_pm) = if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), true)
        } else if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), false)
        } else {
            return Err(anyhow::anyhow!("missing AM/PM in time: {s}"));
        };

        let (hour, minute) = split_clock(clock).ok_or_else(|| anyhow::anyhow!("invalid time format: {s}"))?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(anyhow::anyhow!("time out of range: {s}"));
        }

        let hour24 = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        Self::from_hm(hour24, minute).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
    }

    /// Parses a 24-hour `HH:MM` wall-clock time.
    pub fn parse_24h(s: &str) -> anyhow::Result<Self> {
        let (hour, minute) =
            split_clock(s.trim()).ok_or_else(|| anyhow::anyhow!("invalid time format: {s}"))?;
        if hour > 23 || minute > 59 {
            return Err(anyhow::anyhow!("time out of range: {s}"));
        }
        Self::from_hm(hour, minute).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
    }

    /// Accepts either a 12-hour label or a 24-hour `HH:MM` value.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.ends_with("AM") || upper.ends_with("PM") {
            Self::parse_label(s)
        } else {
            Self::parse_24h(s)
        }
    }

    pub fn to_24h(&self) -> String {
        self.0.format("%H:%M").to_string()
    }
}

fn split_clock(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((h.parse().ok()?, m.parse().ok()?))
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SlotTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One entry of the availability listing for a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySlot {
    pub time: SlotTime,
    pub available: bool,
}
