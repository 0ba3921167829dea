use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::SlotTime;

const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Opening hours for one day of the week. `day_of_week` is 0 for Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl BusinessHours {
    pub fn new(day_of_week: u8, start: &str, end: &str, is_available: bool) -> anyhow::Result<Self> {
        let hours = BusinessHours {
            day_of_week,
            start_time: parse_time(start)?,
            end_time: parse_time(end)?,
            is_available,
        };
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.day_of_week > 6 {
            return Err(anyhow::anyhow!("invalid day of week: {}", self.day_of_week));
        }
        if self.is_available && self.start_time >= self.end_time {
            return Err(anyhow::anyhow!(
                "start time {} must be before end time {}",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            ));
        }
        Ok(())
    }

    /// Weekday evenings 18:30-22:30, weekends 11:00-19:00.
    pub fn defaults() -> Vec<BusinessHours> {
        (0..7u8)
            .map(|day| {
                let (start, end) = if day == 0 || day == 6 {
                    (hm(11, 0), hm(19, 0))
                } else {
                    (hm(18, 30), hm(22, 30))
                };
                BusinessHours {
                    day_of_week: day,
                    start_time: start,
                    end_time: end,
                    is_available: true,
                }
            })
            .collect()
    }

    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[self.day_of_week as usize % 7]
    }
}

/// Day-of-week index (0 = Sunday) of a calendar date.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn parse_weekday(s: &str) -> anyhow::Result<u8> {
    let lower = s.trim().to_lowercase();
    if let Ok(n) = lower.parse::<u8>() {
        if n <= 6 {
            return Ok(n);
        }
    }
    DAY_NAMES
        .iter()
        .position(|d| lower.starts_with(d))
        .map(|i| i as u8)
        .ok_or_else(|| anyhow::anyhow!("invalid weekday: {s}"))
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    Ok(SlotTime::parse_24h(s)?.time())
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time(&s).map_err(serde::de::Error::custom)
    }
}
