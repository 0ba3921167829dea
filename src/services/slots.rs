use chrono::{Duration, NaiveDate};

use crate::models::{BusinessHours, SlotTime};

/// Candidate appointment start times for `date`.
///
/// Start and end instants are built from the date's own components, so no
/// timezone conversion can shift the day. Every slot's full interval fits
/// before closing; a trailing partial interval is dropped.
pub fn generate_slots(
    date: NaiveDate,
    hours: Option<&BusinessHours>,
    interval_minutes: u32,
) -> Vec<SlotTime> {
    let hours = match hours {
        Some(h) if h.is_available && h.start_time < h.end_time => h,
        _ => return vec![],
    };
    if interval_minutes == 0 {
        return vec![];
    }

    let start = date.and_time(hours.start_time);
    let end = date.and_time(hours.end_time);
    let step = Duration::minutes(i64::from(interval_minutes));

    let mut slots = vec![];
    let mut cursor = start;
    while cursor + step <= end {
        slots.push(SlotTime::from_time(cursor.time()));
        cursor += step;
    }
    slots
}
