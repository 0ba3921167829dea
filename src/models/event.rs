use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Booking, SlotTime};

/// Domain events published after a booking change has been committed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingEvent {
    Created {
        booking: Booking,
        at: NaiveDateTime,
    },
    Rescheduled {
        booking: Booking,
        previous_date: NaiveDate,
        previous_time: SlotTime,
        at: NaiveDateTime,
    },
    Cancelled {
        booking: Booking,
        at: NaiveDateTime,
    },
    Completed {
        booking: Booking,
        at: NaiveDateTime,
    },
}

impl BookingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingEvent::Created { .. } => "created",
            BookingEvent::Rescheduled { .. } => "rescheduled",
            BookingEvent::Cancelled { .. } => "cancelled",
            BookingEvent::Completed { .. } => "completed",
        }
    }

    pub fn booking(&self) -> &Booking {
        match self {
            BookingEvent::Created { booking, .. }
            | BookingEvent::Rescheduled { booking, .. }
            | BookingEvent::Cancelled { booking, .. }
            | BookingEvent::Completed { booking, .. } => booking,
        }
    }
}
