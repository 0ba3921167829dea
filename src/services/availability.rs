use std::sync::Arc;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{day_of_week, AvailabilitySlot, Booking, SlotTime};
use crate::services::buffer::BookingBufferConfig;
use crate::services::clock::Clock;
use crate::services::slots::generate_slots;
use crate::services::store::{BookingRepository, BusinessHoursStore};

/// Decides which slots of a day can be booked.
///
/// A slot is available only if it is one of the day's generated slots, it
/// starts strictly after `now + buffer`, and no other active booking holds
/// it. A booking's own current slot is exempt from the buffer rule when the
/// booking is passed as `exclude_booking_id`.
pub struct AvailabilityEngine {
    hours: Arc<dyn BusinessHoursStore>,
    bookings: Arc<dyn BookingRepository>,
    buffer: Arc<BookingBufferConfig>,
    clock: Arc<dyn Clock>,
    interval_minutes: u32,
}

impl AvailabilityEngine {
    pub fn new(
        hours: Arc<dyn BusinessHoursStore>,
        bookings: Arc<dyn BookingRepository>,
        buffer: Arc<BookingBufferConfig>,
        clock: Arc<dyn Clock>,
        interval_minutes: u32,
    ) -> Self {
        Self {
            hours,
            bookings,
            buffer,
            clock,
            interval_minutes,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn buffer(&self) -> &Arc<BookingBufferConfig> {
        &self.buffer
    }

    pub async fn slots_for(&self, date: NaiveDate) -> Result<Vec<SlotTime>, AppError> {
        let hours = self.hours.get_for_day(day_of_week(date)).await?;
        Ok(generate_slots(date, hours.as_ref(), self.interval_minutes))
    }

    /// Every slot of the day with its availability. Empty on a closed day.
    pub async fn list_available_slots(&self, date: NaiveDate) -> Result<Vec<AvailabilitySlot>, AppError> {
        let slots = self.slots_for(date).await?;
        if slots.is_empty() {
            return Ok(vec![]);
        }

        let active = self.bookings.active_bookings_on(date).await?;
        let threshold = self.clock.now() + self.buffer.lead_time();

        Ok(slots
            .into_iter()
            .map(|time| {
                let clears_buffer = date.and_time(time.time()) > threshold;
                let taken = active.iter().any(|b| b.occupies(date, time));
                AvailabilitySlot {
                    time,
                    available: clears_buffer && !taken,
                }
            })
            .collect())
    }

    pub async fn is_slot_available(
        &self,
        date: NaiveDate,
        time: SlotTime,
        exclude_booking_id: Option<&str>,
    ) -> Result<bool, AppError> {
        match self.check_slot(date, time, exclude_booking_id).await {
            Ok(()) => Ok(true),
            Err(AppError::SlotTaken { .. }) | Err(AppError::OutsideBusinessHours(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Like `is_slot_available` but says which gate rejected the slot.
    pub async fn check_slot(
        &self,
        date: NaiveDate,
        time: SlotTime,
        exclude_booking_id: Option<&str>,
    ) -> Result<(), AppError> {
        let slots = self.slots_for(date).await?;
        if slots.is_empty() {
            return Err(AppError::OutsideBusinessHours(format!(
                "we are closed on {}",
                date.format("%A, %B %-d")
            )));
        }
        if !slots.contains(&time) {
            return Err(AppError::OutsideBusinessHours(format!(
                "{} is not an offered appointment time on {}",
                time,
                date.format("%Y-%m-%d")
            )));
        }

        let active = self.bookings.active_bookings_on(date).await?;
        let own_slot = exclude_booking_id
            .and_then(|id| active.iter().find(|b| b.id == id))
            .map(|b: &Booking| b.occupies(date, time))
            .unwrap_or(false);

        let threshold = self.clock.now() + self.buffer.lead_time();
        if !own_slot && date.and_time(time.time()) <= threshold {
            return Err(AppError::OutsideBusinessHours(format!(
                "appointments must be booked at least {} hours in advance",
                self.buffer.hours()
            )));
        }

        let taken = active
            .iter()
            .filter(|b| Some(b.id.as_str()) != exclude_booking_id)
            .any(|b| b.occupies(date, time));
        if taken {
            tracing::debug!(date = %date, time = %time, "slot already held by another booking");
            return Err(AppError::SlotTaken {
                date: date.format("%Y-%m-%d").to_string(),
                time: time.label(),
            });
        }

        Ok(())
    }
}
