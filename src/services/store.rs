//! Storage ports consumed by the scheduling core, and their SQLite adapter.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, BusinessHours, SlotTime};

#[async_trait]
pub trait BusinessHoursStore: Send + Sync {
    async fn get_for_day(&self, day_of_week: u8) -> Result<Option<BusinessHours>, AppError>;

    async fn list(&self) -> Result<Vec<BusinessHours>, AppError>;

    /// Admin-only. Validates before writing.
    async fn upsert(&self, hours: &BusinessHours) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn active_bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<Booking>, AppError>;

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;

    /// Inserts an active booking. Fails with `SlotTaken` if another active
    /// booking already holds the same date and time.
    async fn insert_active(&self, booking: Booking) -> Result<Booking, AppError>;

    /// Returns false when the booking is missing or not active.
    async fn update_status_if_active(
        &self,
        id: &str,
        status: BookingStatus,
        now: NaiveDateTime,
    ) -> Result<bool, AppError>;

    /// Moves an active booking to a new slot atomically. Fails with
    /// `SlotTaken` and leaves the row untouched if the target is held.
    async fn move_active(
        &self,
        id: &str,
        date: NaiveDate,
        time: SlotTime,
        now: NaiveDateTime,
    ) -> Result<bool, AppError>;
}

pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::StorageUnavailable("database lock poisoned".to_string()))
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let db = self.conn()?;
        Ok(queries::get_setting(&db, key)?)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        let db = self.conn()?;
        Ok(queries::set_setting(&db, key, value)?)
    }
}

fn slot_taken(date: NaiveDate, time: SlotTime) -> AppError {
    AppError::SlotTaken {
        date: date.format("%Y-%m-%d").to_string(),
        time: time.label(),
    }
}

#[async_trait]
impl BusinessHoursStore for SqliteStore {
    async fn get_for_day(&self, day_of_week: u8) -> Result<Option<BusinessHours>, AppError> {
        let db = self.conn()?;
        Ok(queries::get_business_hours(&db, day_of_week)?)
    }

    async fn list(&self) -> Result<Vec<BusinessHours>, AppError> {
        let db = self.conn()?;
        Ok(queries::list_business_hours(&db)?)
    }

    async fn upsert(&self, hours: &BusinessHours) -> Result<(), AppError> {
        hours
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let db = self.conn()?;
        queries::upsert_business_hours(&db, hours)?;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for SqliteStore {
    async fn active_bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
        let db = self.conn()?;
        Ok(queries::get_active_bookings_on(&db, date)?)
    }

    async fn get(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let db = self.conn()?;
        Ok(queries::get_booking_by_id(&db, id)?)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let db = self.conn()?;
        Ok(queries::get_all_bookings(
            &db,
            filter.status,
            filter.date,
            filter.limit.unwrap_or(50),
        )?)
    }

    async fn insert_active(&self, booking: Booking) -> Result<Booking, AppError> {
        let db = self.conn()?;
        let booking = Booking {
            status: BookingStatus::Active,
            ..booking
        };
        match queries::insert_booking(&db, &booking) {
            Ok(()) => Ok(booking),
            Err(e) if queries::is_unique_violation(&e) => {
                Err(slot_taken(booking.preferred_date, booking.appointment_time))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status_if_active(
        &self,
        id: &str,
        status: BookingStatus,
        now: NaiveDateTime,
    ) -> Result<bool, AppError> {
        let db = self.conn()?;
        Ok(queries::update_booking_status_if_active(&db, id, status, now)?)
    }

    async fn move_active(
        &self,
        id: &str,
        date: NaiveDate,
        time: SlotTime,
        now: NaiveDateTime,
    ) -> Result<bool, AppError> {
        let db = self.conn()?;
        match queries::move_active_booking(&db, id, date, time, now) {
            Ok(moved) => Ok(moved),
            Err(e) if queries::is_unique_violation(&e) => Err(slot_taken(date, time)),
            Err(e) => Err(e.into()),
        }
    }
}
