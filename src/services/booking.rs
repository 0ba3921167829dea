use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::errors::AppError;
use crate::models::{Booking, BookingCandidate, BookingEvent, BookingStatus};
use crate::services::availability::AvailabilityEngine;
use crate::services::events::EventPublisher;
use crate::services::store::{BookingFilter, BookingRepository};

/// Commits new bookings and moves active ones to a terminal status.
pub struct BookingService {
    engine: Arc<AvailabilityEngine>,
    bookings: Arc<dyn BookingRepository>,
    events: EventPublisher,
    // Serialises check-then-write so two commits never interleave.
    commit_lock: Mutex<()>,
}

impl BookingService {
    pub fn new(
        engine: Arc<AvailabilityEngine>,
        bookings: Arc<dyn BookingRepository>,
        events: EventPublisher,
    ) -> Self {
        Self {
            engine,
            bookings,
            events,
            commit_lock: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<AvailabilityEngine> {
        &self.engine
    }

    pub fn repository(&self) -> &Arc<dyn BookingRepository> {
        &self.bookings
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub(crate) async fn lock_slots(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock().await
    }

    /// Re-checks availability and inserts the booking as active.
    ///
    /// The check runs even if the caller already looked at availability;
    /// the storage unique index backs it up across processes.
    pub async fn commit_booking(&self, candidate: BookingCandidate) -> Result<Booking, AppError> {
        let _guard = self.lock_slots().await;

        if let Err(e) = self
            .engine
            .check_slot(candidate.preferred_date, candidate.appointment_time, None)
            .await
        {
            tracing::info!(
                date = %candidate.preferred_date,
                time = %candidate.appointment_time,
                reason = e.code(),
                "booking rejected"
            );
            return Err(e);
        }

        let now = self.engine.clock().now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            preferred_date: candidate.preferred_date,
            appointment_time: candidate.appointment_time,
            status: BookingStatus::Active,
            service_type: candidate.service_type,
            notes: candidate.notes,
            pricing_total_cents: candidate.pricing_total_cents,
            customer_name: candidate.customer_name,
            customer_email: candidate.customer_email,
            customer_phone: candidate.customer_phone,
            created_at: now,
            updated_at: now,
        };

        let booking = self.bookings.insert_active(booking).await?;
        self.events.publish(BookingEvent::Created {
            booking: booking.clone(),
            at: now,
        });
        Ok(booking)
    }

    pub async fn get(&self, id: &str, owner_email: Option<&str>) -> Result<Booking, AppError> {
        match self.bookings.get(id).await? {
            Some(b) if b.is_owned_by(owner_email) => Ok(b),
            _ => Err(AppError::NotFound(format!("booking {id}"))),
        }
    }

    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        self.bookings.list(filter).await
    }

    pub async fn cancel(&self, id: &str, owner_email: Option<&str>) -> Result<Booking, AppError> {
        self.finish(id, owner_email, BookingStatus::Cancelled).await
    }

    pub async fn complete(&self, id: &str) -> Result<Booking, AppError> {
        self.finish(id, None, BookingStatus::Completed).await
    }

    async fn finish(
        &self,
        id: &str,
        owner_email: Option<&str>,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let current = self.get(id, owner_email).await?;
        if !current.status.can_transition_to(status) {
            return Err(AppError::InvalidTransition {
                from: current.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        let now = self.engine.clock().now();
        if !self.bookings.update_status_if_active(id, status, now).await? {
            // Someone else finished it between our read and write.
            let latest = self.get(id, owner_email).await?;
            return Err(AppError::InvalidTransition {
                from: latest.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        let booking = Booking {
            status,
            updated_at: now,
            ..current
        };
        let event = match status {
            BookingStatus::Completed => BookingEvent::Completed {
                booking: booking.clone(),
                at: now,
            },
            _ => BookingEvent::Cancelled {
                booking: booking.clone(),
                at: now,
            },
        };
        self.events.publish(event);
        Ok(booking)
    }
}
