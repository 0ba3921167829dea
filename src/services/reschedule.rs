use std::sync::Arc;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{Booking, BookingEvent, BookingStatus, SlotTime};
use crate::services::booking::BookingService;

/// Moves an active booking to another slot.
///
/// The new slot is validated first, then the row is updated in a single
/// statement. The old slot only becomes free once that update lands; on any
/// failure the booking stays active at its original slot.
pub struct RescheduleService {
    bookings: Arc<BookingService>,
}

impl RescheduleService {
    pub fn new(bookings: Arc<BookingService>) -> Self {
        Self { bookings }
    }

    pub async fn reschedule(
        &self,
        booking_id: &str,
        new_date: NaiveDate,
        new_time: SlotTime,
        owner_email: Option<&str>,
    ) -> Result<Booking, AppError> {
        let _guard = self.bookings.lock_slots().await;

        let current = self.bookings.get(booking_id, owner_email).await?;
        if current.status != BookingStatus::Active {
            return Err(AppError::InvalidTransition {
                from: current.status.as_str().to_string(),
                to: BookingStatus::Active.as_str().to_string(),
            });
        }
        if current.occupies(new_date, new_time) {
            return Ok(current);
        }

        let engine = self.bookings.engine();
        if let Err(e) = engine.check_slot(new_date, new_time, Some(booking_id)).await {
            tracing::info!(
                booking_id,
                date = %new_date,
                time = %new_time,
                reason = e.code(),
                "reschedule rejected"
            );
            return Err(e);
        }

        let now = engine.clock().now();
        let moved = self
            .bookings
            .repository()
            .move_active(booking_id, new_date, new_time, now)
            .await?;
        if !moved {
            return Err(AppError::NotFound(format!("active booking {booking_id}")));
        }

        let booking = Booking {
            preferred_date: new_date,
            appointment_time: new_time,
            updated_at: now,
            ..current.clone()
        };
        self.bookings.events().publish(BookingEvent::Rescheduled {
            booking: booking.clone(),
            previous_date: current.preferred_date,
            previous_time: current.appointment_time,
            at: now,
        });
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use chrono::NaiveDateTime;

    use crate::db;
    use crate::models::BookingRequest;
    use crate::services::availability::AvailabilityEngine;
    use crate::services::buffer::BookingBufferConfig;
    use crate::services::clock::FixedClock;
    use crate::services::events::EventPublisher;
    use crate::services::store::SqliteStore;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn slot(s: &str) -> SlotTime {
        SlotTime::parse_label(s).unwrap()
    }

    fn setup() -> (Arc<BookingService>, RescheduleService, Arc<FixedClock>) {
        let conn = Arc::new(StdMutex::new(db::init_db(":memory:").unwrap()));
        let store = Arc::new(SqliteStore::new(conn));
        let clock = Arc::new(FixedClock::new(dt("2025-06-01 12:00")));
        let engine = Arc::new(AvailabilityEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(BookingBufferConfig::default()),
            clock.clone(),
            60,
        ));
        let bookings = Arc::new(BookingService::new(engine, store, EventPublisher::new(16)));
        let reschedules = RescheduleService::new(bookings.clone());
        (bookings, reschedules, clock)
    }

    async fn book(service: &BookingService, day: &str, time: &str, email: &str) -> Booking {
        let candidate = BookingRequest {
            preferred_date: day.to_string(),
            appointment_time: time.to_string(),
            service_type: "smart_home".to_string(),
            notes: None,
            pricing_total_cents: None,
            customer_name: "Customer".to_string(),
            customer_email: email.to_string(),
            customer_phone: "+15551110000".to_string(),
        }
        .validate()
        .unwrap();
        service.commit_booking(candidate).await.unwrap()
    }

    #[tokio::test]
    async fn test_reschedule_moves_booking_and_frees_old_slot() {
        let (bookings, reschedules, _) = setup();
        let original = book(&bookings, "2025-06-20", "6:30 PM", "alice@example.com").await;
        let mut rx = bookings.events().subscribe();

        let moved = reschedules
            .reschedule(&original.id, date("2025-06-21"), slot("2:00 PM"), None)
            .await
            .unwrap();
        assert_eq!(moved.id, original.id);
        assert_eq!(moved.preferred_date, date("2025-06-21"));
        assert_eq!(moved.appointment_time, slot("2:00 PM"));
        assert_eq!(moved.status, BookingStatus::Active);

        let engine = bookings.engine();
        assert!(engine.is_slot_available(date("2025-06-20"), slot("6:30 PM"), None).await.unwrap());
        assert!(!engine.is_slot_available(date("2025-06-21"), slot("2:00 PM"), None).await.unwrap());

        match rx.try_recv().unwrap() {
            BookingEvent::Rescheduled { previous_date, previous_time, .. } => {
                assert_eq!(previous_date, date("2025-06-20"));
                assert_eq!(previous_time, slot("6:30 PM"));
            }
            other => panic!("unexpected event {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_reschedule_into_taken_slot_leaves_original_intact() {
        let (bookings, reschedules, _) = setup();
        let alice = book(&bookings, "2025-06-20", "6:30 PM", "alice@example.com").await;
        book(&bookings, "2025-06-20", "7:30 PM", "bob@example.com").await;

        let err = reschedules
            .reschedule(&alice.id, date("2025-06-20"), slot("7:30 PM"), None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let after = bookings.get(&alice.id, None).await.unwrap();
        assert_eq!(after.preferred_date, date("2025-06-20"));
        assert_eq!(after.appointment_time, slot("6:30 PM"));
        assert_eq!(after.status, BookingStatus::Active);
    }

    #[tokio::test]
    async fn test_reschedule_to_closed_time_rejected() {
        let (bookings, reschedules, _) = setup();
        let alice = book(&bookings, "2025-06-20", "6:30 PM", "alice@example.com").await;
        let err = reschedules
            .reschedule(&alice.id, date("2025-06-20"), slot("11:00 AM"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OutsideBusinessHours(_)));
        assert_eq!(bookings.get(&alice.id, None).await.unwrap(), alice);
    }

    #[tokio::test]
    async fn test_reschedule_within_buffer_rejected_but_same_slot_ok() {
        let (bookings, reschedules, clock) = setup();
        let alice = book(&bookings, "2025-06-20", "6:30 PM", "alice@example.com").await;
        clock.set(dt("2025-06-20 18:00"));

        let err = reschedules
            .reschedule(&alice.id, date("2025-06-20"), slot("7:30 PM"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OutsideBusinessHours(_)));

        let same = reschedules
            .reschedule(&alice.id, date("2025-06-20"), slot("6:30 PM"), None)
            .await
            .unwrap();
        assert_eq!(same, alice);
    }

    #[tokio::test]
    async fn test_reschedule_cancelled_booking_rejected() {
        let (bookings, reschedules, _) = setup();
        let alice = book(&bookings, "2025-06-20", "6:30 PM", "alice@example.com").await;
        bookings.cancel(&alice.id, None).await.unwrap();
        let err = reschedules
            .reschedule(&alice.id, date("2025-06-21"), slot("2:00 PM"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_reschedule_scoped_to_owner() {
        let (bookings, reschedules, _) = setup();
        let alice = book(&bookings, "2025-06-20", "6:30 PM", "alice@example.com").await;
        let err = reschedules
            .reschedule(&alice.id, date("2025-06-21"), slot("2:00 PM"), Some("bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(reschedules
            .reschedule(&alice.id, date("2025-06-21"), slot("2:00 PM"), Some("alice@example.com"))
            .await
            .is_ok());
    }
}
