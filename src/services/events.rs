use tokio::sync::broadcast;

use crate::models::BookingEvent;

/// Fan-out of committed booking changes to whoever is listening
/// (notification workers, the admin event stream).
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<BookingEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: BookingEvent) {
        tracing::info!(
            kind = event.kind(),
            booking_id = %event.booking().id,
            date = %event.booking().preferred_date,
            time = %event.booking().appointment_time,
            "booking event"
        );
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}
