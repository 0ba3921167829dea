use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::availability::AvailabilityEngine;
use crate::services::booking::BookingService;
use crate::services::buffer::{self, BookingBufferConfig};
use crate::services::clock::Clock;
use crate::services::events::EventPublisher;
use crate::services::reschedule::RescheduleService;
use crate::services::store::SqliteStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub buffer: Arc<BookingBufferConfig>,
    pub engine: Arc<AvailabilityEngine>,
    pub bookings: Arc<BookingService>,
    pub reschedules: RescheduleService,
    pub events: EventPublisher,
}

impl AppState {
    /// Wires the scheduling core on top of an open connection. A buffer
    /// value saved by an admin wins over the configured default.
    pub fn new(conn: Connection, config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<Self>> {
        let store = Arc::new(SqliteStore::new(Arc::new(Mutex::new(conn))));

        let buffer_hours = match store.get_setting(buffer::SETTING_KEY)? {
            Some(saved) => saved.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %saved, "ignoring unparseable saved buffer hours");
                config.booking_buffer_hours
            }),
            None => config.booking_buffer_hours,
        };
        if buffer_hours > buffer::MAX_BUFFER_HOURS {
            tracing::warn!(buffer_hours, max = buffer::MAX_BUFFER_HOURS, "clamping booking buffer");
        }
        let buffer = Arc::new(BookingBufferConfig::new(buffer_hours));
        let buffer_hours = buffer.hours();

        let engine = Arc::new(AvailabilityEngine::new(
            store.clone(),
            store.clone(),
            buffer.clone(),
            clock,
            config.slot_interval_minutes,
        ));
        let events = EventPublisher::new(256);
        let bookings = Arc::new(BookingService::new(engine.clone(), store.clone(), events.clone()));
        let reschedules = RescheduleService::new(bookings.clone());

        tracing::info!(
            buffer_hours,
            slot_interval_minutes = config.slot_interval_minutes,
            "scheduling core ready"
        );

        Ok(Arc::new(AppState {
            config,
            store,
            buffer,
            engine,
            bookings,
            reschedules,
            events,
        }))
    }
}
