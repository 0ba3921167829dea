use std::env;

use crate::services::buffer::{DEFAULT_BUFFER_HOURS, MAX_BUFFER_HOURS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub booking_buffer_hours: u32,
    pub slot_interval_minutes: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "mountbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            booking_buffer_hours: env::var("BOOKING_BUFFER_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|h: u32| h.min(MAX_BUFFER_HOURS))
                .unwrap_or(DEFAULT_BUFFER_HOURS),
            slot_interval_minutes: env::var("SLOT_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|m: &u32| *m > 0)
                .unwrap_or(60),
        }
    }
}
