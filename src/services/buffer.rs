use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Duration;

pub const DEFAULT_BUFFER_HOURS: u32 = 2;
/// Thirty days. Larger values are clamped so `now + lead_time` never overflows.
pub const MAX_BUFFER_HOURS: u32 = 24 * 30;
pub const SETTING_KEY: &str = "booking_buffer_hours";

/// Minimum lead time between "now" and a bookable slot start. Shared by
/// reference with the availability engine so admin overrides apply
/// immediately.
#[derive(Debug)]
pub struct BookingBufferConfig {
    hours: AtomicU32,
}

impl BookingBufferConfig {
    pub fn new(hours: u32) -> Self {
        Self {
            hours: AtomicU32::new(hours.min(MAX_BUFFER_HOURS)),
        }
    }

    pub fn hours(&self) -> u32 {
        self.hours.load(Ordering::SeqCst)
    }

    pub fn set_hours(&self, hours: u32) {
        self.hours.store(hours.min(MAX_BUFFER_HOURS), Ordering::SeqCst);
    }

    pub fn lead_time(&self) -> Duration {
        Duration::hours(i64::from(self.hours()))
    }
}

impl Default for BookingBufferConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_HOURS)
    }
}
