pub mod booking;
pub mod business_hours;
pub mod event;
pub mod slot;

pub use booking::{parse_date, Booking, BookingCandidate, BookingRequest, BookingStatus};
pub use business_hours::{day_of_week, BusinessHours};
pub use event::BookingEvent;
pub use slot::{AvailabilitySlot, SlotTime};
