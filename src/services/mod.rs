pub mod availability;
pub mod booking;
pub mod buffer;
pub mod clock;
pub mod events;
pub mod reschedule;
pub mod slots;
pub mod store;
