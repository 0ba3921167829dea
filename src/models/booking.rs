use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::SlotTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub preferred_date: NaiveDate,
    pub appointment_time: SlotTime,
    pub status: BookingStatus,
    pub service_type: String,
    pub notes: Option<String>,
    pub pricing_total_cents: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn occupies(&self, date: NaiveDate, time: SlotTime) -> bool {
        self.status == BookingStatus::Active
            && self.preferred_date == date
            && self.appointment_time == time
    }

    /// Owner scoping: `None` means an unscoped (admin) caller.
    pub fn is_owned_by(&self, owner_email: Option<&str>) -> bool {
        match owner_email {
            None => true,
            Some(email) => self.customer_email.eq_ignore_ascii_case(email.trim()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
    Completed,
    Rescheduled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            "rescheduled" => Some(BookingStatus::Rescheduled),
            _ => None,
        }
    }

    /// Only active bookings move; every other status is terminal.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        *self == BookingStatus::Active && next != BookingStatus::Active
    }
}

/// Raw booking request as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub preferred_date: String,
    pub appointment_time: String,
    pub service_type: String,
    pub notes: Option<String>,
    pub pricing_total_cents: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

/// A booking request whose fields have been checked and typed.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingCandidate {
    pub preferred_date: NaiveDate,
    pub appointment_time: SlotTime,
    pub service_type: String,
    pub notes: Option<String>,
    pub pricing_total_cents: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl BookingRequest {
    pub fn validate(self) -> Result<BookingCandidate, AppError> {
        let preferred_date = parse_date(&self.preferred_date)?;
        let appointment_time = SlotTime::parse(&self.appointment_time).map_err(|e| AppError::Validation(e.to_string()))?;

        let service_type = required("service_type", &self.service_type)?;
        let customer_name = required("customer_name", &self.customer_name)?;
        let customer_email = required("customer_email", &self.customer_email)?;
        let customer_phone = required("customer_phone", &self.customer_phone)?;

        if !is_plausible_email(&customer_email) {
            return Err(AppError::Validation(format!("invalid email address: {customer_email}")));
        }
        if customer_phone.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
            return Err(AppError::Validation(format!("invalid phone number: {customer_phone}")));
        }
        if let Some(total) = self.pricing_total_cents {
            if total < 0 {
                return Err(AppError::Validation("pricing total cannot be negative".to_string()));
            }
        }

        Ok(BookingCandidate {
            preferred_date,
            appointment_time,
            service_type,
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            pricing_total_cents: self.pricing_total_cents,
            customer_name,
            customer_email,
            customer_phone,
        })
    }
}

/// Parses a `YYYY-MM-DD` calendar date with no time or timezone attached.
pub fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    let s = s.trim();
    if s.len() != 10 {
        return Err(AppError::Validation(format!("invalid date, expected YYYY-MM-DD: {s}")));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date, expected YYYY-MM-DD: {s}")))
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn is_plausible_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}
