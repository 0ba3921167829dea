use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, ApiQuery};
use crate::models::{parse_date, Booking, BookingRequest, SlotTime};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let candidate = body.validate()?;
    let booking = state.bookings.commit_booking(candidate).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings/:id?customer_email=
#[derive(Deserialize)]
pub struct OwnerQuery {
    pub customer_email: String,
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get(&id, Some(query.customer_email.as_str())).await?))
}

// POST /api/bookings/:id/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub date: String,
    pub time: String,
    pub customer_email: String,
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    let (date, time) = parse_slot(&body.date, &body.time)?;
    let booking = state
        .reschedules
        .reschedule(&id, date, time, Some(body.customer_email.as_str()))
        .await?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub customer_email: String,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.cancel(&id, Some(body.customer_email.as_str())).await?;
    Ok(Json(booking))
}

pub(crate) fn parse_slot(date: &str, time: &str) -> Result<(chrono::NaiveDate, SlotTime), AppError> {
    let date = parse_date(date)?;
    let time = SlotTime::parse(time).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok((date, time))
}
