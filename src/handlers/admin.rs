use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, ApiQuery};
use crate::handlers::bookings::parse_slot;
use crate::models::business_hours::parse_weekday;
use crate::models::{parse_date, Booking, BookingStatus, BusinessHours};
use crate::services::buffer;
use crate::services::store::{BookingFilter, BusinessHoursStore};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| BookingStatus::parse(s).ok_or_else(|| AppError::Validation(format!("unknown status: {s}"))))
        .transpose()?;
    let date = query.date.as_deref().map(parse_date).transpose()?;
    let filter = BookingFilter {
        status,
        date,
        limit: Some(query.limit.unwrap_or(50).clamp(1, 500)),
    };

    Ok(Json(state.bookings.list(&filter).await?))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(state.bookings.cancel(&id, None).await?))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(state.bookings.complete(&id).await?))
}

// POST /api/admin/bookings/:id/reschedule
#[derive(Deserialize)]
pub struct AdminRescheduleRequest {
    pub date: String,
    pub time: String,
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AdminRescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let (date, time) = parse_slot(&body.date, &body.time)?;
    Ok(Json(state.reschedules.reschedule(&id, date, time, None).await?))
}

// GET /api/admin/business-hours
pub async fn get_business_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BusinessHours>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(BusinessHoursStore::list(state.store.as_ref()).await?))
}

// POST /api/admin/business-hours
#[derive(Deserialize)]
pub struct UpdateHoursRequest {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

pub async fn update_business_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<UpdateHoursRequest>,
) -> Result<Json<BusinessHours>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let day = parse_weekday(&body.day).map_err(|e| AppError::Validation(e.to_string()))?;
    let hours = BusinessHours::new(day, &body.start_time, &body.end_time, body.is_available)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    state.store.upsert(&hours).await?;

    tracing::info!(
        day = hours.day_name(),
        start = %hours.start_time,
        end = %hours.end_time,
        open = hours.is_available,
        "business hours updated"
    );
    Ok(Json(hours))
}

// GET|POST /api/admin/buffer
#[derive(Serialize, Deserialize)]
pub struct BufferSettings {
    pub buffer_hours: u32,
}

pub async fn get_buffer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BufferSettings>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(BufferSettings {
        buffer_hours: state.buffer.hours(),
    }))
}

pub async fn update_buffer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<BufferSettings>,
) -> Result<Json<BufferSettings>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    if body.buffer_hours > buffer::MAX_BUFFER_HOURS {
        return Err(AppError::Validation(format!(
            "buffer_hours must be at most {}",
            buffer::MAX_BUFFER_HOURS
        )));
    }

    state
        .store
        .set_setting(buffer::SETTING_KEY, &body.buffer_hours.to_string())?;
    state.buffer.set_hours(body.buffer_hours);
    tracing::info!(buffer_hours = body.buffer_hours, "booking buffer updated");

    Ok(Json(body))
}

// GET /api/admin/events?token=
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource can't set headers, so the token rides in the query
    let token = query.token.as_deref().unwrap_or("");
    if token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let rx = state.events.subscribe();
    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event(event.kind())))
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event stream subscriber lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    Ok(Sse::new(StreamExt::merge(live_stream, keepalive_stream)))
}
