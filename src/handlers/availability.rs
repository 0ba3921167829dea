use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::extract::ApiQuery;
use crate::models::{parse_date, AvailabilitySlot};
use crate::state::AppState;

// GET /api/availability?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    date: NaiveDate,
    slots: Vec<AvailabilitySlot>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = parse_date(&query.date)?;
    let slots = state.engine.list_available_slots(date).await?;
    Ok(Json(AvailabilityResponse { date, slots }))
}
