use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::handlers::bookings::{BookingResponse, BookingTypeResponse};
use crate::models::booking_type::{parse_time_of_day, parse_weekday};
use crate::models::{
    BookingStatus, BookingType, BookingTypeStatus, Facility, FacilityStatus,
};
use crate::services::notify::{BookingEvent, BookingEventKind};
use crate::state::AppState;

const DATE_FMT: &str = "%Y-%m-%d";

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// ── Facilities ──

#[derive(Serialize)]
pub struct AdminFacilityResponse {
    id: String,
    name: String,
    description: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl AdminFacilityResponse {
    fn from_model(f: Facility) -> Self {
        Self {
            id: f.id,
            name: f.name,
            description: f.description,
            status: f.status.as_str().to_string(),
            created_at: f.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: f.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// GET /api/admin/facilities
pub async fn list_facilities(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminFacilityResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let facilities = queries::list_facilities(&db, false)?;
    Ok(Json(
        facilities
            .into_iter()
            .map(AdminFacilityResponse::from_model)
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct CreateFacilityRequest {
    pub name: String,
    pub description: Option<String>,
}

// POST /api/admin/facilities
pub async fn create_facility(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateFacilityRequest>,
) -> Result<Json<AdminFacilityResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("facility name is required".to_string()));
    }

    let now = Utc::now().naive_utc();
    let facility = Facility {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        description: body.description,
        status: FacilityStatus::Active,
        created_at: now,
        updated_at: now,
    };

    let db = state.db.lock().unwrap();
    queries::save_facility(&db, &facility)?;
    Ok(Json(AdminFacilityResponse::from_model(facility)))
}

#[derive(Deserialize)]
pub struct UpdateFacilityRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

// POST /api/admin/facilities/:id
pub async fn update_facility(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateFacilityRequest>,
) -> Result<Json<AdminFacilityResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let mut facility = queries::get_facility(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("facility {id}")))?;

    if let Some(name) = body.name {
        facility.name = name;
    }
    if let Some(description) = body.description {
        facility.description = Some(description);
    }
    if let Some(status) = body.status {
        facility.status = FacilityStatus::parse(&status);
    }
    facility.updated_at = Utc::now().naive_utc();

    queries::save_facility(&db, &facility)?;
    Ok(Json(AdminFacilityResponse::from_model(facility)))
}

// ── Booking Types ──

#[derive(Deserialize)]
pub struct BookingTypesQuery {
    pub facility_id: Option<String>,
}

// GET /api/admin/booking-types
pub async fn list_booking_types(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingTypesQuery>,
) -> Result<Json<Vec<BookingTypeResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let booking_types = queries::list_booking_types(&db, query.facility_id.as_deref(), false)?;
    Ok(Json(
        booking_types
            .into_iter()
            .map(BookingTypeResponse::from_model)
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct CreateBookingTypeRequest {
    pub facility_id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub interval_minutes: i32,
    pub max_slots: i32,
    pub available_days: Vec<String>,
    #[serde(default)]
    pub exception_dates: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
}

fn parse_exception_dates(raw: &[String]) -> Result<Vec<NaiveDate>, AppError> {
    raw.iter()
        .map(|s| {
            NaiveDate::parse_from_str(s, DATE_FMT)
                .map_err(|_| AppError::BadRequest(format!("invalid exception date: {s}")))
        })
        .collect()
}

fn validate_schedule_fields(
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
    interval_minutes: i32,
    max_slots: i32,
    available_days: &[String],
) -> Result<(), AppError> {
    if start_time >= end_time {
        return Err(AppError::BadRequest(
            "start_time must be before end_time".to_string(),
        ));
    }
    if interval_minutes <= 0 {
        return Err(AppError::BadRequest(
            "interval_minutes must be positive".to_string(),
        ));
    }
    if max_slots < 1 {
        return Err(AppError::BadRequest(
            "max_slots must be at least 1".to_string(),
        ));
    }
    for day in available_days {
        parse_weekday(day).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    Ok(())
}

// POST /api/admin/booking-types
pub async fn create_booking_type(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingTypeRequest>,
) -> Result<Json<BookingTypeResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let start_time =
        parse_time_of_day(&body.start_time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let end_time =
        parse_time_of_day(&body.end_time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_schedule_fields(
        start_time,
        end_time,
        body.interval_minutes,
        body.max_slots,
        &body.available_days,
    )?;
    let exception_dates = parse_exception_dates(&body.exception_dates)?;

    let db = state.db.lock().unwrap();
    queries::get_facility(&db, &body.facility_id)?
        .ok_or_else(|| AppError::NotFound(format!("facility {}", body.facility_id)))?;

    let now = Utc::now().naive_utc();
    let booking_type = BookingType {
        id: Uuid::new_v4().to_string(),
        facility_id: body.facility_id,
        name: body.name,
        status: BookingTypeStatus::Active,
        start_time,
        end_time,
        interval_minutes: body.interval_minutes,
        max_slots: body.max_slots,
        available_days: body
            .available_days
            .iter()
            .map(|d| d.to_lowercase())
            .collect(),
        exception_dates,
        requires_approval: body.requires_approval,
        created_at: now,
        updated_at: now,
    };

    queries::save_booking_type(&db, &booking_type)?;
    Ok(Json(BookingTypeResponse::from_model(booking_type)))
}

#[derive(Deserialize)]
pub struct UpdateBookingTypeRequest {
    pub name: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub interval_minutes: Option<i32>,
    pub max_slots: Option<i32>,
    pub available_days: Option<Vec<String>>,
    pub exception_dates: Option<Vec<String>>,
    pub requires_approval: Option<bool>,
}

// POST /api/admin/booking-types/:id
pub async fn update_booking_type(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingTypeRequest>,
) -> Result<Json<BookingTypeResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let mut booking_type = queries::get_booking_type(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking type {id}")))?;

    if let Some(name) = body.name {
        booking_type.name = name;
    }
    if let Some(status) = body.status {
        booking_type.status = BookingTypeStatus::parse(&status);
    }
    if let Some(start_time) = body.start_time {
        booking_type.start_time =
            parse_time_of_day(&start_time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    if let Some(end_time) = body.end_time {
        booking_type.end_time =
            parse_time_of_day(&end_time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    if let Some(interval_minutes) = body.interval_minutes {
        booking_type.interval_minutes = interval_minutes;
    }
    if let Some(max_slots) = body.max_slots {
        booking_type.max_slots = max_slots;
    }
    if let Some(available_days) = body.available_days {
        booking_type.available_days = available_days.iter().map(|d| d.to_lowercase()).collect();
    }
    if let Some(exception_dates) = body.exception_dates {
        booking_type.exception_dates = parse_exception_dates(&exception_dates)?;
    }
    if let Some(requires_approval) = body.requires_approval {
        booking_type.requires_approval = requires_approval;
    }

    validate_schedule_fields(
        booking_type.start_time,
        booking_type.end_time,
        booking_type.interval_minutes,
        booking_type.max_slots,
        &booking_type.available_days,
    )?;
    booking_type.updated_at = Utc::now().naive_utc();

    queries::save_booking_type(&db, &booking_type)?;
    Ok(Json(BookingTypeResponse::from_model(booking_type)))
}

// ── Bookings ──

#[derive(Deserialize)]
pub struct AdminBookingsQuery {
    pub status: Option<String>,
    pub facility_id: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

// GET /api/admin/bookings
pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = match &query.date {
        Some(s) => Some(
            NaiveDate::parse_from_str(s, DATE_FMT)
                .map_err(|_| AppError::BadRequest(format!("invalid date: {s}")))?,
        ),
        None => None,
    };

    let db = state.db.lock().unwrap();
    let bookings = queries::get_all_bookings(
        &db,
        &BookingFilter {
            status: query.status.as_deref(),
            facility_id: query.facility_id.as_deref(),
            date,
            limit: query.limit.unwrap_or(50),
        },
    )?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from_model).collect(),
    ))
}

async fn decide_booking(
    state: Arc<AppState>,
    headers: HeaderMap,
    id: String,
    decision: BookingStatus,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db.lock().unwrap();
        let booking = queries::get_booking_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

        if !booking.status.can_transition_to(decision) {
            return Err(AppError::Conflict(format!(
                "booking is already {}",
                booking.status.as_str()
            )));
        }

        queries::update_booking_status(&db, &id, decision)?;
        queries::get_booking_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?
    };

    let kind = match decision {
        BookingStatus::Approved => BookingEventKind::Approved,
        _ => BookingEventKind::Rejected,
    };
    let event = BookingEvent::new(kind, &booking);
    if let Err(e) = state.notifier.notify(&event).await {
        tracing::warn!(error = %e, booking_id = %booking.id, "failed to send booking notification");
    }

    Ok(Json(BookingResponse::from_model(booking)))
}

// POST /api/admin/bookings/:id/approve
pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    decide_booking(state, headers, id, BookingStatus::Approved).await
}

// POST /api/admin/bookings/:id/reject
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    decide_booking(state, headers, id, BookingStatus::Rejected).await
}

// DELETE /api/admin/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let removed = {
        let db = state.db.lock().unwrap();
        queries::delete_booking(&db, &id)?
    };

    if removed {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("booking {id}")))
    }
}

// ── Stats ──

#[derive(Serialize)]
pub struct StatsResponse {
    facility_count: i64,
    pending_count: i64,
    upcoming_approved_count: i64,
}

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_dashboard_stats(&db, Utc::now().naive_utc())?
    };

    Ok(Json(StatsResponse {
        facility_count: stats.facility_count,
        pending_count: stats.pending_count,
        upcoming_approved_count: stats.upcoming_approved_count,
    }))
}
