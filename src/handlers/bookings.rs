use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingType};
use crate::services::notify::{BookingEvent, BookingEventKind};
use crate::services::scheduling::{self, BookingRequest};
use crate::services::slots;
use crate::state::AppState;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|_| AppError::BadRequest(format!("invalid date: {s}")))
}

// ── Facilities ──

#[derive(Serialize)]
pub struct BookingTypeResponse {
    id: String,
    facility_id: String,
    name: String,
    status: String,
    start_time: String,
    end_time: String,
    interval_minutes: i32,
    max_slots: i32,
    available_days: Vec<String>,
    exception_dates: Vec<String>,
    requires_approval: bool,
}

impl BookingTypeResponse {
    pub fn from_model(bt: BookingType) -> Self {
        Self {
            id: bt.id,
            facility_id: bt.facility_id,
            name: bt.name,
            status: bt.status.as_str().to_string(),
            start_time: bt.start_time.format("%H:%M").to_string(),
            end_time: bt.end_time.format("%H:%M").to_string(),
            interval_minutes: bt.interval_minutes,
            max_slots: bt.max_slots,
            available_days: bt.available_days,
            exception_dates: bt
                .exception_dates
                .iter()
                .map(|d| d.format(DATE_FMT).to_string())
                .collect(),
            requires_approval: bt.requires_approval,
        }
    }
}

#[derive(Serialize)]
pub struct FacilityResponse {
    id: String,
    name: String,
    description: Option<String>,
    booking_types: Vec<BookingTypeResponse>,
}

// GET /api/facilities
pub async fn list_facilities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FacilityResponse>>, AppError> {
    let db = state.db.lock().unwrap();

    let facilities = queries::list_facilities(&db, true)?;
    let mut response = Vec::with_capacity(facilities.len());
    for facility in facilities {
        let booking_types = queries::list_booking_types(&db, Some(&facility.id), true)?;
        response.push(FacilityResponse {
            id: facility.id,
            name: facility.name,
            description: facility.description,
            booking_types: booking_types
                .into_iter()
                .map(BookingTypeResponse::from_model)
                .collect(),
        });
    }

    Ok(Json(response))
}

// ── Availability ──

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub booking_type_id: String,
    pub date: String,
    pub exclude_booking_id: Option<String>,
}

#[derive(Serialize)]
pub struct SlotResponse {
    slot_index: i32,
    slot_time: String,
    available: bool,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    date: String,
    selectable: bool,
    reason: Option<String>,
    max_slots: i32,
    slots: Vec<SlotResponse>,
}

// GET /api/availability
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = parse_date(&query.date)?;
    let db = state.db.lock().unwrap();

    let booking_type = queries::get_booking_type(&db, &query.booking_type_id)?
        .filter(|bt| bt.status == crate::models::BookingTypeStatus::Active)
        .ok_or_else(|| AppError::NotFound(format!("booking type {}", query.booking_type_id)))?;

    let today = Utc::now().date_naive();
    if !booking_type.is_date_selectable(date, today) {
        return Ok(Json(AvailabilityResponse {
            date: query.date,
            selectable: false,
            reason: Some(format!(
                "bookings are available on: {}",
                booking_type.available_days_human_readable()
            )),
            max_slots: booking_type.max_slots,
            slots: vec![],
        }));
    }

    let generated = slots::generate_slots(
        date,
        booking_type.start_time,
        booking_type.end_time,
        booking_type.interval_minutes,
    );
    let existing = queries::get_active_bookings_for_date(&db, &booking_type.facility_id, date)?;
    let annotated = slots::filter_available(
        &generated,
        &existing,
        query.exclude_booking_id.as_deref(),
    );

    Ok(Json(AvailabilityResponse {
        date: query.date,
        selectable: true,
        reason: None,
        max_slots: booking_type.max_slots,
        slots: annotated
            .into_iter()
            .map(|s| SlotResponse {
                slot_index: s.slot_index,
                slot_time: s.slot_time.format(DATETIME_FMT).to_string(),
                available: s.available,
            })
            .collect(),
    }))
}

// ── Bookings ──

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    facility_id: String,
    booking_type_id: String,
    user_id: String,
    date: String,
    slot_indexes: Vec<i32>,
    start_time: String,
    end_time: String,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BookingResponse {
    pub fn from_model(b: Booking) -> Self {
        Self {
            id: b.id,
            facility_id: b.facility_id,
            booking_type_id: b.booking_type_id,
            user_id: b.user_id,
            date: b.date.format(DATE_FMT).to_string(),
            slot_indexes: b.slots.iter().map(|s| s.slot_index).collect(),
            start_time: b.start_time.format(DATETIME_FMT).to_string(),
            end_time: b.end_time.format(DATETIME_FMT).to_string(),
            status: b.status.as_str().to_string(),
            notes: b.notes,
            created_at: b.created_at.format(DATETIME_FMT).to_string(),
            updated_at: b.updated_at.format(DATETIME_FMT).to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct UpsertBookingRequest {
    pub id: Option<String>,
    pub booking_type_id: String,
    pub user_id: String,
    pub date: String,
    pub slot_indexes: Vec<i32>,
    pub notes: Option<String>,
}

// POST /api/bookings: create when `id` is absent, edit when present.
pub async fn upsert_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpsertBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let date = parse_date(&body.date)?;
    let is_edit = body.id.is_some();

    let request = BookingRequest {
        id: body.id,
        booking_type_id: body.booking_type_id,
        user_id: body.user_id,
        date,
        slot_indexes: body.slot_indexes,
        notes: body.notes,
    };

    let booking = {
        let mut db = state.db.lock().unwrap();
        let now = Utc::now().naive_utc();
        scheduling::upsert_booking(&mut db, &request, now.date(), now)?
    };

    if !is_edit {
        let event = BookingEvent::new(BookingEventKind::Created, &booking);
        if let Err(e) = state.notifier.notify(&event).await {
            tracing::warn!(error = %e, booking_id = %booking.id, "failed to send booking notification");
        }
    }

    Ok(Json(BookingResponse::from_model(booking)))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

// GET /api/bookings?user_id=
pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_user(&db, &query.user_id)?
    };

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from_model).collect(),
    ))
}

// DELETE /api/bookings/:id?user_id=
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = {
        let db = state.db.lock().unwrap();
        queries::delete_booking_owned(&db, &id, &query.user_id)?
    };

    if removed {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("booking {id}")))
    }
}
