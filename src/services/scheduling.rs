use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingTypeStatus, Slot};
use crate::services::selection;
use crate::services::slots;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulingError {
    #[error("that date is not bookable; available on: {days}")]
    DateNotSelectable { days: String },

    #[error("selected slot is not part of this booking type's schedule")]
    UnknownSlotIndex { slot_index: i32 },

    #[error("one or more selected slots were just taken; please pick another time")]
    SlotUnavailable,
}

/// What the booking form submits. `id` present means edit, absent means
/// create; the same path serves both.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub id: Option<String>,
    pub booking_type_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub slot_indexes: Vec<i32>,
    pub notes: Option<String>,
}

/// Reject the proposed slots if any other booking already holds one of their
/// slot times. Works on a snapshot of existing bookings; the caller decides
/// how fresh that snapshot is.
pub fn check_slot_collisions(
    existing: &[Booking],
    proposed: &[Slot],
    exclude_booking_id: Option<&str>,
) -> Result<(), SchedulingError> {
    for slot in proposed {
        let taken = existing
            .iter()
            .filter(|b| exclude_booking_id != Some(b.id.as_str()))
            .any(|b| b.occupies(slot.slot_time));
        if taken {
            return Err(SchedulingError::SlotUnavailable);
        }
    }
    Ok(())
}

/// Create or update a booking inside one transaction.
///
/// The client already validated its selection for form feedback, but that
/// check ran against a stale availability snapshot. Everything is re-checked
/// here against current rows before the write: two requests racing for the
/// same slots serialize on the connection and the second one loses with
/// `SlotUnavailable`.
pub fn upsert_booking(
    conn: &mut Connection,
    req: &BookingRequest,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let tx = conn.transaction()?;

    let booking_type = queries::get_booking_type(&tx, &req.booking_type_id)?
        .filter(|bt| bt.status == BookingTypeStatus::Active)
        .ok_or_else(|| AppError::NotFound(format!("booking type {}", req.booking_type_id)))?;

    // When editing, the booking must exist and belong to the caller.
    let previous = match &req.id {
        Some(id) => {
            let b = queries::get_booking_by_id(&tx, id)?
                .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
            if b.user_id != req.user_id {
                return Err(AppError::Unauthorized);
            }
            Some(b)
        }
        None => None,
    };

    if !booking_type.is_date_selectable(req.date, today) {
        return Err(SchedulingError::DateNotSelectable {
            days: booking_type.available_days_human_readable(),
        }
        .into());
    }

    let generated = slots::generate_slots(
        req.date,
        booking_type.start_time,
        booking_type.end_time,
        booking_type.interval_minutes,
    );

    let mut selected = Vec::with_capacity(req.slot_indexes.len());
    for slot_index in &req.slot_indexes {
        let slot = generated
            .iter()
            .find(|s| s.slot_index == *slot_index)
            .copied()
            .ok_or(SchedulingError::UnknownSlotIndex {
                slot_index: *slot_index,
            })?;
        selected.push(slot);
    }

    let valid = selection::validate_selection(&selected, &booking_type)?;

    let existing = queries::get_active_bookings_for_date(&tx, &booking_type.facility_id, req.date)?;
    check_slot_collisions(&existing, &valid.slots, req.id.as_deref())?;

    let booking = match previous {
        Some(prev) => Booking {
            facility_id: booking_type.facility_id.clone(),
            booking_type_id: booking_type.id.clone(),
            date: req.date,
            slots: valid.slots,
            start_time: valid.start_time,
            end_time: valid.end_time,
            notes: req.notes.clone(),
            updated_at: now,
            ..prev
        },
        None => Booking {
            id: Uuid::new_v4().to_string(),
            facility_id: booking_type.facility_id.clone(),
            booking_type_id: booking_type.id.clone(),
            user_id: req.user_id.clone(),
            date: req.date,
            slots: valid.slots,
            start_time: valid.start_time,
            end_time: valid.end_time,
            status: selection::initial_status(&booking_type),
            notes: req.notes.clone(),
            created_at: now,
            updated_at: now,
        },
    };

    queries::save_booking(&tx, &booking)?;
    tx.commit()?;

    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::booking_type::parse_time_of_day;
    use crate::models::{BookingStatus, BookingType, Facility, FacilityStatus};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        let now = dt("2024-05-01 00:00");
        queries::save_facility(
            &conn,
            &Facility {
                id: "fac-1".to_string(),
                name: "Gym".to_string(),
                description: None,
                status: FacilityStatus::Active,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
        conn
    }

    fn seed_booking_type(conn: &Connection, max_slots: i32, requires_approval: bool) {
        let now = dt("2024-05-01 00:00");
        queries::save_booking_type(
            conn,
            &BookingType {
                id: "bt-1".to_string(),
                facility_id: "fac-1".to_string(),
                name: "Open gym".to_string(),
                status: BookingTypeStatus::Active,
                start_time: parse_time_of_day("09:00").unwrap(),
                end_time: parse_time_of_day("17:00").unwrap(),
                interval_minutes: 30,
                max_slots,
                available_days: vec!["mon".to_string(), "wed".to_string(), "fri".to_string()],
                exception_dates: vec![date("2024-06-05")],
                requires_approval,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    fn request(slot_indexes: Vec<i32>) -> BookingRequest {
        BookingRequest {
            id: None,
            booking_type_id: "bt-1".to_string(),
            user_id: "user-1".to_string(),
            // 2024-06-03 is a Monday
            date: date("2024-06-03"),
            slot_indexes,
            notes: None,
        }
    }

    const TODAY: &str = "2024-06-01";

    #[test]
    fn test_create_booking() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        let booking = upsert_booking(
            &mut conn,
            &request(vec![2, 3]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap();

        assert_eq!(booking.status, BookingStatus::Approved);
        assert_eq!(booking.start_time, dt("2024-06-03 10:00"));
        assert_eq!(booking.end_time, dt("2024-06-03 11:30"));
        assert_eq!(booking.slots.len(), 2);

        let stored = queries::get_booking_by_id(&conn, &booking.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.slots, booking.slots);
    }

    #[test]
    fn test_requires_approval_starts_pending() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, true);

        let booking = upsert_booking(
            &mut conn,
            &request(vec![0]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn test_second_booking_loses_slot_race() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        upsert_booking(
            &mut conn,
            &request(vec![2, 3]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap();

        let mut second = request(vec![3, 4]);
        second.user_id = "user-2".to_string();
        let err = upsert_booking(&mut conn, &second, date(TODAY), dt("2024-06-01 12:01"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Scheduling(SchedulingError::SlotUnavailable)
        ));
    }

    #[test]
    fn test_edit_keeps_own_slots() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        let booking = upsert_booking(
            &mut conn,
            &request(vec![2, 3]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap();

        // Re-save the same selection under the same booking id
        let mut edit = request(vec![2, 3]);
        edit.id = Some(booking.id.clone());
        edit.notes = Some("bring towels".to_string());
        let updated =
            upsert_booking(&mut conn, &edit, date(TODAY), dt("2024-06-01 13:00")).unwrap();

        assert_eq!(updated.id, booking.id);
        assert_eq!(updated.notes.as_deref(), Some("bring towels"));
        assert_eq!(updated.created_at, booking.created_at);
    }

    #[test]
    fn test_edit_by_other_user_rejected() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        let booking = upsert_booking(
            &mut conn,
            &request(vec![2]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap();

        let mut edit = request(vec![2]);
        edit.id = Some(booking.id);
        edit.user_id = "someone-else".to_string();
        let err =
            upsert_booking(&mut conn, &edit, date(TODAY), dt("2024-06-01 13:00")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_unavailable_weekday_rejected() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        let mut req = request(vec![0]);
        // 2024-06-04 is a Tuesday
        req.date = date("2024-06-04");
        let err = upsert_booking(&mut conn, &req, date(TODAY), dt("2024-06-01 12:00"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Scheduling(SchedulingError::DateNotSelectable { .. })
        ));
    }

    #[test]
    fn test_exception_date_rejected() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        let mut req = request(vec![0]);
        // 2024-06-05 is a Wednesday, normally allowed, but listed as an exception
        req.date = date("2024-06-05");
        let err = upsert_booking(&mut conn, &req, date(TODAY), dt("2024-06-01 12:00"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Scheduling(SchedulingError::DateNotSelectable { .. })
        ));
    }

    #[test]
    fn test_past_date_rejected() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        // Request for a Monday that is already behind `today`
        let mut req = request(vec![0]);
        req.date = date("2024-05-27");
        let err = upsert_booking(&mut conn, &req, date(TODAY), dt("2024-06-01 12:00"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Scheduling(SchedulingError::DateNotSelectable { .. })
        ));
    }

    #[test]
    fn test_unknown_slot_index_rejected() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        // 09:00-17:00 at 30min yields indexes 0..=15
        let err = upsert_booking(
            &mut conn,
            &request(vec![16]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Scheduling(SchedulingError::UnknownSlotIndex { slot_index: 16 })
        ));
    }

    #[test]
    fn test_too_many_slots_rejected() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);

        let err = upsert_booking(
            &mut conn,
            &request(vec![1, 2, 3]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Selection(selection::SelectionError::TooManySlots { max: 2 })
        ));
    }

    #[test]
    fn test_rejected_booking_releases_slots() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, true);

        let booking = upsert_booking(
            &mut conn,
            &request(vec![2]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap();
        queries::update_booking_status(&conn, &booking.id, BookingStatus::Rejected).unwrap();

        let mut second = request(vec![2]);
        second.user_id = "user-2".to_string();
        let result = upsert_booking(&mut conn, &second, date(TODAY), dt("2024-06-01 13:00"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_inactive_booking_type_not_bookable() {
        let mut conn = setup_db();
        seed_booking_type(&conn, 2, false);
        conn.execute(
            "UPDATE booking_types SET status = 'inactive' WHERE id = 'bt-1'",
            [],
        )
        .unwrap();

        let err = upsert_booking(
            &mut conn,
            &request(vec![0]),
            date(TODAY),
            dt("2024-06-01 12:00"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
