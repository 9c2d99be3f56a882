use chrono::{Duration, NaiveDateTime};

use crate::models::{BookingStatus, BookingType, Slot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("select at least one time slot")]
    EmptySelection,

    #[error("a booking may use at most {max} slot(s)")]
    TooManySlots { max: i32 },

    #[error("selected slots must be consecutive")]
    NonContiguousSelection,
}

/// A selection that passed validation: slots sorted by index, with the
/// reservation's real bounds. `end_time` is the end boundary of the last
/// slot (its start plus one interval), not the last slot's start.
#[derive(Debug, Clone)]
pub struct ValidSelection {
    pub slots: Vec<Slot>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Check a proposed slot selection against the booking type's rules.
///
/// Pure and side-effect-free: the booking form runs it for inline feedback
/// and the write path runs it again on the same inputs before persisting.
pub fn validate_selection(
    selected: &[Slot],
    booking_type: &BookingType,
) -> Result<ValidSelection, SelectionError> {
    if selected.is_empty() {
        return Err(SelectionError::EmptySelection);
    }
    if selected.len() as i32 > booking_type.max_slots {
        return Err(SelectionError::TooManySlots {
            max: booking_type.max_slots,
        });
    }

    let mut slots = selected.to_vec();
    slots.sort_by_key(|s| s.slot_index);
    for pair in slots.windows(2) {
        if pair[1].slot_index != pair[0].slot_index + 1 {
            return Err(SelectionError::NonContiguousSelection);
        }
    }

    let start_time = slots[0].slot_time;
    let end_time =
        slots[slots.len() - 1].slot_time + Duration::minutes(booking_type.interval_minutes as i64);

    Ok(ValidSelection {
        slots,
        start_time,
        end_time,
    })
}

/// Initial status for a freshly created booking. Later approve/reject
/// transitions are staff actions handled elsewhere.
pub fn initial_status(booking_type: &BookingType) -> BookingStatus {
    if booking_type.requires_approval {
        BookingStatus::Pending
    } else {
        BookingStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking_type::parse_time_of_day;
    use crate::models::BookingTypeStatus;
    use crate::services::slots::generate_slots;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn booking_type(max_slots: i32, requires_approval: bool) -> BookingType {
        let now = date("2024-05-01").and_hms_opt(0, 0, 0).unwrap();
        BookingType {
            id: "bt-1".to_string(),
            facility_id: "fac-1".to_string(),
            name: "Function room".to_string(),
            status: BookingTypeStatus::Active,
            start_time: parse_time_of_day("09:00").unwrap(),
            end_time: parse_time_of_day("17:00").unwrap(),
            interval_minutes: 30,
            max_slots,
            available_days: vec!["mon".to_string()],
            exception_dates: vec![],
            requires_approval,
            created_at: now,
            updated_at: now,
        }
    }

    fn slots_for(bt: &BookingType) -> Vec<Slot> {
        generate_slots(
            date("2024-06-03"),
            bt.start_time,
            bt.end_time,
            bt.interval_minutes,
        )
    }

    #[test]
    fn test_empty_selection() {
        let bt = booking_type(2, false);
        let err = validate_selection(&[], &bt).unwrap_err();
        assert_eq!(err, SelectionError::EmptySelection);
    }

    #[test]
    fn test_too_many_slots() {
        let bt = booking_type(2, false);
        let all = slots_for(&bt);
        let err = validate_selection(&all[0..3], &bt).unwrap_err();
        assert_eq!(err, SelectionError::TooManySlots { max: 2 });
    }

    #[test]
    fn test_gap_rejected() {
        let bt = booking_type(3, false);
        let all = slots_for(&bt);
        let picked = [all[2], all[4]];
        let err = validate_selection(&picked, &bt).unwrap_err();
        assert_eq!(err, SelectionError::NonContiguousSelection);
    }

    #[test]
    fn test_contiguous_run_accepted() {
        let bt = booking_type(3, false);
        let all = slots_for(&bt);
        let valid = validate_selection(&all[2..5], &bt).unwrap();
        assert_eq!(valid.slots.len(), 3);
        assert_eq!(valid.start_time, all[2].slot_time);
        // End is the boundary after the last slot, one interval past its start
        assert_eq!(
            valid.end_time,
            all[4].slot_time + Duration::minutes(30)
        );
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let bt = booking_type(3, false);
        let all = slots_for(&bt);
        let picked = [all[4], all[2], all[3]];
        let valid = validate_selection(&picked, &bt).unwrap();
        let indexes: Vec<i32> = valid.slots.iter().map(|s| s.slot_index).collect();
        assert_eq!(indexes, vec![2, 3, 4]);
        assert_eq!(valid.start_time, all[2].slot_time);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let bt = booking_type(3, false);
        let all = slots_for(&bt);
        let picked = [all[2], all[2]];
        let err = validate_selection(&picked, &bt).unwrap_err();
        assert_eq!(err, SelectionError::NonContiguousSelection);
    }

    #[test]
    fn test_single_slot_selection() {
        let bt = booking_type(1, false);
        let all = slots_for(&bt);
        let valid = validate_selection(&all[0..1], &bt).unwrap();
        assert_eq!(valid.start_time, all[0].slot_time);
        assert_eq!(valid.end_time, all[0].slot_time + Duration::minutes(30));
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(
            initial_status(&booking_type(2, true)),
            BookingStatus::Pending
        );
        assert_eq!(
            initial_status(&booking_type(2, false)),
            BookingStatus::Approved
        );
    }
}
