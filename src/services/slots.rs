use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::{Booking, Slot, SlotAvailability};

/// Expand a booking type's daily window into discrete slots for `date`.
///
/// The first slot starts at `date + start`. A slot is only emitted if it fits
/// entirely before the end boundary, so a trailing partial interval is
/// dropped. A non-positive interval or an empty window yields no slots rather
/// than an error; the caller renders an empty picker.
pub fn generate_slots(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    interval_minutes: i32,
) -> Vec<Slot> {
    if interval_minutes <= 0 || start >= end {
        return vec![];
    }

    let step = Duration::minutes(interval_minutes as i64);
    let window_end = date.and_time(end);

    let mut slots = vec![];
    let mut slot_time = date.and_time(start);
    while slot_time + step <= window_end {
        slots.push(Slot {
            slot_index: slots.len() as i32,
            slot_time,
        });
        slot_time += step;
    }
    slots
}

/// Annotate generated slots with whether they are still free, given the
/// bookings already holding slots on the same facility and date.
///
/// Collision is exact slot-time equality: slot granularity equals the
/// interval, so interval-overlap arithmetic is unnecessary. When editing an
/// existing booking, pass its id as `exclude_booking_id` so the caller's own
/// slots stay selectable for an unchanged re-save.
pub fn filter_available(
    slots: &[Slot],
    existing: &[Booking],
    exclude_booking_id: Option<&str>,
) -> Vec<SlotAvailability> {
    slots
        .iter()
        .map(|slot| {
            let taken = existing
                .iter()
                .filter(|b| exclude_booking_id != Some(b.id.as_str()))
                .any(|b| b.occupies(slot.slot_time));
            SlotAvailability {
                slot_index: slot.slot_index,
                slot_time: slot.slot_time,
                available: !taken,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::{NaiveDate, NaiveDateTime};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking_with_slots(id: &str, slots: Vec<Slot>) -> Booking {
        let now = dt("2024-05-01 00:00");
        let start_time = slots.first().map(|s| s.slot_time).unwrap_or(now);
        let end_time = slots.last().map(|s| s.slot_time).unwrap_or(now);
        Booking {
            id: id.to_string(),
            facility_id: "fac-1".to_string(),
            booking_type_id: "bt-1".to_string(),
            user_id: "user-1".to_string(),
            date: start_time.date(),
            slots,
            start_time,
            end_time,
            status: BookingStatus::Approved,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_full_day_slot_count() {
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 30);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].slot_index, 0);
        assert_eq!(slots[0].slot_time, dt("2024-06-01 09:00"));
        assert_eq!(slots[15].slot_index, 15);
        assert_eq!(slots[15].slot_time, dt("2024-06-01 16:30"));
    }

    #[test]
    fn test_trailing_partial_slot_dropped() {
        // 09:30 + 30min would end at 10:00, past the 09:45 boundary
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("09:45"), 30);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_time, dt("2024-06-01 09:00"));
    }

    #[test]
    fn test_exact_fit_keeps_last_slot() {
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("10:00"), 30);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].slot_time, dt("2024-06-01 09:30"));
    }

    #[test]
    fn test_zero_interval_yields_nothing() {
        assert!(generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 0).is_empty());
        assert!(generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), -15).is_empty());
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        assert!(generate_slots(date("2024-06-01"), time("09:00"), time("09:00"), 30).is_empty());
        assert!(generate_slots(date("2024-06-01"), time("17:00"), time("09:00"), 30).is_empty());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 45);
        let b = generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 45);
        assert_eq!(a, b);
    }

    #[test]
    fn test_occupied_slot_marked_unavailable() {
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 30);
        let existing = booking_with_slots("booked-1", vec![slots[3]]);

        let annotated = filter_available(&slots, &[existing], None);
        assert!(!annotated[3].available);
        for (i, slot) in annotated.iter().enumerate() {
            if i != 3 {
                assert!(slot.available, "slot {i} should be free");
            }
        }
    }

    #[test]
    fn test_exclude_own_booking_when_editing() {
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 30);
        let existing = booking_with_slots("booked-1", vec![slots[3]]);

        let annotated = filter_available(&slots, &[existing], Some("booked-1"));
        assert!(annotated[3].available);
    }

    #[test]
    fn test_exclude_only_matching_booking() {
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("17:00"), 30);
        let mine = booking_with_slots("mine", vec![slots[3]]);
        let theirs = booking_with_slots("theirs", vec![slots[5], slots[6]]);

        let annotated = filter_available(&slots, &[mine, theirs], Some("mine"));
        assert!(annotated[3].available);
        assert!(!annotated[5].available);
        assert!(!annotated[6].available);
    }

    #[test]
    fn test_inputs_not_mutated() {
        let slots = generate_slots(date("2024-06-01"), time("09:00"), time("11:00"), 30);
        let existing = vec![booking_with_slots("booked-1", vec![slots[0]])];
        let before = existing[0].slots.clone();

        let _ = filter_available(&slots, &existing, None);
        assert_eq!(existing[0].slots, before);
        assert_eq!(slots[0].slot_index, 0);
    }
}
