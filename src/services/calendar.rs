use crate::models::{Booking, BookingStatus};

pub fn generate_ics(booking: &Booking, facility_name: &str) -> String {
    let dtstart = booking.start_time.format("%Y%m%dT%H%M%S").to_string();
    // end_time already holds the end boundary of the last slot
    let dtend = booking.end_time.format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@facilio", booking.id);

    let summary = format!("Booking at {}", facility_name);
    let description = booking.notes.as_deref().unwrap_or("No additional notes");
    let status = match booking.status {
        BookingStatus::Pending => "TENTATIVE",
        BookingStatus::Approved => "CONFIRMED",
        BookingStatus::Rejected => "CANCELLED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Facilio//Facility Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Slot;
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn booking() -> Booking {
        Booking {
            id: "bk-123".to_string(),
            facility_id: "fac-1".to_string(),
            booking_type_id: "bt-1".to_string(),
            user_id: "user-1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            slots: vec![
                Slot {
                    slot_index: 10,
                    slot_time: dt("2025-03-15 14:00"),
                },
                Slot {
                    slot_index: 11,
                    slot_time: dt("2025-03-15 14:30"),
                },
            ],
            start_time: dt("2025-03-15 14:00"),
            end_time: dt("2025-03-15 15:00"),
            status: BookingStatus::Approved,
            notes: Some("Birthday party".to_string()),
            created_at: dt("2025-03-10 10:00"),
            updated_at: dt("2025-03-10 10:00"),
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking(), "Function Room");
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("UID:bk-123@facilio"));
        assert!(ics.contains("DTSTART:20250315T140000"));
        // End is the boundary after the last slot, not its start
        assert!(ics.contains("DTEND:20250315T150000"));
        assert!(ics.contains("SUMMARY:Booking at Function Room"));
        assert!(ics.contains("DESCRIPTION:Birthday party"));
        assert!(ics.contains("STATUS:CONFIRMED"));
        assert!(ics.contains("END:VCALENDAR"));
    }

    #[test]
    fn test_pending_booking_is_tentative() {
        let mut b = booking();
        b.status = BookingStatus::Pending;
        b.notes = None;
        let ics = generate_ics(&b, "Function Room");
        assert!(ics.contains("STATUS:TENTATIVE"));
        assert!(ics.contains("DESCRIPTION:No additional notes"));
    }
}
