use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One discrete bookable unit. Slots are derived on the fly from a booking
/// type's schedule; they are only ever persisted as part of a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub slot_index: i32,
    pub slot_time: NaiveDateTime,
}

/// A generated slot annotated with whether it is still free on the target
/// date. This is what the availability endpoint returns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub slot_index: i32,
    pub slot_time: NaiveDateTime,
    pub available: bool,
}
