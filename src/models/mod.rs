pub mod booking;
pub mod booking_type;
pub mod facility;
pub mod slot;

pub use booking::{Booking, BookingStatus};
pub use booking_type::{BookingType, BookingTypeStatus};
pub use facility::{Facility, FacilityStatus};
pub use slot::{Slot, SlotAvailability};
