pub mod webhook;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    Approved,
    Rejected,
}

/// Payload handed to the notification channel when a booking is created or
/// a staff decision lands.
#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: String,
    pub facility_id: String,
    pub user_id: String,
    pub status: BookingStatus,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl BookingEvent {
    pub fn new(kind: BookingEventKind, booking: &Booking) -> Self {
        Self {
            kind,
            booking_id: booking.id.clone(),
            facility_id: booking.facility_id.clone(),
            user_id: booking.user_id.clone(),
            status: booking.status,
            date: booking.date,
            start_time: booking.start_time,
            end_time: booking.end_time,
        }
    }
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()>;
}

/// Fallback provider when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationProvider for LogNotifier {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()> {
        tracing::info!(
            kind = ?event.kind,
            booking_id = %event.booking_id,
            user_id = %event.user_id,
            "booking event"
        );
        Ok(())
    }
}
