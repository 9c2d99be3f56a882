use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingType {
    pub id: String,
    pub facility_id: String,
    pub name: String,
    pub status: BookingTypeStatus,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub interval_minutes: i32,
    pub max_slots: i32,
    pub available_days: Vec<String>,
    pub exception_dates: Vec<NaiveDate>,
    pub requires_approval: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingTypeStatus {
    Active,
    Inactive,
}

impl BookingTypeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingTypeStatus::Active => "active",
            BookingTypeStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "inactive" => BookingTypeStatus::Inactive,
            _ => BookingTypeStatus::Active,
        }
    }
}

impl BookingType {
    /// Whether `date` can be picked for this booking type. Past dates are
    /// never selectable; otherwise the weekday must be in `available_days`
    /// and the date must not be an exception date. Pure in all inputs so
    /// switching booking types just re-runs it against the same date.
    pub fn is_date_selectable(&self, date: NaiveDate, today: NaiveDate) -> bool {
        if date < today {
            return false;
        }
        let weekday = weekday_label(date);
        if !self.available_days.iter().any(|d| d.to_lowercase() == weekday) {
            return false;
        }
        !self.exception_dates.contains(&date)
    }

    pub fn available_days_human_readable(&self) -> String {
        if self.available_days.is_empty() {
            return String::new();
        }

        let day_order = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

        let mut days = self.available_days.clone();
        days.sort_by_key(|d| {
            day_order
                .iter()
                .position(|o| *o == d.to_lowercase())
                .unwrap_or(7)
        });
        days.dedup();

        days.iter()
            .map(|d| capitalize(d))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string().to_lowercase()
}

pub fn parse_weekday(s: &str) -> anyhow::Result<()> {
    match s.to_lowercase().as_str() {
        "mon" | "tue" | "wed" | "thu" | "fri" | "sat" | "sun" => Ok(()),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

pub fn parse_time_of_day(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| anyhow::anyhow!("invalid time format: {s}"))
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}
