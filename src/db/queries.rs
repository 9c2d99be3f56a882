use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, BookingType, BookingTypeStatus, Facility, FacilityStatus, Slot,
};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

// ── Facilities ──

pub fn save_facility(conn: &Connection, facility: &Facility) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO facilities (id, name, description, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           description = excluded.description,
           status = excluded.status,
           updated_at = excluded.updated_at",
        params![
            facility.id,
            facility.name,
            facility.description,
            facility.status.as_str(),
            facility.created_at.format(DATETIME_FMT).to_string(),
            facility.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_facility(conn: &Connection, id: &str) -> anyhow::Result<Option<Facility>> {
    let result = conn.query_row(
        "SELECT id, name, description, status, created_at, updated_at
         FROM facilities WHERE id = ?1",
        params![id],
        |row| Ok(parse_facility_row(row)),
    );

    match result {
        Ok(facility) => Ok(Some(facility?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_facilities(conn: &Connection, only_active: bool) -> anyhow::Result<Vec<Facility>> {
    let sql = if only_active {
        "SELECT id, name, description, status, created_at, updated_at
         FROM facilities WHERE status = 'active' ORDER BY name ASC"
    } else {
        "SELECT id, name, description, status, created_at, updated_at
         FROM facilities ORDER BY name ASC"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_facility_row(row)))?;

    let mut facilities = vec![];
    for row in rows {
        facilities.push(row??);
    }
    Ok(facilities)
}

fn parse_facility_row(row: &rusqlite::Row) -> anyhow::Result<Facility> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;

    Ok(Facility {
        id,
        name,
        description,
        status: FacilityStatus::parse(&status_str),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

// ── Booking Types ──

pub fn save_booking_type(conn: &Connection, booking_type: &BookingType) -> anyhow::Result<()> {
    let available_days = serde_json::to_string(&booking_type.available_days)?;
    let exception_dates = serde_json::to_string(
        &booking_type
            .exception_dates
            .iter()
            .map(|d| d.format(DATE_FMT).to_string())
            .collect::<Vec<_>>(),
    )?;

    conn.execute(
        "INSERT INTO booking_types (id, facility_id, name, status, start_time, end_time,
                                    interval_minutes, max_slots, available_days,
                                    exception_dates, requires_approval, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
           facility_id = excluded.facility_id,
           name = excluded.name,
           status = excluded.status,
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           interval_minutes = excluded.interval_minutes,
           max_slots = excluded.max_slots,
           available_days = excluded.available_days,
           exception_dates = excluded.exception_dates,
           requires_approval = excluded.requires_approval,
           updated_at = excluded.updated_at",
        params![
            booking_type.id,
            booking_type.facility_id,
            booking_type.name,
            booking_type.status.as_str(),
            booking_type.start_time.format(TIME_FMT).to_string(),
            booking_type.end_time.format(TIME_FMT).to_string(),
            booking_type.interval_minutes,
            booking_type.max_slots,
            available_days,
            exception_dates,
            booking_type.requires_approval as i32,
            booking_type.created_at.format(DATETIME_FMT).to_string(),
            booking_type.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_type(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingType>> {
    let result = conn.query_row(
        "SELECT id, facility_id, name, status, start_time, end_time, interval_minutes,
                max_slots, available_days, exception_dates, requires_approval,
                created_at, updated_at
         FROM booking_types WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_type_row(row)),
    );

    match result {
        Ok(booking_type) => Ok(Some(booking_type?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_booking_types(
    conn: &Connection,
    facility_id: Option<&str>,
    only_active: bool,
) -> anyhow::Result<Vec<BookingType>> {
    let mut sql = String::from(
        "SELECT id, facility_id, name, status, start_time, end_time, interval_minutes,
                max_slots, available_days, exception_dates, requires_approval,
                created_at, updated_at
         FROM booking_types",
    );
    let mut clauses = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(facility_id) = facility_id {
        params_vec.push(Box::new(facility_id.to_string()));
        clauses.push(format!("facility_id = ?{}", params_vec.len()));
    }
    if only_active {
        clauses.push("status = 'active'".to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY name ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_type_row(row)))?;

    let mut booking_types = vec![];
    for row in rows {
        booking_types.push(row??);
    }
    Ok(booking_types)
}

fn parse_booking_type_row(row: &rusqlite::Row) -> anyhow::Result<BookingType> {
    let id: String = row.get(0)?;
    let facility_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let start_time_str: String = row.get(4)?;
    let end_time_str: String = row.get(5)?;
    let interval_minutes: i32 = row.get(6)?;
    let max_slots: i32 = row.get(7)?;
    let available_days_json: String = row.get(8)?;
    let exception_dates_json: String = row.get(9)?;
    let requires_approval: bool = row.get::<_, i32>(10)? != 0;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let available_days: Vec<String> =
        serde_json::from_str(&available_days_json).unwrap_or_default();
    let exception_dates: Vec<NaiveDate> = serde_json::from_str::<Vec<String>>(&exception_dates_json)
        .unwrap_or_default()
        .iter()
        .filter_map(|s| NaiveDate::parse_from_str(s, DATE_FMT).ok())
        .collect();

    Ok(BookingType {
        id,
        facility_id,
        name,
        status: BookingTypeStatus::parse(&status_str),
        start_time: parse_time(&start_time_str),
        end_time: parse_time(&end_time_str),
        interval_minutes,
        max_slots,
        available_days,
        exception_dates,
        requires_approval,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

// ── Bookings ──

pub fn save_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let slots_json = serde_json::to_string(&booking.slots)?;

    conn.execute(
        "INSERT INTO bookings (id, facility_id, booking_type_id, user_id, date, slots,
                               start_time, end_time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
           facility_id = excluded.facility_id,
           booking_type_id = excluded.booking_type_id,
           date = excluded.date,
           slots = excluded.slots,
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           notes = excluded.notes,
           updated_at = excluded.updated_at",
        params![
            booking.id,
            booking.facility_id,
            booking.booking_type_id,
            booking.user_id,
            booking.date.format(DATE_FMT).to_string(),
            slots_json,
            booking.start_time.format(DATETIME_FMT).to_string(),
            booking.end_time.format(DATETIME_FMT).to_string(),
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, facility_id, booking_type_id, user_id, date, slots, start_time,
                end_time, status, notes, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Bookings that still hold slots on a facility+date: pending and approved.
/// Rejected bookings release their slots.
pub fn get_active_bookings_for_date(
    conn: &Connection,
    facility_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, facility_id, booking_type_id, user_id, date, slots, start_time,
                end_time, status, notes, created_at, updated_at
         FROM bookings
         WHERE facility_id = ?1 AND date = ?2 AND status != 'rejected'
         ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(
        params![facility_id, date.format(DATE_FMT).to_string()],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, facility_id, booking_type_id, user_id, date, slots, start_time,
                end_time, status, notes, created_at, updated_at
         FROM bookings WHERE user_id = ?1 ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub struct BookingFilter<'a> {
    pub status: Option<&'a str>,
    pub facility_id: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub limit: i64,
}

pub fn get_all_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut sql = String::from(
        "SELECT id, facility_id, booking_type_id, user_id, date, slots, start_time,
                end_time, status, notes, created_at, updated_at
         FROM bookings",
    );
    let mut clauses = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = filter.status {
        params_vec.push(Box::new(status.to_string()));
        clauses.push(format!("status = ?{}", params_vec.len()));
    }
    if let Some(facility_id) = filter.facility_id {
        params_vec.push(Box::new(facility_id.to_string()));
        clauses.push(format!("facility_id = ?{}", params_vec.len()));
    }
    if let Some(date) = filter.date {
        params_vec.push(Box::new(date.format(DATE_FMT).to_string()));
        clauses.push(format!("date = ?{}", params_vec.len()));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    params_vec.push(Box::new(filter.limit));
    sql.push_str(&format!(" ORDER BY start_time DESC LIMIT ?{}", params_vec.len()));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn delete_booking_owned(conn: &Connection, id: &str, user_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM bookings WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let facility_id: String = row.get(1)?;
    let booking_type_id: String = row.get(2)?;
    let user_id: String = row.get(3)?;
    let date_str: String = row.get(4)?;
    let slots_json: String = row.get(5)?;
    let start_time_str: String = row.get(6)?;
    let end_time_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let notes: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .unwrap_or_else(|_| Utc::now().date_naive());
    let slots: Vec<Slot> = serde_json::from_str(&slots_json).unwrap_or_default();

    Ok(Booking {
        id,
        facility_id,
        booking_type_id,
        user_id,
        date,
        slots,
        start_time: parse_datetime(&start_time_str),
        end_time: parse_datetime(&end_time_str),
        status: BookingStatus::parse(&status_str),
        notes,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

// ── Dashboard ──

pub struct DashboardStats {
    pub facility_count: i64,
    pub pending_count: i64,
    pub upcoming_approved_count: i64,
}

pub fn get_dashboard_stats(conn: &Connection, now: NaiveDateTime) -> anyhow::Result<DashboardStats> {
    let now_str = now.format(DATETIME_FMT).to_string();

    let facility_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM facilities WHERE status = 'active'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let pending_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let upcoming_approved_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = 'approved' AND start_time > ?1",
            params![now_str],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(DashboardStats {
        facility_count,
        pending_count,
        upcoming_approved_count,
    })
}

// ── Parsing helpers ──

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .unwrap_or_default()
}
