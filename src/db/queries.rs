use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus, BusinessHours, SlotTime};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Business Hours ──

pub fn seed_business_hours(conn: &Connection) -> anyhow::Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM business_hours", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(0);
    }

    let defaults = BusinessHours::defaults();
    for hours in &defaults {
        upsert_business_hours(conn, hours)?;
    }
    Ok(defaults.len())
}

pub fn get_business_hours(conn: &Connection, day_of_week: u8) -> anyhow::Result<Option<BusinessHours>> {
    let row = conn
        .query_row(
            "SELECT day_of_week, start_time, end_time, is_available FROM business_hours WHERE day_of_week = ?1",
            params![day_of_week],
            |row| {
                Ok((
                    row.get::<_, u8>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(day, start, end, open)| parse_hours_row(day, &start, &end, open))
        .transpose()
}

pub fn list_business_hours(conn: &Connection) -> anyhow::Result<Vec<BusinessHours>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, start_time, end_time, is_available FROM business_hours ORDER BY day_of_week ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u8>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;

    let mut hours = vec![];
    for row in rows {
        let (day, start, end, open) = row?;
        hours.push(parse_hours_row(day, &start, &end, open)?);
    }
    Ok(hours)
}

pub fn upsert_business_hours(conn: &Connection, hours: &BusinessHours) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO business_hours (day_of_week, start_time, end_time, is_available)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(day_of_week) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           is_available = excluded.is_available",
        params![
            hours.day_of_week,
            hours.start_time.format("%H:%M").to_string(),
            hours.end_time.format("%H:%M").to_string(),
            hours.is_available,
        ],
    )?;
    Ok(())
}

fn parse_hours_row(day: u8, start: &str, end: &str, is_available: bool) -> anyhow::Result<BusinessHours> {
    Ok(BusinessHours {
        day_of_week: day,
        start_time: NaiveTime::parse_from_str(start, "%H:%M")
            .with_context(|| format!("bad start_time for day {day}: {start}"))?,
        end_time: NaiveTime::parse_from_str(end, "%H:%M")
            .with_context(|| format!("bad end_time for day {day}: {end}"))?,
        is_available,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, preferred_date, appointment_time, status, service_type, notes, \
     pricing_total_cents, customer_name, customer_email, customer_phone, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
        params![
            booking.id,
            booking.preferred_date.format(DATE_FORMAT).to_string(),
            booking.appointment_time.label(),
            booking.status.as_str(),
            booking.service_type,
            booking.notes,
            booking.pricing_total_cents,
            booking.customer_name,
            booking.customer_email,
            booking.customer_phone,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_active_bookings_on(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE preferred_date = ?1 AND status = 'active' ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    date_filter: Option<NaiveDate>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let status = status_filter.map(|s| s.as_str().to_string());
    let date = date_filter.map(|d| d.format(DATE_FORMAT).to_string());

    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR preferred_date = ?2)
         ORDER BY preferred_date DESC, created_at DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(params![status, date, limit], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Moves an active booking out of `active`. Returns false when the booking
/// is missing or no longer active.
pub fn update_booking_status_if_active(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'active'",
        params![status.as_str(), now.format(TS_FORMAT).to_string(), id],
    )?;
    Ok(count > 0)
}

/// Moves an active booking to a new slot in a single statement, so the old
/// slot is released only if the new one is claimed.
pub fn move_active_booking(
    conn: &Connection,
    id: &str,
    date: NaiveDate,
    time: SlotTime,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET preferred_date = ?1, appointment_time = ?2, updated_at = ?3
         WHERE id = ?4 AND status = 'active'",
        params![
            date.format(DATE_FORMAT).to_string(),
            time.label(),
            now.format(TS_FORMAT).to_string(),
            id
        ],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let time_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let preferred_date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .with_context(|| format!("bad preferred_date on booking {id}: {date_str}"))?;
    let appointment_time = SlotTime::parse_label(&time_str)
        .with_context(|| format!("bad appointment_time on booking {id}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown status on booking {id}: {status_str}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)
        .with_context(|| format!("bad created_at on booking {id}"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)
        .with_context(|| format!("bad updated_at on booking {id}"))?;

    Ok(Booking {
        id,
        preferred_date,
        appointment_time,
        status,
        service_type: row.get(4)?,
        notes: row.get(5)?,
        pricing_total_cents: row.get(6)?,
        customer_name: row.get(7)?,
        customer_email: row.get(8)?,
        customer_phone: row.get(9)?,
        created_at,
        updated_at,
    })
}

/// True when the error came from the active-slot unique index.
/// True only for a UNIQUE index clash, not primary-key or NOT NULL failures.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ── Settings ──

pub fn get_setting(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}
