//! Reservation gateway contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the row-level reservation queries the booking engine needs:
//!   by id, by student, by day, by exact slot, and slot successors.
//! - Keep reservation SQL inside this file.
//!
//! # Invariants
//! - Row decoding validates weekday, position sign, and slot times;
//!   corrupt rows surface as `StorageError::InvalidRow`.
//! - `update_rows` reports a missing target row; `delete_rows` tolerates
//!   one (cascade purges may re-delete).

use rusqlite::{params, Row};

use super::{check_schema, BatchPersist, SharedConnection, StorageError, StorageResult};
use crate::model::reservation::{Reservation, ReservationId, RoomId, SlotTime, StudentId};
use crate::model::weekday::Weekday;

const RESERVATION_SELECT_SQL: &str = "SELECT
    reservation_id,
    room_id,
    student_id,
    week_day,
    start_time,
    end_time,
    position
FROM reservations";

/// Row-level persistence contract for reservations.
pub trait ReservationGateway: BatchPersist<Reservation> + Send + Sync {
    fn find(&self, id: ReservationId) -> StorageResult<Option<Reservation>>;
    fn find_all(&self) -> StorageResult<Vec<Reservation>>;
    /// Rows occupying exactly the given (day, start, end, room) slot.
    fn find_matching_slot(
        &self,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        room_id: RoomId,
    ) -> StorageResult<Vec<Reservation>>;
    fn find_for_student(&self, student_id: StudentId) -> StorageResult<Vec<Reservation>>;
    fn find_for_day(&self, day: Weekday) -> StorageResult<Vec<Reservation>>;
    /// Rows in the same slot with a strictly greater position, ascending.
    fn find_successors_in_slot(&self, reservation: &Reservation)
        -> StorageResult<Vec<Reservation>>;
    /// Deletes every reservation row.
    fn reset(&self) -> StorageResult<()>;
}

/// SQLite-backed reservation gateway.
pub struct SqliteReservationGateway {
    conn: SharedConnection,
}

impl SqliteReservationGateway {
    /// Wraps a bootstrapped connection, verifying the schema is usable.
    pub fn try_new(conn: SharedConnection) -> StorageResult<Self> {
        check_schema(&conn.lock(), "reservations")?;
        Ok(Self { conn })
    }

    fn query_rows(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<Reservation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut reservations = Vec::new();
        while let Some(row) = rows.next()? {
            reservations.push(parse_reservation_row(row)?);
        }
        Ok(reservations)
    }
}

impl ReservationGateway for SqliteReservationGateway {
    fn find(&self, id: ReservationId) -> StorageResult<Option<Reservation>> {
        let rows = self.query_rows(
            &format!("{RESERVATION_SELECT_SQL} WHERE reservation_id = ?1;"),
            params![id],
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self) -> StorageResult<Vec<Reservation>> {
        self.query_rows(&format!("{RESERVATION_SELECT_SQL};"), [])
    }

    fn find_matching_slot(
        &self,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        room_id: RoomId,
    ) -> StorageResult<Vec<Reservation>> {
        self.query_rows(
            &format!(
                "{RESERVATION_SELECT_SQL}
                 WHERE week_day = ?1
                   AND start_time = ?2
                   AND end_time = ?3
                   AND room_id = ?4
                 ORDER BY position ASC;"
            ),
            params![day.as_str(), start_time, end_time, room_id],
        )
    }

    fn find_for_student(&self, student_id: StudentId) -> StorageResult<Vec<Reservation>> {
        self.query_rows(
            &format!("{RESERVATION_SELECT_SQL} WHERE student_id = ?1;"),
            params![student_id],
        )
    }

    fn find_for_day(&self, day: Weekday) -> StorageResult<Vec<Reservation>> {
        self.query_rows(
            &format!("{RESERVATION_SELECT_SQL} WHERE week_day = ?1;"),
            params![day.as_str()],
        )
    }

    fn find_successors_in_slot(
        &self,
        reservation: &Reservation,
    ) -> StorageResult<Vec<Reservation>> {
        self.query_rows(
            &format!(
                "{RESERVATION_SELECT_SQL}
                 WHERE week_day = ?1
                   AND start_time = ?2
                   AND end_time = ?3
                   AND room_id = ?4
                   AND position > ?5
                 ORDER BY position ASC;"
            ),
            params![
                reservation.day.as_str(),
                reservation.start_time,
                reservation.end_time,
                reservation.room_id,
                reservation.position
            ],
        )
    }

    fn reset(&self) -> StorageResult<()> {
        self.conn.lock().execute("DELETE FROM reservations;", [])?;
        Ok(())
    }
}

impl BatchPersist<Reservation> for SqliteReservationGateway {
    fn insert_rows(&self, rows: &[Reservation]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for reservation in rows {
            reservation
                .validate()
                .map_err(|err| StorageError::InvalidRow(err.to_string()))?;
            conn.execute(
                "INSERT INTO reservations (
                    reservation_id,
                    room_id,
                    student_id,
                    week_day,
                    start_time,
                    end_time,
                    position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    reservation.id,
                    reservation.room_id,
                    reservation.student_id,
                    reservation.day.as_str(),
                    reservation.start_time,
                    reservation.end_time,
                    reservation.position,
                ],
            )?;
        }
        Ok(())
    }

    fn update_rows(&self, rows: &[Reservation]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for reservation in rows {
            reservation
                .validate()
                .map_err(|err| StorageError::InvalidRow(err.to_string()))?;
            let changed = conn.execute(
                "UPDATE reservations
                 SET
                    room_id = ?1,
                    student_id = ?2,
                    week_day = ?3,
                    start_time = ?4,
                    end_time = ?5,
                    position = ?6
                 WHERE reservation_id = ?7;",
                params![
                    reservation.room_id,
                    reservation.student_id,
                    reservation.day.as_str(),
                    reservation.start_time,
                    reservation.end_time,
                    reservation.position,
                    reservation.id,
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::MissingRow {
                    table: "reservations",
                    id: reservation.id,
                });
            }
        }
        Ok(())
    }

    fn delete_rows(&self, rows: &[Reservation]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for reservation in rows {
            conn.execute(
                "DELETE FROM reservations WHERE reservation_id = ?1;",
                params![reservation.id],
            )?;
        }
        Ok(())
    }
}

fn parse_reservation_row(row: &Row<'_>) -> StorageResult<Reservation> {
    let day_text: String = row.get("week_day")?;
    let day = Weekday::parse(&day_text).ok_or_else(|| {
        StorageError::InvalidRow(format!(
            "invalid weekday `{day_text}` in reservations.week_day"
        ))
    })?;

    let position: i64 = row.get("position")?;
    let position = u32::try_from(position).map_err(|_| {
        StorageError::InvalidRow(format!(
            "invalid position `{position}` in reservations.position"
        ))
    })?;

    let reservation = Reservation {
        id: row.get("reservation_id")?,
        room_id: row.get("room_id")?,
        student_id: row.get("student_id")?,
        day,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        position,
    };
    reservation
        .validate()
        .map_err(|err| StorageError::InvalidRow(err.to_string()))?;
    Ok(reservation)
}
