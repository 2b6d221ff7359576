//! Room gateway contract and SQLite implementation.

use rusqlite::{params, Row};

use super::{check_schema, BatchPersist, SharedConnection, StorageError, StorageResult};
use crate::model::reservation::RoomId;
use crate::model::room::Room;

const ROOM_SELECT_SQL: &str = "SELECT
    room_id,
    room_number,
    description,
    capacity
FROM rooms";

/// Row-level persistence contract for rooms.
pub trait RoomGateway: BatchPersist<Room> + Send + Sync {
    fn find(&self, id: RoomId) -> StorageResult<Option<Room>>;
    fn find_all(&self) -> StorageResult<Vec<Room>>;
    fn reset(&self) -> StorageResult<()>;
}

/// SQLite-backed room gateway.
pub struct SqliteRoomGateway {
    conn: SharedConnection,
}

impl SqliteRoomGateway {
    /// Wraps a bootstrapped connection, verifying the schema is usable.
    pub fn try_new(conn: SharedConnection) -> StorageResult<Self> {
        check_schema(&conn.lock(), "rooms")?;
        Ok(Self { conn })
    }
}

impl RoomGateway for SqliteRoomGateway {
    fn find(&self, id: RoomId) -> StorageResult<Option<Room>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{ROOM_SELECT_SQL} WHERE room_id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_room_row(row)?));
        }
        Ok(None)
    }

    fn find_all(&self) -> StorageResult<Vec<Room>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{ROOM_SELECT_SQL} ORDER BY room_id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut rooms = Vec::new();
        while let Some(row) = rows.next()? {
            rooms.push(parse_room_row(row)?);
        }
        Ok(rooms)
    }

    fn reset(&self) -> StorageResult<()> {
        self.conn.lock().execute("DELETE FROM rooms;", [])?;
        Ok(())
    }
}

impl BatchPersist<Room> for SqliteRoomGateway {
    fn insert_rows(&self, rows: &[Room]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for room in rows {
            conn.execute(
                "INSERT INTO rooms (room_id, room_number, description, capacity)
                 VALUES (?1, ?2, ?3, ?4);",
                params![room.id, room.room_number, room.description, room.capacity],
            )?;
        }
        Ok(())
    }

    fn update_rows(&self, rows: &[Room]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for room in rows {
            let changed = conn.execute(
                "UPDATE rooms
                 SET room_number = ?1, description = ?2, capacity = ?3
                 WHERE room_id = ?4;",
                params![room.room_number, room.description, room.capacity, room.id],
            )?;
            if changed == 0 {
                return Err(StorageError::MissingRow {
                    table: "rooms",
                    id: room.id,
                });
            }
        }
        Ok(())
    }

    fn delete_rows(&self, rows: &[Room]) -> StorageResult<()> {
        let conn = self.conn.lock();
        for room in rows {
            conn.execute("DELETE FROM rooms WHERE room_id = ?1;", params![room.id])?;
        }
        Ok(())
    }
}

fn parse_room_row(row: &Row<'_>) -> StorageResult<Room> {
    let capacity: i64 = row.get("capacity")?;
    let capacity = u32::try_from(capacity).map_err(|_| {
        StorageError::InvalidRow(format!("invalid capacity `{capacity}` in rooms.capacity"))
    })?;

    Ok(Room {
        id: row.get("room_id")?,
        room_number: row.get("room_number")?,
        description: row.get("description")?,
        capacity,
    })
}
