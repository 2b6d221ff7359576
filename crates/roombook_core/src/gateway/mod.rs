//! Persistence gateway contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the row-level find/insert/update/delete contracts the booking
//!   core requires from durable storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Gateways carry no business logic; cross-row rules live in the engine.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Batch writes are row-by-row and deliberately not transactional: a
//!   failing call leaves earlier rows written (see the write batch docs).

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::db::DbError;

pub mod reservation_gateway;
pub mod room_gateway;
pub mod student_gateway;

pub use reservation_gateway::{ReservationGateway, SqliteReservationGateway};
pub use room_gateway::{RoomGateway, SqliteRoomGateway};
pub use student_gateway::{SqliteStudentGateway, StudentGateway};

/// A SQLite connection shared between gateways.
///
/// The mutex serializes raw SQL access; business-rule atomicity is the
/// owning engine's lock, not this one.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Wraps a bootstrapped connection for use by the SQLite gateways.
pub fn shared_connection(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a persistence gateway.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    /// The connection has no schema applied; run migrations first.
    UninitializedSchema {
        expected_version: u32,
        actual_version: u32,
    },
    MissingTable(&'static str),
    /// A persisted row failed decoding or record-level validation.
    InvalidRow(String),
    /// An update addressed a row that does not exist.
    MissingRow {
        table: &'static str,
        id: i64,
    },
    /// The storage backend could not be reached.
    Unavailable(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedSchema {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection has schema version {actual_version}, expected {expected_version}; apply migrations first"
            ),
            Self::MissingTable(table) => write!(f, "required table `{table}` is missing"),
            Self::InvalidRow(message) => write!(f, "invalid persisted row: {message}"),
            Self::MissingRow { table, id } => {
                write!(f, "no row with id {id} in table `{table}`")
            }
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Batched row writes for one entity type.
///
/// Split from the per-entity finder traits so the write batch can flush
/// any entity through the same seam.
pub trait BatchPersist<E> {
    fn insert_rows(&self, rows: &[E]) -> StorageResult<()>;
    fn update_rows(&self, rows: &[E]) -> StorageResult<()>;
    fn delete_rows(&self, rows: &[E]) -> StorageResult<()>;
}

/// Verifies that a gateway's connection is migrated and its table present.
pub(crate) fn check_schema(conn: &Connection, table: &'static str) -> StorageResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = crate::db::migrations::latest_version();
    if actual_version == 0 {
        return Err(StorageError::UninitializedSchema {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StorageError::MissingTable(table));
    }

    Ok(())
}
