//! Core domain logic for RoomBook.
//! This crate is the single source of truth for booking invariants.
//!
//! The core is consumed as a library: an HTTP layer and the test
//! harnesses call the engines directly. There is no wire protocol here.

pub mod db;
pub mod engine;
pub mod gateway;
pub mod logging;
pub mod model;

pub use engine::booking_engine::{
    BookingEngine, MAX_CONFIRMED_PER_STUDENT, MAX_WAITLISTED_PER_STUDENT,
};
pub use engine::error::{EngineError, EngineResult, ValidationError};
pub use engine::room_service::RoomService;
pub use engine::student_service::StudentService;
pub use gateway::{
    shared_connection, BatchPersist, ReservationGateway, RoomGateway, SharedConnection,
    SqliteReservationGateway, SqliteRoomGateway, SqliteStudentGateway, StorageError,
    StorageResult, StudentGateway,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::reservation::{
    InvalidReservation, Reservation, ReservationId, RoomId, SlotTime, StudentId,
};
pub use model::room::Room;
pub use model::student::Student;
pub use model::weekday::Weekday;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
