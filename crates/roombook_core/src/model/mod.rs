//! Domain model for room reservations.
//!
//! # Responsibility
//! - Define the canonical records used by the booking engine.
//! - Keep scheduling fields in one shape shared by storage and services.
//!
//! # Invariants
//! - Every record is identified by a stable integer id.
//! - Weekdays are a closed enumeration; no string comparison at the core.

pub mod reservation;
pub mod room;
pub mod student;
pub mod weekday;
