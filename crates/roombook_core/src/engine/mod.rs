//! Booking core: identity caching, batched write-back, and the engines
//! that enforce the scheduling rules.
//!
//! # Responsibility
//! - Turn persisted rows into canonical in-memory entities.
//! - Enforce the cross-row booking invariants atomically with respect to
//!   concurrent writers.
//!
//! # Invariants
//! - All cache and batch state is owned by an engine instance and only
//!   touched while that engine's lock is held.
//! - Public engine methods acquire the lock; the private core layers
//!   assume it is already held and never re-acquire it.

pub mod batch;
pub mod booking_engine;
pub mod error;
pub mod identity;
pub mod room_service;
pub mod student_service;
