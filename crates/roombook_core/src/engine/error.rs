//! Engine error taxonomy.
//!
//! Three kinds, surfaced unchanged to callers:
//! - `Validation`: a business rule rejected the operation before any
//!   mutation; nothing needs cleanup.
//! - `ConcurrencyConflict`: a modify expected a confirmed slot and lost
//!   the race; callers may retry the whole operation.
//! - `Storage`: the persistence gateway failed. A failure inside a batch
//!   commit can leave persisted state ahead of or behind the cache; the
//!   core does not roll back (see the write batch docs).

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::gateway::StorageError;
use crate::model::reservation::{
    InvalidReservation, ReservationId, RoomId, SlotTime, StudentId,
};
use crate::model::weekday::Weekday;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    Validation(ValidationError),
    /// A confirmed slot was expected but only the given waitlist rank was
    /// available.
    ConcurrencyConflict { position: u32 },
    Storage(StorageError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConcurrencyConflict { position } => write!(
                f,
                "expected a confirmed reservation but could only get position {position}"
            ),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ConcurrencyConflict { .. } => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for EngineError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<InvalidReservation> for EngineError {
    fn from(value: InvalidReservation) -> Self {
        Self::Validation(ValidationError::Record(value))
    }
}

/// A business rule rejected the operation. Raised before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The student already holds the maximum number of confirmed
    /// reservations.
    ConfirmedLimit { student_id: StudentId },
    /// The student is already on the maximum number of waitlists.
    WaitlistLimit { student_id: StudentId },
    /// The student already holds a confirmed reservation at that time.
    DuplicateBooking {
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
    },
    /// The student is already on the waitlist for that room and time.
    DuplicateWaitlist {
        student_id: StudentId,
        room_id: RoomId,
    },
    UnknownReservation(ReservationId),
    UnknownRoom(RoomId),
    UnknownStudent(StudentId),
    Record(InvalidReservation),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfirmedLimit { student_id } => write!(
                f,
                "student {student_id} already has the maximum number of confirmed reservations"
            ),
            Self::WaitlistLimit { student_id } => write!(
                f,
                "student {student_id} is already on the maximum number of waitlists"
            ),
            Self::DuplicateBooking {
                student_id,
                day,
                start_time,
                end_time,
            } => write!(
                f,
                "student {student_id} already has a reservation on {day} from {start_time} to {end_time}"
            ),
            Self::DuplicateWaitlist {
                student_id,
                room_id,
            } => write!(
                f,
                "student {student_id} is already on the waitlist for room {room_id} at that time"
            ),
            Self::UnknownReservation(id) => {
                write!(f, "reservation {id} does not exist in the cache or store")
            }
            Self::UnknownRoom(id) => write!(f, "room {id} does not exist in the cache or store"),
            Self::UnknownStudent(id) => {
                write!(f, "student {id} does not exist in the cache or store")
            }
            Self::Record(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidReservation> for ValidationError {
    fn from(value: InvalidReservation) -> Self {
        Self::Record(value)
    }
}
