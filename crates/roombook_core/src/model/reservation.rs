//! Reservation domain record.
//!
//! # Responsibility
//! - Carry the slot, owner, and queue rank of one reservation.
//! - Provide the slot/time matching helpers the booking rules are built on.
//!
//! # Invariants
//! - `id` is process-unique and never reused except by a full reset.
//! - `position == 0` is the confirmed holder of the slot; `position > 0`
//!   is a waitlist rank, 1 being next in line.
//! - `start_time < end_time` for every persisted reservation.

use crate::model::weekday::Weekday;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for a reservation row.
pub type ReservationId = i64;

/// Stable identifier for a room.
pub type RoomId = i64;

/// Stable identifier for a student.
pub type StudentId = i64;

/// Slot boundary, encoded as an integer hour mark.
pub type SlotTime = u32;

/// One reservation: a student holding or queueing for a room slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub room_id: RoomId,
    pub student_id: StudentId,
    pub day: Weekday,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    /// 0 = confirmed holder, >0 = waitlist rank.
    pub position: u32,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        position: u32,
    ) -> Self {
        Self {
            id,
            room_id,
            student_id,
            day,
            start_time,
            end_time,
            position,
        }
    }

    /// Returns whether this reservation currently holds its slot.
    pub fn is_confirmed(&self) -> bool {
        self.position == 0
    }

    /// Returns whether this reservation is queued behind a holder.
    pub fn is_waitlisted(&self) -> bool {
        self.position > 0
    }

    /// Returns whether this reservation occupies the given time, in any room.
    pub fn same_time(&self, day: Weekday, start_time: SlotTime, end_time: SlotTime) -> bool {
        self.day == day && self.start_time == start_time && self.end_time == end_time
    }

    /// Returns whether this reservation occupies the given slot: same time
    /// and same room.
    pub fn same_slot(&self, other: &Reservation) -> bool {
        self.same_time(other.day, other.start_time, other.end_time) && self.room_id == other.room_id
    }

    /// Checks the record-level invariants that do not require other rows.
    pub fn validate(&self) -> Result<(), InvalidReservation> {
        if self.start_time >= self.end_time {
            return Err(InvalidReservation::TimesOutOfOrder {
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        Ok(())
    }
}

/// Record-level validation failure for a single reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReservation {
    TimesOutOfOrder {
        start_time: SlotTime,
        end_time: SlotTime,
    },
}

impl Display for InvalidReservation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimesOutOfOrder {
                start_time,
                end_time,
            } => write!(
                f,
                "slot start time {start_time} must be before end time {end_time}"
            ),
        }
    }
}

impl Error for InvalidReservation {}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(position: u32) -> Reservation {
        Reservation::new(1, 5, 40, Weekday::Monday, 10, 11, position)
    }

    #[test]
    fn confirmed_and_waitlisted_are_disjoint() {
        assert!(reservation(0).is_confirmed());
        assert!(!reservation(0).is_waitlisted());
        assert!(reservation(2).is_waitlisted());
        assert!(!reservation(2).is_confirmed());
    }

    #[test]
    fn same_time_ignores_room() {
        let a = reservation(0);
        assert!(a.same_time(Weekday::Monday, 10, 11));
        assert!(!a.same_time(Weekday::Tuesday, 10, 11));
        assert!(!a.same_time(Weekday::Monday, 10, 12));
    }

    #[test]
    fn same_slot_requires_room_match() {
        let a = reservation(0);
        let mut b = reservation(1);
        assert!(a.same_slot(&b));
        b.room_id = 6;
        assert!(!a.same_slot(&b));
    }

    #[test]
    fn validate_rejects_inverted_and_empty_slots() {
        let mut r = reservation(0);
        r.start_time = 11;
        r.end_time = 10;
        assert!(matches!(
            r.validate(),
            Err(InvalidReservation::TimesOutOfOrder { .. })
        ));

        r.end_time = 11;
        assert!(r.validate().is_err());

        r.end_time = 12;
        assert!(r.validate().is_ok());
    }
}
