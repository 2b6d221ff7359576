//! Room domain record.

use crate::model::reservation::RoomId;
use serde::{Deserialize, Serialize};

/// A bookable room. Carries descriptive fields only; scheduling rules live
/// in the booking engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Human-facing room label, e.g. "H-937".
    pub room_number: String,
    pub description: String,
    /// Seats in the room.
    pub capacity: u32,
}

impl Room {
    pub fn new(
        id: RoomId,
        room_number: impl Into<String>,
        description: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            room_number: room_number.into(),
            description: description.into(),
            capacity,
        }
    }
}
