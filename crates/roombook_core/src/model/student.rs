//! Student domain record.
//!
//! Credentials and authentication are handled outside the core; only the
//! identity and display fields are persisted here.

use crate::model::reservation::StudentId;
use serde::{Deserialize, Serialize};

/// A student who can hold and queue for reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
}

impl Student {
    pub fn new(id: StudentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
