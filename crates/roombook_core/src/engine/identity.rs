//! Identity cache: one canonical in-memory instance per persisted row.
//!
//! # Responsibility
//! - Map ids to the single canonical entity instance for each row that
//!   has been loaded or created.
//!
//! # Invariants
//! - After `put`, every lookup for that id observes the same canonical
//!   entry until it is removed; updates replace the entry in place.
//! - The cache does not enforce business rules and has no locking of its
//!   own; callers must hold the owning engine's lock.

use std::collections::HashMap;

use crate::model::reservation::Reservation;
use crate::model::room::Room;
use crate::model::student::Student;

/// An entity with a stable integer identity.
pub trait Entity {
    fn entity_id(&self) -> i64;
}

impl Entity for Reservation {
    fn entity_id(&self) -> i64 {
        self.id
    }
}

impl Entity for Room {
    fn entity_id(&self) -> i64 {
        self.id
    }
}

impl Entity for Student {
    fn entity_id(&self) -> i64 {
        self.id
    }
}

/// Per-entity-type map from id to the canonical in-memory instance.
#[derive(Debug)]
pub struct IdentityCache<E> {
    entries: HashMap<i64, E>,
}

impl<E: Entity + Clone> IdentityCache<E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, id: i64) -> Option<&E> {
        self.entries.get(&id)
    }

    /// Inserts the entity, overwriting any previous entry with the same
    /// id. Overwriting is how canonical state is updated in place.
    pub fn put(&mut self, entity: E) {
        self.entries.insert(entity.entity_id(), entity);
    }

    pub fn remove(&mut self, id: i64) -> Option<E> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds freshly loaded rows into the cache and returns the canonical
    /// value for each, in input order. Rows already cached keep their
    /// cached state; a loaded row never clobbers the canonical entry.
    pub fn merge(&mut self, rows: Vec<E>) -> Vec<E> {
        let mut canonical = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = self.entries.entry(row.entity_id()).or_insert(row);
            canonical.push(entry.clone());
        }
        canonical
    }
}

impl<E: Entity + Clone> Default for IdentityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}
