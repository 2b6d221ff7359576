//! Pending-write batch: creations, modifications, and deletions collected
//! since the last flush.
//!
//! # Responsibility
//! - Record which entities need inserting, updating, or deleting.
//! - Flush them through the persistence gateway in that order.
//!
//! # Invariants
//! - Each entity id sits in at most one of the three sets.
//! - Registering a deletion removes any pending new/modified registration
//!   for the same id.
//! - `commit` is NOT atomic across gateway calls: each set is cleared only
//!   once its gateway call succeeds, so a mid-sequence failure leaves
//!   earlier writes persisted and the remaining sets pending. Callers must
//!   treat a storage error from `commit` as leaving store and cache
//!   potentially inconsistent. This is the documented contract, not a gap.

use crate::engine::identity::Entity;
use crate::gateway::{BatchPersist, StorageResult};

/// Entities registered for write-back, global to one flush cycle.
#[derive(Debug)]
pub struct WriteBatch<E> {
    new: Vec<E>,
    modified: Vec<E>,
    deleted: Vec<E>,
}

impl<E: Entity + Clone> WriteBatch<E> {
    pub fn new() -> Self {
        Self {
            new: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn register_new(&mut self, entity: E) {
        remove_by_id(&mut self.modified, entity.entity_id());
        remove_by_id(&mut self.deleted, entity.entity_id());
        upsert(&mut self.new, entity);
    }

    /// Records a field update. An entity still pending insertion stays in
    /// the new set with its updated state; it has no row to update yet.
    pub fn register_modified(&mut self, entity: E) {
        if contains_id(&self.new, entity.entity_id()) {
            upsert(&mut self.new, entity);
            return;
        }
        remove_by_id(&mut self.deleted, entity.entity_id());
        upsert(&mut self.modified, entity);
    }

    pub fn register_deleted(&mut self, entity: E) {
        remove_by_id(&mut self.new, entity.entity_id());
        remove_by_id(&mut self.modified, entity.entity_id());
        upsert(&mut self.deleted, entity);
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// (new, modified, deleted) set sizes, for diagnostics.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.new.len(), self.modified.len(), self.deleted.len())
    }

    pub fn clear(&mut self) {
        self.new.clear();
        self.modified.clear();
        self.deleted.clear();
    }

    /// Flushes the batch: insert every new entity, update every modified
    /// entity, delete every deleted entity. Each set is cleared only after
    /// its gateway call succeeds; see the module docs for the
    /// partial-failure contract.
    pub fn commit<G: BatchPersist<E>>(&mut self, gateway: &G) -> StorageResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        gateway.insert_rows(&self.new)?;
        self.new.clear();
        gateway.update_rows(&self.modified)?;
        self.modified.clear();
        gateway.delete_rows(&self.deleted)?;
        self.deleted.clear();
        Ok(())
    }
}

impl<E: Entity + Clone> Default for WriteBatch<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_id<E: Entity>(list: &[E], id: i64) -> bool {
    list.iter().any(|entry| entry.entity_id() == id)
}

fn remove_by_id<E: Entity>(list: &mut Vec<E>, id: i64) {
    list.retain(|entry| entry.entity_id() != id);
}

fn upsert<E: Entity>(list: &mut Vec<E>, entity: E) {
    remove_by_id(list, entity.entity_id());
    list.push(entity);
}
