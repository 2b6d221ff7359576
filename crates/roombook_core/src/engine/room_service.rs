//! Room service: cache/gateway/lock CRUD with no scheduling rules.
//!
//! Mirrors the booking engine's layering (public methods acquire the
//! lock, the private core assumes it is held) but rooms carry no
//! positions or conflicts. Its lock is independent of the reservation
//! subsystem's and the two are never held together.

use log::info;
use parking_lot::RwLock;

use crate::engine::batch::WriteBatch;
use crate::engine::error::{EngineResult, ValidationError};
use crate::engine::identity::IdentityCache;
use crate::gateway::RoomGateway;
use crate::model::reservation::RoomId;
use crate::model::room::Room;

pub struct RoomService<G> {
    inner: RwLock<RoomCore<G>>,
}

struct RoomCore<G> {
    gateway: G,
    cache: IdentityCache<Room>,
    batch: WriteBatch<Room>,
}

impl<G: RoomGateway> RoomService<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            inner: RwLock::new(RoomCore {
                gateway,
                cache: IdentityCache::new(),
                batch: WriteBatch::new(),
            }),
        }
    }

    /// Returns the cached room if present, otherwise loads and caches it.
    pub fn get_room(&self, id: RoomId) -> EngineResult<Option<Room>> {
        if let Some(found) = self.inner.read().cache.get(id) {
            return Ok(Some(found.clone()));
        }
        self.inner.write().load(id)
    }

    /// Loads every room, caching any not already cached.
    pub fn all_rooms(&self) -> EngineResult<Vec<Room>> {
        let mut core = self.inner.write();
        let rows = core.gateway.find_all()?;
        Ok(core.cache.merge(rows))
    }

    /// Creates a room with a caller-assigned id.
    pub fn create_room(
        &self,
        id: RoomId,
        room_number: impl Into<String>,
        description: impl Into<String>,
        capacity: u32,
    ) -> EngineResult<()> {
        let mut core = self.inner.write();
        let room = Room::new(id, room_number, description, capacity);
        core.cache.put(room.clone());
        core.batch.register_new(room);
        core.commit()?;
        info!("event=room_create module=rooms status=ok room_id={id}");
        Ok(())
    }

    /// Overwrites the descriptive fields of an existing room.
    pub fn set_room(
        &self,
        id: RoomId,
        room_number: impl Into<String>,
        description: impl Into<String>,
        capacity: u32,
    ) -> EngineResult<()> {
        let mut core = self.inner.write();
        if core.load(id)?.is_none() {
            return Err(ValidationError::UnknownRoom(id).into());
        }
        let room = Room::new(id, room_number, description, capacity);
        core.cache.put(room.clone());
        core.batch.register_modified(room);
        core.commit()
    }

    /// Removes a room from cache and store.
    pub fn erase_room(&self, id: RoomId) -> EngineResult<()> {
        let mut core = self.inner.write();
        let room = core.load(id)?.ok_or(ValidationError::UnknownRoom(id))?;
        core.cache.remove(id);
        core.batch.register_deleted(room);
        core.commit()?;
        info!("event=room_erase module=rooms status=ok room_id={id}");
        Ok(())
    }

    /// Clears the cache and the persisted rows. Fixture/test
    /// initialization only.
    pub fn reset(&self) -> EngineResult<()> {
        let mut core = self.inner.write();
        core.cache.clear();
        core.batch.clear();
        core.gateway.reset()?;
        info!("event=reset module=rooms status=ok");
        Ok(())
    }
}

impl<G: RoomGateway> RoomCore<G> {
    fn load(&mut self, id: RoomId) -> EngineResult<Option<Room>> {
        if let Some(found) = self.cache.get(id) {
            return Ok(Some(found.clone()));
        }
        match self.gateway.find(id)? {
            Some(row) => {
                self.cache.put(row.clone());
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.batch.commit(&self.gateway)?;
        Ok(())
    }
}
