//! Reservation booking engine.
//!
//! # Responsibility
//! - Enforce the scheduling rules: per-student caps, duplicate detection,
//!   waitlist ranking, and cascading renumbering on removal.
//! - Keep the identity cache, pending-write batch, and persisted rows
//!   consistent under concurrent access.
//!
//! # Invariants
//! - Per student: at most 3 confirmed reservations and at most 3 waitlist
//!   entries; a student with 3 confirmed reservations holds no waitlists.
//! - Per (day, start, end, room) slot: positions are exactly
//!   `0, 1, …, n-1` with no gaps or duplicates.
//! - Every validation runs before any mutation, so a rejected operation
//!   leaves cache, batch, and store untouched.
//!
//! # Locking
//! Public methods acquire the engine's `RwLock`; [`BookingCore`] is the
//! lock-free layer reachable only through a held guard. Mutating
//! operations hold the exclusive lock for their whole duration, gateway
//! round-trips included, because the rules read several rows and write
//! based on what they saw. `get_reservation` serves cache hits under the
//! shared lock and escalates only to load a miss; the collection reads
//! merge rows into the cache and therefore take the exclusive lock.

use log::{error, info, warn};
use parking_lot::RwLock;

use crate::engine::batch::WriteBatch;
use crate::engine::error::{EngineError, EngineResult, ValidationError};
use crate::engine::identity::IdentityCache;
use crate::gateway::ReservationGateway;
use crate::model::reservation::{Reservation, ReservationId, RoomId, SlotTime, StudentId};
use crate::model::weekday::Weekday;

/// Most confirmed reservations one student may hold at once.
pub const MAX_CONFIRMED_PER_STUDENT: usize = 3;

/// Most waitlist entries one student may hold at once.
pub const MAX_WAITLISTED_PER_STUDENT: usize = 3;

/// The reservation subsystem: gateway, identity cache, pending-write
/// batch, and id counter behind one reader/writer lock.
pub struct BookingEngine<G> {
    inner: RwLock<BookingCore<G>>,
}

/// Lock-free internal layer. Methods assume the caller holds the engine
/// lock; the only way to reach them is through a guard on `inner`.
struct BookingCore<G> {
    gateway: G,
    cache: IdentityCache<Reservation>,
    batch: WriteBatch<Reservation>,
    next_id: ReservationId,
}

impl<G: ReservationGateway> BookingEngine<G> {
    /// Builds an engine over the given gateway, warming the cache and
    /// seeding the id counter past the highest persisted id.
    pub fn new(gateway: G) -> EngineResult<Self> {
        let rows = gateway.find_all()?;
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let mut cache = IdentityCache::new();
        cache.merge(rows);
        info!(
            "event=engine_init module=booking status=ok next_id={next_id} cached={}",
            cache.len()
        );
        Ok(Self {
            inner: RwLock::new(BookingCore {
                gateway,
                cache,
                batch: WriteBatch::new(),
                next_id,
            }),
        })
    }

    /// Returns the cached reservation if present, otherwise loads it from
    /// the store and caches it. `None` when no row exists.
    pub fn get_reservation(&self, id: ReservationId) -> EngineResult<Option<Reservation>> {
        if let Some(found) = self.inner.read().cache.get(id) {
            return Ok(Some(found.clone()));
        }
        self.inner.write().load(id)
    }

    /// Loads every reservation, caching any not already cached.
    pub fn all_reservations(&self) -> EngineResult<Vec<Reservation>> {
        let mut core = self.inner.write();
        let rows = core.gateway.find_all()?;
        Ok(core.cache.merge(rows))
    }

    /// Loads one student's reservations, caching any not already cached.
    pub fn reservations_for_student(
        &self,
        student_id: StudentId,
    ) -> EngineResult<Vec<Reservation>> {
        self.inner.write().load_for_student(student_id)
    }

    /// Loads one day's reservations, caching any not already cached.
    pub fn reservations_for_day(&self, day: Weekday) -> EngineResult<Vec<Reservation>> {
        let mut core = self.inner.write();
        let rows = core.gateway.find_for_day(day)?;
        Ok(core.cache.merge(rows))
    }

    /// Books the slot for the student and returns the assigned position:
    /// 0 when the slot was free, otherwise the waitlist rank.
    pub fn book(
        &self,
        room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
    ) -> EngineResult<u32> {
        self.inner
            .write()
            .book(room_id, student_id, day, start_time, end_time)
    }

    /// Replaces an existing reservation with a booking for a new slot.
    ///
    /// When `expect_confirmed` is set and the new slot already has a
    /// holder, fails with [`EngineError::ConcurrencyConflict`]: another
    /// actor claimed the slot between the caller's check and this call.
    /// On success the old reservation is erased (cascading renumbering
    /// applies) and the position assigned to the new booking is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn modify(
        &self,
        old_id: ReservationId,
        new_room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        expect_confirmed: bool,
    ) -> EngineResult<u32> {
        self.inner.write().modify(
            old_id,
            new_room_id,
            student_id,
            day,
            start_time,
            end_time,
            expect_confirmed,
        )
    }

    /// Overwrites every field of an existing reservation and persists the
    /// change. Fails with `UnknownReservation` when the id is not in the
    /// cache or store.
    #[allow(clippy::too_many_arguments)]
    pub fn set_fields(
        &self,
        id: ReservationId,
        room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        position: u32,
    ) -> EngineResult<()> {
        let mut core = self.inner.write();
        core.set_fields_pending(id, room_id, student_id, day, start_time, end_time, position)?;
        core.commit()
    }

    /// Removes a reservation, promoting everything queued behind it in the
    /// same slot by one position.
    pub fn erase(&self, id: ReservationId) -> EngineResult<()> {
        let mut core = self.inner.write();
        let target = core
            .load(id)?
            .ok_or(ValidationError::UnknownReservation(id))?;
        core.erase(&target)
    }

    /// Clears the cache and the persisted rows and restarts the id counter
    /// at 1. Fixture/test initialization only.
    pub fn reset(&self) -> EngineResult<()> {
        self.inner.write().reset()
    }
}

impl<G: ReservationGateway> BookingCore<G> {
    fn load(&mut self, id: ReservationId) -> EngineResult<Option<Reservation>> {
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

    fn load_for_student(&mut self, student_id: StudentId) -> EngineResult<Vec<Reservation>> {
        let rows = self.gateway.find_for_student(student_id)?;
        Ok(self.cache.merge(rows))
    }

    /// Next free rank for a slot: the count of rows already occupying it.
    /// The contiguity invariant makes the count equal to the next rank.
    fn position_for_slot(
        &mut self,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        room_id: RoomId,
    ) -> EngineResult<u32> {
        let rows = self
            .gateway
            .find_matching_slot(day, start_time, end_time, room_id)?;
        let occupants = self.cache.merge(rows);
        Ok(occupants.len() as u32)
    }

    fn book(
        &mut self,
        room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
    ) -> EngineResult<u32> {
        Reservation::new(0, room_id, student_id, day, start_time, end_time, 0).validate()?;

        let position = self.position_for_slot(day, start_time, end_time, room_id)?;
        let existing = self.load_for_student(student_id)?;

        if confirmed_count(&existing) >= MAX_CONFIRMED_PER_STUDENT {
            warn!(
                "event=book module=booking status=rejected reason=confirmed_limit student_id={student_id}"
            );
            return Err(ValidationError::ConfirmedLimit { student_id }.into());
        }
        if position > 0 && waitlist_count(&existing) >= MAX_WAITLISTED_PER_STUDENT {
            warn!(
                "event=book module=booking status=rejected reason=waitlist_limit student_id={student_id}"
            );
            return Err(ValidationError::WaitlistLimit { student_id }.into());
        }

        // Same-time entries: a confirmed one or a waitlist for this room
        // rejects the booking; waitlists on other rooms are superseded
        // below when the new booking is confirmed.
        let superseded =
            same_time_waitlists(&existing, student_id, day, start_time, end_time, room_id)?;

        let mut purged: Vec<ReservationId> = Vec::new();
        if position == 0 {
            for stale in &superseded {
                self.erase(stale)?;
                purged.push(stale.id);
            }
            // Gaining the final confirmed slot: a fully booked student
            // waits for nothing.
            if confirmed_count(&existing) == MAX_CONFIRMED_PER_STUDENT - 1 {
                for stale in existing
                    .iter()
                    .filter(|r| r.is_waitlisted() && !purged.contains(&r.id))
                {
                    self.erase(stale)?;
                }
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let reservation =
            Reservation::new(id, room_id, student_id, day, start_time, end_time, position);
        self.cache.put(reservation.clone());
        self.batch.register_new(reservation);
        self.commit()?;
        info!(
            "event=book module=booking status=ok reservation_id={id} student_id={student_id} room_id={room_id} day={day} start={start_time} end={end_time} position={position}"
        );
        Ok(position)
    }

    #[allow(clippy::too_many_arguments)]
    fn modify(
        &mut self,
        old_id: ReservationId,
        new_room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        expect_confirmed: bool,
    ) -> EngineResult<u32> {
        let old = self
            .load(old_id)?
            .ok_or(ValidationError::UnknownReservation(old_id))?;
        Reservation::new(0, new_room_id, student_id, day, start_time, end_time, 0).validate()?;

        let position = self.position_for_slot(day, start_time, end_time, new_room_id)?;
        if expect_confirmed && position > 0 {
            warn!(
                "event=modify module=booking status=conflict reservation_id={old_id} position={position}"
            );
            return Err(EngineError::ConcurrencyConflict { position });
        }

        // Validate the replacement before erasing anything, with the old
        // reservation excluded from the student's existing set.
        let mut existing = self.load_for_student(student_id)?;
        existing.retain(|r| r.id != old.id);

        if confirmed_count(&existing) >= MAX_CONFIRMED_PER_STUDENT {
            return Err(ValidationError::ConfirmedLimit { student_id }.into());
        }
        if position > 0 && waitlist_count(&existing) >= MAX_WAITLISTED_PER_STUDENT {
            return Err(ValidationError::WaitlistLimit { student_id }.into());
        }
        same_time_waitlists(&existing, student_id, day, start_time, end_time, new_room_id)?;

        self.erase(&old)?;
        let assigned = self.book(new_room_id, student_id, day, start_time, end_time)?;
        info!(
            "event=modify module=booking status=ok old_reservation_id={old_id} position={assigned}"
        );
        Ok(assigned)
    }

    /// Registers a full-field overwrite without flushing it; cascading
    /// renumbering batches several of these into one commit.
    #[allow(clippy::too_many_arguments)]
    fn set_fields_pending(
        &mut self,
        id: ReservationId,
        room_id: RoomId,
        student_id: StudentId,
        day: Weekday,
        start_time: SlotTime,
        end_time: SlotTime,
        position: u32,
    ) -> EngineResult<()> {
        if self.load(id)?.is_none() {
            return Err(ValidationError::UnknownReservation(id).into());
        }
        let updated =
            Reservation::new(id, room_id, student_id, day, start_time, end_time, position);
        updated.validate()?;
        self.cache.put(updated.clone());
        self.batch.register_modified(updated);
        Ok(())
    }

    /// Removes the target after promoting every reservation queued behind
    /// it in the same slot by one position, keeping ranks contiguous.
    fn erase(&mut self, target: &Reservation) -> EngineResult<()> {
        let rows = self.gateway.find_successors_in_slot(target)?;
        let successors = self.cache.merge(rows);
        let promoted = successors.len();
        for successor in successors {
            self.set_fields_pending(
                successor.id,
                successor.room_id,
                successor.student_id,
                successor.day,
                successor.start_time,
                successor.end_time,
                successor.position - 1,
            )?;
        }
        self.cache.remove(target.id);
        self.batch.register_deleted(target.clone());
        self.commit()?;
        info!(
            "event=erase module=booking status=ok reservation_id={} promoted={promoted}",
            target.id
        );
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        let (new, modified, deleted) = self.batch.counts();
        if let Err(err) = self.batch.commit(&self.gateway) {
            error!(
                "event=commit module=booking status=error new={new} modified={modified} deleted={deleted} error={err}"
            );
            return Err(err.into());
        }
        Ok(())
    }

    fn reset(&mut self) -> EngineResult<()> {
        self.cache.clear();
        self.batch.clear();
        self.gateway.reset()?;
        self.next_id = 1;
        info!("event=reset module=booking status=ok");
        Ok(())
    }
}

fn confirmed_count(reservations: &[Reservation]) -> usize {
    reservations.iter().filter(|r| r.is_confirmed()).count()
}

fn waitlist_count(reservations: &[Reservation]) -> usize {
    reservations.iter().filter(|r| r.is_waitlisted()).count()
}

/// Scans a student's reservations for same-time entries. A confirmed one
/// rejects the booking outright; a waitlist entry for the requested room
/// rejects it as a duplicate queue spot. Waitlist entries on *other* rooms
/// are returned; a confirmed booking at that time supersedes them.
fn same_time_waitlists(
    existing: &[Reservation],
    student_id: StudentId,
    day: Weekday,
    start_time: SlotTime,
    end_time: SlotTime,
    room_id: RoomId,
) -> Result<Vec<Reservation>, ValidationError> {
    let mut waitlists = Vec::new();
    for reservation in existing {
        if !reservation.same_time(day, start_time, end_time) {
            continue;
        }
        if reservation.is_confirmed() {
            return Err(ValidationError::DuplicateBooking {
                student_id,
                day,
                start_time,
                end_time,
            });
        }
        if reservation.room_id == room_id {
            return Err(ValidationError::DuplicateWaitlist {
                student_id,
                room_id,
            });
        }
        waitlists.push(reservation.clone());
    }
    Ok(waitlists)
}
