//! Student service: cache/gateway/lock CRUD for student records.
//!
//! Same shape as the room service, with its own independent lock.
//! Authentication and credential handling live outside the core.

use log::info;
use parking_lot::RwLock;

use crate::engine::batch::WriteBatch;
use crate::engine::error::{EngineResult, ValidationError};
use crate::engine::identity::IdentityCache;
use crate::gateway::StudentGateway;
use crate::model::reservation::StudentId;
use crate::model::student::Student;

pub struct StudentService<G> {
    inner: RwLock<StudentCore<G>>,
}

struct StudentCore<G> {
    gateway: G,
    cache: IdentityCache<Student>,
    batch: WriteBatch<Student>,
}

impl<G: StudentGateway> StudentService<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            inner: RwLock::new(StudentCore {
                gateway,
                cache: IdentityCache::new(),
                batch: WriteBatch::new(),
            }),
        }
    }

    /// Returns the cached student if present, otherwise loads and caches
    /// it.
    pub fn get_student(&self, id: StudentId) -> EngineResult<Option<Student>> {
        if let Some(found) = self.inner.read().cache.get(id) {
            return Ok(Some(found.clone()));
        }
        self.inner.write().load(id)
    }

    /// Loads every student, caching any not already cached.
    pub fn all_students(&self) -> EngineResult<Vec<Student>> {
        let mut core = self.inner.write();
        let rows = core.gateway.find_all()?;
        Ok(core.cache.merge(rows))
    }

    /// Creates a student with a caller-assigned id.
    pub fn create_student(&self, id: StudentId, name: impl Into<String>) -> EngineResult<()> {
        let mut core = self.inner.write();
        let student = Student::new(id, name);
        core.cache.put(student.clone());
        core.batch.register_new(student);
        core.commit()?;
        info!("event=student_create module=students status=ok student_id={id}");
        Ok(())
    }

    /// Overwrites the descriptive fields of an existing student.
    pub fn set_student(&self, id: StudentId, name: impl Into<String>) -> EngineResult<()> {
        let mut core = self.inner.write();
        if core.load(id)?.is_none() {
            return Err(ValidationError::UnknownStudent(id).into());
        }
        let student = Student::new(id, name);
        core.cache.put(student.clone());
        core.batch.register_modified(student);
        core.commit()
    }

    /// Removes a student from cache and store.
    pub fn erase_student(&self, id: StudentId) -> EngineResult<()> {
        let mut core = self.inner.write();
        let student = core.load(id)?.ok_or(ValidationError::UnknownStudent(id))?;
        core.cache.remove(id);
        core.batch.register_deleted(student);
        core.commit()?;
        info!("event=student_erase module=students status=ok student_id={id}");
        Ok(())
    }

    /// Clears the cache and the persisted rows. Fixture/test
    /// initialization only.
    pub fn reset(&self) -> EngineResult<()> {
        let mut core = self.inner.write();
        core.cache.clear();
        core.batch.clear();
        core.gateway.reset()?;
        info!("event=reset module=students status=ok");
        Ok(())
    }
}

impl<G: StudentGateway> StudentCore<G> {
    fn load(&mut self, id: StudentId) -> EngineResult<Option<Student>> {
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
