//! The pending-write batch flush is deliberately not atomic across
//! gateway calls: earlier writes in a commit stay persisted when a later
//! call fails. These tests pin that contract with a fault-injecting
//! gateway wrapped around the real SQLite one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roombook_core::db::open_db_in_memory;
use roombook_core::{
    shared_connection, BatchPersist, BookingEngine, EngineError, Reservation, ReservationGateway,
    SharedConnection, SqliteReservationGateway, StorageError, StorageResult, Weekday,
};

/// Delegates to the SQLite gateway, failing selected write calls on demand.
struct FlakyGateway {
    inner: SqliteReservationGateway,
    fail_updates: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl BatchPersist<Reservation> for FlakyGateway {
    fn insert_rows(&self, rows: &[Reservation]) -> StorageResult<()> {
        self.inner.insert_rows(rows)
    }

    fn update_rows(&self, rows: &[Reservation]) -> StorageResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected update failure".into()));
        }
        self.inner.update_rows(rows)
    }

    fn delete_rows(&self, rows: &[Reservation]) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete_rows(rows)
    }
}

impl ReservationGateway for FlakyGateway {
    fn find(&self, id: i64) -> StorageResult<Option<Reservation>> {
        self.inner.find(id)
    }

    fn find_all(&self) -> StorageResult<Vec<Reservation>> {
        self.inner.find_all()
    }

    fn find_matching_slot(
        &self,
        day: Weekday,
        start_time: u32,
        end_time: u32,
        room_id: i64,
    ) -> StorageResult<Vec<Reservation>> {
        self.inner.find_matching_slot(day, start_time, end_time, room_id)
    }

    fn find_for_student(&self, student_id: i64) -> StorageResult<Vec<Reservation>> {
        self.inner.find_for_student(student_id)
    }

    fn find_for_day(&self, day: Weekday) -> StorageResult<Vec<Reservation>> {
        self.inner.find_for_day(day)
    }

    fn find_successors_in_slot(
        &self,
        reservation: &Reservation,
    ) -> StorageResult<Vec<Reservation>> {
        self.inner.find_successors_in_slot(reservation)
    }

    fn reset(&self) -> StorageResult<()> {
        self.inner.reset()
    }
}

struct Fixture {
    engine: BookingEngine<FlakyGateway>,
    conn: SharedConnection,
    fail_updates: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

fn fixture() -> Fixture {
    let conn = shared_connection(open_db_in_memory().unwrap());
    let fail_updates = Arc::new(AtomicBool::new(false));
    let fail_deletes = Arc::new(AtomicBool::new(false));
    let gateway = FlakyGateway {
        inner: SqliteReservationGateway::try_new(Arc::clone(&conn)).unwrap(),
        fail_updates: Arc::clone(&fail_updates),
        fail_deletes: Arc::clone(&fail_deletes),
    };
    Fixture {
        engine: BookingEngine::new(gateway).unwrap(),
        conn,
        fail_updates,
        fail_deletes,
    }
}

fn stored_positions(conn: &SharedConnection) -> Vec<(i64, i64)> {
    let conn = conn.lock();
    let mut stmt = conn
        .prepare("SELECT student_id, position FROM reservations ORDER BY student_id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

#[test]
fn delete_failure_keeps_earlier_updates_persisted() {
    let f = fixture();
    f.engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    f.engine.book(5, 41, Weekday::Monday, 10, 11).unwrap();
    f.engine.book(5, 42, Weekday::Monday, 10, 11).unwrap();
    let holder_id = f.engine.reservations_for_student(40).unwrap()[0].id;

    f.fail_deletes.store(true, Ordering::SeqCst);
    let err = f.engine.erase(holder_id).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Storage(StorageError::Unavailable(_))
    ));

    // The cascade updates were flushed before the delete failed: the
    // successors are already promoted while the erased holder still has
    // its row. The store is inconsistent and nothing rolls back.
    assert_eq!(
        stored_positions(&f.conn),
        vec![(40, 0), (41, 0), (42, 1)]
    );
}

#[test]
fn pending_writes_survive_a_failed_commit_and_flush_later() {
    let f = fixture();
    f.engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    f.engine.book(5, 41, Weekday::Monday, 10, 11).unwrap();
    let holder_id = f.engine.reservations_for_student(40).unwrap()[0].id;
    let waiter_id = f.engine.reservations_for_student(41).unwrap()[0].id;

    f.fail_deletes.store(true, Ordering::SeqCst);
    f.engine.erase(holder_id).unwrap_err();
    f.fail_deletes.store(false, Ordering::SeqCst);

    // The unflushed delete is still registered; the next committing
    // operation carries it through.
    f.engine
        .set_fields(waiter_id, 5, 41, Weekday::Monday, 10, 11, 0)
        .unwrap();

    assert_eq!(stored_positions(&f.conn), vec![(41, 0)]);
}

#[test]
fn update_failure_leaves_the_store_as_it_was() {
    let f = fixture();
    f.engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    f.engine.book(5, 41, Weekday::Monday, 10, 11).unwrap();
    let holder_id = f.engine.reservations_for_student(40).unwrap()[0].id;

    f.fail_updates.store(true, Ordering::SeqCst);
    let err = f.engine.erase(holder_id).unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));

    // The cascade update was the first failing call, so no row changed.
    assert_eq!(stored_positions(&f.conn), vec![(40, 0), (41, 1)]);
}

#[test]
fn storage_failure_during_book_surfaces_as_storage_error() {
    let f = fixture();
    // Pull the table out from under the gateway.
    f.conn
        .lock()
        .execute_batch("ALTER TABLE reservations RENAME TO reservations_gone;")
        .unwrap();

    let err = f.engine.book(5, 40, Weekday::Monday, 10, 11).unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));
}
