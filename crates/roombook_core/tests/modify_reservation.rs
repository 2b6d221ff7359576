use roombook_core::db::open_db_in_memory;
use roombook_core::{
    shared_connection, BookingEngine, EngineError, Reservation, SqliteReservationGateway,
    ValidationError, Weekday,
};

fn booking_engine() -> BookingEngine<SqliteReservationGateway> {
    let conn = shared_connection(open_db_in_memory().unwrap());
    let gateway = SqliteReservationGateway::try_new(conn).unwrap();
    BookingEngine::new(gateway).unwrap()
}

fn sole_reservation_of(
    engine: &BookingEngine<SqliteReservationGateway>,
    student_id: i64,
) -> Reservation {
    let mut reservations = engine.reservations_for_student(student_id).unwrap();
    assert_eq!(reservations.len(), 1);
    reservations.remove(0)
}

#[test]
fn modify_moves_a_reservation_to_a_free_slot() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    let old = sole_reservation_of(&engine, 40);

    let position = engine
        .modify(old.id, 6, 40, Weekday::Tuesday, 14, 15, true)
        .unwrap();
    assert_eq!(position, 0);

    assert!(engine.get_reservation(old.id).unwrap().is_none());
    let current = sole_reservation_of(&engine, 40);
    assert_eq!(current.room_id, 6);
    assert_eq!(current.day, Weekday::Tuesday);
    assert!(current.is_confirmed());
}

#[test]
fn modify_expecting_a_confirmed_slot_reports_a_lost_race() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    // Another student claimed the target slot first.
    engine.book(6, 50, Weekday::Tuesday, 14, 15).unwrap();

    let old = sole_reservation_of(&engine, 40);
    let err = engine
        .modify(old.id, 6, 40, Weekday::Tuesday, 14, 15, true)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ConcurrencyConflict { position: 1 }
    ));

    // The lost race leaves the old reservation in place.
    let kept = sole_reservation_of(&engine, 40);
    assert_eq!(kept.id, old.id);
    assert_eq!(kept.day, Weekday::Monday);
}

#[test]
fn modify_without_expectation_joins_the_waitlist() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    engine.book(6, 50, Weekday::Tuesday, 14, 15).unwrap();

    let old = sole_reservation_of(&engine, 40);
    let position = engine
        .modify(old.id, 6, 40, Weekday::Tuesday, 14, 15, false)
        .unwrap();
    assert_eq!(position, 1);

    let current = sole_reservation_of(&engine, 40);
    assert!(current.is_waitlisted());
    assert!(engine.get_reservation(old.id).unwrap().is_none());
}

#[test]
fn modify_excludes_the_replaced_reservation_from_the_caps() {
    let engine = booking_engine();

    engine.book(1, 40, Weekday::Monday, 10, 11).unwrap();
    engine.book(2, 40, Weekday::Tuesday, 10, 11).unwrap();
    engine.book(3, 40, Weekday::Wednesday, 10, 11).unwrap();

    // At the confirmed cap, moving one of the three must still work.
    let old = engine
        .reservations_for_student(40)
        .unwrap()
        .into_iter()
        .find(|r| r.day == Weekday::Monday)
        .unwrap();

    let position = engine
        .modify(old.id, 4, 40, Weekday::Friday, 10, 11, true)
        .unwrap();
    assert_eq!(position, 0);
    assert_eq!(engine.reservations_for_student(40).unwrap().len(), 3);
}

#[test]
fn modify_of_an_unknown_reservation_is_rejected() {
    let engine = booking_engine();

    let err = engine
        .modify(99, 5, 40, Weekday::Monday, 10, 11, false)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::UnknownReservation(99))
    ));
}

#[test]
fn rejected_modify_leaves_both_slots_untouched() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    engine.book(6, 40, Weekday::Tuesday, 14, 15).unwrap();

    let before = engine.all_reservations().unwrap();

    // Moving the Tuesday booking onto the Monday time collides with the
    // student's own confirmed reservation.
    let tuesday = engine
        .reservations_for_student(40)
        .unwrap()
        .into_iter()
        .find(|r| r.day == Weekday::Tuesday)
        .unwrap();
    let err = engine
        .modify(tuesday.id, 7, 40, Weekday::Monday, 10, 11, false)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::DuplicateBooking { .. })
    ));

    assert_eq!(engine.all_reservations().unwrap(), before);
}

#[test]
fn modify_cascades_renumbering_in_the_slot_it_leaves() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    engine.book(5, 41, Weekday::Monday, 10, 11).unwrap();
    engine.book(5, 42, Weekday::Monday, 10, 11).unwrap();

    let old = sole_reservation_of(&engine, 40);
    engine
        .modify(old.id, 6, 40, Weekday::Tuesday, 14, 15, true)
        .unwrap();

    assert_eq!(sole_reservation_of(&engine, 41).position, 0);
    assert_eq!(sole_reservation_of(&engine, 42).position, 1);
}
