use std::collections::HashMap;

use roombook_core::db::open_db_in_memory;
use roombook_core::{
    shared_connection, BookingEngine, Reservation, SqliteReservationGateway, Weekday,
};

fn booking_engine() -> BookingEngine<SqliteReservationGateway> {
    let conn = shared_connection(open_db_in_memory().unwrap());
    let gateway = SqliteReservationGateway::try_new(conn).unwrap();
    BookingEngine::new(gateway).unwrap()
}

fn reservation_of(
    engine: &BookingEngine<SqliteReservationGateway>,
    student_id: i64,
) -> Reservation {
    let mut reservations = engine.reservations_for_student(student_id).unwrap();
    assert_eq!(reservations.len(), 1);
    reservations.remove(0)
}

/// Positions within every (day, start, end, room) group must be exactly
/// 0..n with no gaps or duplicates.
fn assert_contiguous_positions(reservations: &[Reservation]) {
    let mut groups: HashMap<(Weekday, u32, u32, i64), Vec<u32>> = HashMap::new();
    for r in reservations {
        groups
            .entry((r.day, r.start_time, r.end_time, r.room_id))
            .or_default()
            .push(r.position);
    }
    for (slot, mut positions) in groups {
        positions.sort_unstable();
        let expected: Vec<u32> = (0..positions.len() as u32).collect();
        assert_eq!(positions, expected, "positions not contiguous in {slot:?}");
    }
}

#[test]
fn erasing_the_holder_promotes_the_next_in_line() {
    // Scenario A: student 40 holds the slot, student 41 waits, 40 leaves.
    let engine = booking_engine();

    assert_eq!(engine.book(5, 40, Weekday::Monday, 10, 11).unwrap(), 0);
    assert_eq!(engine.book(5, 41, Weekday::Monday, 10, 11).unwrap(), 1);

    engine.erase(reservation_of(&engine, 40).id).unwrap();

    let promoted = reservation_of(&engine, 41);
    assert_eq!(promoted.position, 0);
    assert!(promoted.is_confirmed());
}

#[test]
fn erasing_a_middle_entry_shifts_everything_behind_it() {
    let engine = booking_engine();

    for (rank, student) in [(0, 40), (1, 41), (2, 42), (3, 43)] {
        assert_eq!(
            engine.book(5, student, Weekday::Monday, 10, 11).unwrap(),
            rank
        );
    }

    engine.erase(reservation_of(&engine, 41).id).unwrap();

    assert_eq!(reservation_of(&engine, 40).position, 0);
    assert_eq!(reservation_of(&engine, 42).position, 1);
    assert_eq!(reservation_of(&engine, 43).position, 2);
    assert_contiguous_positions(&engine.all_reservations().unwrap());
}

#[test]
fn erasing_the_last_entry_touches_nobody_else() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    engine.book(5, 41, Weekday::Monday, 10, 11).unwrap();
    engine.book(5, 42, Weekday::Monday, 10, 11).unwrap();

    engine.erase(reservation_of(&engine, 42).id).unwrap();

    assert_eq!(reservation_of(&engine, 40).position, 0);
    assert_eq!(reservation_of(&engine, 41).position, 1);
}

#[test]
fn position_is_the_count_of_slot_occupants() {
    // The next rank is computed as a row count for the slot; with
    // contiguous positions that equals the next free rank.
    let engine = booking_engine();

    for expected in 0..4 {
        let position = engine
            .book(5, 40 + expected, Weekday::Monday, 10, 11)
            .unwrap();
        assert_eq!(u32::try_from(expected).unwrap(), position);
    }
}

#[test]
fn queues_in_other_slots_are_unaffected_by_an_erase() {
    let engine = booking_engine();

    engine.book(5, 40, Weekday::Monday, 10, 11).unwrap();
    engine.book(5, 41, Weekday::Monday, 10, 11).unwrap();
    // Same room, later slot.
    engine.book(5, 42, Weekday::Monday, 12, 13).unwrap();
    engine.book(5, 43, Weekday::Monday, 12, 13).unwrap();

    engine.erase(reservation_of(&engine, 40).id).unwrap();

    assert_eq!(reservation_of(&engine, 42).position, 0);
    assert_eq!(reservation_of(&engine, 43).position, 1);
}

#[test]
fn positions_stay_contiguous_through_a_churn_of_bookings_and_erasures() {
    let engine = booking_engine();

    for student in 40..46 {
        engine.book(5, student, Weekday::Monday, 10, 11).unwrap();
    }
    engine.erase(reservation_of(&engine, 42).id).unwrap();
    engine.erase(reservation_of(&engine, 40).id).unwrap();
    engine.book(5, 46, Weekday::Monday, 10, 11).unwrap();
    engine.erase(reservation_of(&engine, 45).id).unwrap();

    let remaining = engine.all_reservations().unwrap();
    assert_eq!(remaining.len(), 4);
    assert_contiguous_positions(&remaining);

    // 41 moved to the front after both earlier entries left.
    assert_eq!(reservation_of(&engine, 41).position, 0);
}
