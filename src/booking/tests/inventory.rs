use super::common::*;
use crate::booking::domain::{RoomTypeId, StayRange};
use crate::booking::inventory::{InventoryError, InventoryLedger};

#[test]
fn decrement_holds_every_night_of_the_stay() {
    let mut ledger = InventoryLedger::new();
    let room = RoomTypeId::generate();
    let stay = StayRange::new(d(2099, 1, 10), d(2099, 1, 13));

    ledger.decrement(room, stay, 2, 4).expect("holds fit");

    for day in stay.days() {
        assert_eq!(ledger.held(room, day), 2);
    }
    assert_eq!(ledger.held(room, d(2099, 1, 13)), 0);
}

#[test]
fn decrement_is_all_or_nothing() {
    let mut ledger = InventoryLedger::new();
    let room = RoomTypeId::generate();
    // Saturate only the middle night.
    ledger
        .decrement(room, StayRange::single_day(d(2099, 1, 11)), 2, 2)
        .expect("first hold fits");

    let err = ledger
        .decrement(room, StayRange::new(d(2099, 1, 10), d(2099, 1, 13)), 1, 2)
        .expect_err("middle night is full");
    assert!(matches!(
        err,
        InventoryError::Insufficient {
            requested: 1,
            available: 0,
            ..
        }
    ));

    // The failed attempt must not leave partial holds behind.
    assert_eq!(ledger.held(room, d(2099, 1, 10)), 0);
    assert_eq!(ledger.held(room, d(2099, 1, 12)), 0);
}

#[test]
fn disjoint_stays_do_not_contend() {
    let mut ledger = InventoryLedger::new();
    let room = RoomTypeId::generate();

    ledger
        .decrement(room, StayRange::new(d(2099, 1, 10), d(2099, 1, 12)), 2, 2)
        .expect("january fits");
    ledger
        .decrement(room, StayRange::new(d(2099, 2, 10), d(2099, 2, 12)), 2, 2)
        .expect("february fits despite january being full");
}

#[test]
fn increment_releases_and_saturates() {
    let mut ledger = InventoryLedger::new();
    let room = RoomTypeId::generate();
    let stay = StayRange::new(d(2099, 1, 10), d(2099, 1, 12));

    ledger.decrement(room, stay, 2, 2).expect("holds fit");
    ledger.increment(room, stay, 2);
    assert_eq!(ledger.held(room, d(2099, 1, 10)), 0);

    // Releasing again must not underflow or create phantom rooms.
    ledger.increment(room, stay, 2);
    assert_eq!(ledger.held(room, d(2099, 1, 10)), 0);
    ledger.decrement(room, stay, 2, 2).expect("full capacity back");
}

#[test]
fn error_names_the_first_saturated_day() {
    let mut ledger = InventoryLedger::new();
    let room = RoomTypeId::generate();
    ledger
        .decrement(room, StayRange::single_day(d(2099, 1, 11)), 1, 2)
        .expect("hold fits");

    let err = ledger
        .decrement(room, StayRange::new(d(2099, 1, 11), d(2099, 1, 13)), 2, 2)
        .expect_err("second night cannot fit two more");
    match err {
        InventoryError::Insufficient {
            day,
            requested,
            available,
        } => {
            assert_eq!(day, d(2099, 1, 11));
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
    }
}
