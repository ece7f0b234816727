use super::common::*;
use crate::booking::availability::{
    rank, similarity_score, summarize, ListingSummary, PropertySummary, RoomWindow, SortKey,
};
use crate::booking::calendar::DayRate;
use crate::booking::domain::PropertyId;
use crate::booking::repository::{PropertyRecord, RoomTypeRecord};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn room(fx: &Fixtures, capacity: u32, base: Decimal) -> RoomTypeRecord {
    RoomTypeRecord {
        id: fx.deluxe,
        property_id: fx.property,
        name: "Deluxe Twin".to_string(),
        base_price: base,
        capacity,
        guest_capacity: 2,
    }
}

fn days(available: &[u32], price: Decimal) -> Vec<DayRate> {
    let start = d(2099, 1, 10);
    available
        .iter()
        .enumerate()
        .map(|(offset, rooms)| DayRate {
            day: start + Duration::days(offset as i64),
            price,
            available_rooms: *rooms,
        })
        .collect()
}

fn listing(name: &str, city: &str, price: Decimal, similarity: u32) -> ListingSummary {
    let property_id = PropertyId::generate();
    ListingSummary {
        property_id,
        name: name.to_string(),
        city: city.to_string(),
        address: "1 Main St".to_string(),
        category: "hotel".to_string(),
        similarity,
        summary: PropertySummary {
            property_id,
            is_available: true,
            is_almost_fully_booked: false,
            price: Some(price),
        },
    }
}

#[test]
fn available_when_any_room_type_has_any_open_day() {
    let (_, fx) = seeded_store();
    let full = room(&fx, 2, dec!(500000));
    let full_days = days(&[0, 0, 0], dec!(500000));
    let open = room(&fx, 4, dec!(750000));
    let open_days = days(&[0, 1, 0], dec!(750000));

    let summary = summarize(
        fx.property,
        &[
            RoomWindow {
                room_type: &full,
                days: &full_days,
            },
            RoomWindow {
                room_type: &open,
                days: &open_days,
            },
        ],
    );
    assert!(summary.is_available);

    let summary = summarize(
        fx.property,
        &[RoomWindow {
            room_type: &full,
            days: &full_days,
        }],
    );
    assert!(!summary.is_available);
}

#[test]
fn almost_full_triggers_at_eighty_five_percent() {
    let (_, fx) = seeded_store();
    let big = room(&fx, 20, dec!(500000));

    // 17/20 booked on a one-day window is exactly 85%.
    let at_threshold = days(&[3], dec!(500000));
    let summary = summarize(
        fx.property,
        &[RoomWindow {
            room_type: &big,
            days: &at_threshold,
        }],
    );
    assert!(summary.is_almost_fully_booked);

    let below = days(&[4], dec!(500000));
    let summary = summarize(
        fx.property,
        &[RoomWindow {
            room_type: &big,
            days: &below,
        }],
    );
    assert!(!summary.is_almost_fully_booked);
}

#[test]
fn price_is_minimum_across_room_types() {
    let (_, fx) = seeded_store();
    let deluxe = room(&fx, 2, dec!(500000));
    let deluxe_days = days(&[1, 1], dec!(500000));
    let loft = room(&fx, 4, dec!(750000));
    let loft_days = days(&[1, 1], dec!(750000));

    let summary = summarize(
        fx.property,
        &[
            RoomWindow {
                room_type: &loft,
                days: &loft_days,
            },
            RoomWindow {
                room_type: &deluxe,
                days: &deluxe_days,
            },
        ],
    );
    assert_eq!(summary.price, Some(dec!(500000)));
}

#[test]
fn no_room_types_means_no_price() {
    let (_, fx) = seeded_store();
    let summary = summarize(fx.property, &[]);
    assert_eq!(summary.price, None);
    assert!(!summary.is_available);
}

#[test]
fn similarity_weights_fields_by_importance() {
    let property = PropertyRecord {
        id: PropertyId::generate(),
        tenant_id: crate::booking::domain::AccountId::generate(),
        name: "Harborview Guesthouse".to_string(),
        city: "Semarang".to_string(),
        address: "12 Harborview Lane".to_string(),
        category: "guesthouse".to_string(),
    };

    // Name + address hit.
    assert_eq!(similarity_score(&property, "harborview"), 4);
    // City only.
    assert_eq!(similarity_score(&property, "SEMARANG"), 2);
    // Name + category.
    assert_eq!(similarity_score(&property, "guesthouse"), 4);
    assert_eq!(similarity_score(&property, "nowhere"), 0);
    assert_eq!(similarity_score(&property, "   "), 0);
}

#[test]
fn similarity_outranks_the_user_sort_key() {
    let ranked = rank(
        vec![
            listing("Cheap Inn", "Jakarta", dec!(100000), 0),
            listing("Costly Match", "Jakarta", dec!(900000), 3),
        ],
        SortKey::PriceAsc,
    );
    assert_eq!(ranked[0].name, "Costly Match");
    assert_eq!(ranked[1].name, "Cheap Inn");
}

#[test]
fn user_sort_key_breaks_similarity_ties() {
    let ranked = rank(
        vec![
            listing("Bravo", "Jakarta", dec!(300000), 1),
            listing("Alpha", "Jakarta", dec!(200000), 1),
        ],
        SortKey::PriceAsc,
    );
    assert_eq!(ranked[0].name, "Alpha");

    let ranked = rank(
        vec![
            listing("Bravo", "Jakarta", dec!(300000), 1),
            listing("Alpha", "Jakarta", dec!(200000), 1),
        ],
        SortKey::NameDesc,
    );
    assert_eq!(ranked[0].name, "Bravo");
}

#[test]
fn equal_keys_keep_their_original_order() {
    let first = listing("Same", "Jakarta", dec!(300000), 1);
    let second = listing("Same", "Jakarta", dec!(300000), 1);
    let first_id = first.property_id;

    let ranked = rank(vec![first, second], SortKey::PriceAsc);
    assert_eq!(ranked[0].property_id, first_id);
}
