//! Calendar/pricing resolver: effective nightly price and remaining rooms for
//! each day of a window, computed from the base price, flexible price
//! overrides, and the bookings currently holding inventory.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::domain::StayRange;
use super::repository::{BookingRecord, PriceOverrideRecord, RoomTypeRecord};

/// Fixed horizon used for listing pages when the caller supplies no range.
pub const LISTING_HORIZON_DAYS: u32 = 30;

/// Resolved state of one calendar day for one room type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRate {
    pub day: chrono::NaiveDate,
    pub price: Decimal,
    pub available_rooms: u32,
}

/// Resolve every day of `window` for `room_type`.
///
/// Price: the override matching the day if one exists, else the base price.
/// Overrides are kept non-overlapping at write time, so at most one matches.
/// Availability: capacity minus the rooms of every booking whose half-open
/// stay contains the day and whose current status still holds inventory.
/// Past windows resolve normally; rejecting past check-ins is the
/// reservation guard's job, not the resolver's.
pub fn resolve_window(
    room_type: &RoomTypeRecord,
    overrides: &[PriceOverrideRecord],
    bookings: &[BookingRecord],
    window: StayRange,
) -> Vec<DayRate> {
    window
        .days()
        .map(|day| {
            let price = overrides
                .iter()
                .find(|entry| entry.applies_on(day))
                .map(|entry| entry.nightly_price)
                .unwrap_or(room_type.base_price);

            let booked: u32 = bookings
                .iter()
                .filter(|booking| {
                    booking.room_type_id == room_type.id
                        && booking.holds_inventory()
                        && booking.stay.contains(day)
                })
                .map(|booking| booking.quantity)
                .sum();

            let available_rooms = if booked > room_type.capacity {
                warn!(
                    room_type = %room_type.id,
                    %day,
                    booked,
                    capacity = room_type.capacity,
                    "booked rooms exceed capacity, clamping availability to zero"
                );
                0
            } else {
                room_type.capacity - booked
            };

            DayRate {
                day,
                price,
                available_rooms,
            }
        })
        .collect()
}

/// The tightest availability across a window; zero for an empty window.
pub fn min_available(days: &[DayRate]) -> u32 {
    days.iter()
        .map(|day| day.available_rooms)
        .min()
        .unwrap_or(0)
}

/// Per-room price of a stay: the sum of each night's resolved price.
pub fn quote(days: &[DayRate]) -> Decimal {
    days.iter().map(|day| day.price).sum()
}
