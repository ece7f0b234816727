//! Availability aggregator: folds per-room-type resolver output into the
//! property-level summary used by listings, plus the two-level search
//! ordering (textual similarity first, caller-chosen sort key as tiebreaker).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::calendar::DayRate;
use super::domain::PropertyId;
use super::repository::{PropertyRecord, RoomTypeRecord};

/// A room type is "almost fully booked" once its booked fraction over the
/// window reaches this percentage of capacity.
pub const ALMOST_FULL_PERCENT: u64 = 85;

/// Similarity weights for the search query match.
const NAME_WEIGHT: u32 = 3;
const CITY_WEIGHT: u32 = 2;
const ADDRESS_WEIGHT: u32 = 1;
const CATEGORY_WEIGHT: u32 = 1;

pub struct RoomWindow<'a> {
    pub room_type: &'a RoomTypeRecord,
    pub days: &'a [DayRate],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySummary {
    pub property_id: PropertyId,
    pub is_available: bool,
    pub is_almost_fully_booked: bool,
    /// Minimum effective nightly price across room types; `None` only for a
    /// property with no room types.
    pub price: Option<Decimal>,
}

/// Compose resolver output for every room type of one property.
pub fn summarize(property_id: PropertyId, rooms: &[RoomWindow<'_>]) -> PropertySummary {
    let mut is_available = false;
    let mut is_almost_fully_booked = false;
    let mut price: Option<Decimal> = None;

    for room in rooms {
        if room
            .days
            .iter()
            .any(|day| day.available_rooms > 0)
        {
            is_available = true;
        }

        let capacity = u64::from(room.room_type.capacity);
        let nights = room.days.len() as u64;
        if capacity > 0 && nights > 0 {
            let booked: u64 = room
                .days
                .iter()
                .map(|day| u64::from(room.room_type.capacity - day.available_rooms.min(room.room_type.capacity)))
                .sum();
            if booked * 100 >= ALMOST_FULL_PERCENT * capacity * nights {
                is_almost_fully_booked = true;
            }
        }

        for day in room.days {
            // Strict comparison keeps the first room type found on ties.
            match price {
                Some(current) if day.price >= current => {}
                _ => price = Some(day.price),
            }
        }
    }

    PropertySummary {
        property_id,
        is_available,
        is_almost_fully_booked,
        price,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSummary {
    pub property_id: PropertyId,
    pub name: String,
    pub city: String,
    pub address: String,
    pub category: String,
    pub similarity: u32,
    pub summary: PropertySummary,
}

/// Weighted case-insensitive substring match of `query` against the listed
/// fields. An empty query scores every property zero.
pub fn similarity_score(property: &PropertyRecord, query: &str) -> u32 {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    let hit = |field: &str, weight: u32| {
        if field.to_lowercase().contains(&needle) {
            weight
        } else {
            0
        }
    };
    hit(&property.name, NAME_WEIGHT)
        + hit(&property.city, CITY_WEIGHT)
        + hit(&property.address, ADDRESS_WEIGHT)
        + hit(&property.category, CATEGORY_WEIGHT)
}

/// Order listings: similarity is always the primary key (descending), the
/// caller's sort key breaks ties. The sort is stable, so equal entries keep
/// their original relative order.
pub fn rank(mut listings: Vec<ListingSummary>, sort: SortKey) -> Vec<ListingSummary> {
    listings.sort_by(|a, b| {
        b.similarity
            .cmp(&a.similarity)
            .then_with(|| sort.compare(a, b))
    });
    listings
}

impl SortKey {
    fn compare(self, a: &ListingSummary, b: &ListingSummary) -> Ordering {
        match self {
            SortKey::PriceAsc => compare_price(a.summary.price, b.summary.price, false),
            SortKey::PriceDesc => compare_price(a.summary.price, b.summary.price, true),
            SortKey::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
        }
    }
}

/// Priced listings come before unpriced ones in either direction.
fn compare_price(a: Option<Decimal>, b: Option<Decimal>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if descending {
                b.cmp(&a)
            } else {
                a.cmp(&b)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
