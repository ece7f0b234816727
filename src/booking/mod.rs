//! Booking & inventory engine: per-day availability and pricing for room
//! types, property-level listing summaries, and the reservation lifecycle
//! with its inventory side effects.
//!
//! Dependency order, leaves first: the calendar resolver prices and counts a
//! single room type; the availability aggregator composes resolver output for
//! a property; the reservation service drives the status state machine and,
//! through the store's atomic operations, the inventory ledger.

pub mod availability;
pub mod calendar;
pub mod domain;
pub mod inventory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use availability::{ListingSummary, PropertySummary, SortKey, ALMOST_FULL_PERCENT};
pub use calendar::{DayRate, LISTING_HORIZON_DAYS};
pub use domain::{
    AccountId, BookingId, BookingStatus, PaymentMethod, PriceOverrideId, Principal, PropertyId,
    Role, RoomTypeId, StatusEntry, StayRange,
};
pub use inventory::{InventoryError, InventoryLedger};
pub use repository::{
    BookingDraft, BookingRecord, BookingStore, CustomerRecord, MemoryStore, PriceOverrideRecord,
    PropertyRecord, RoomTypeRecord, StoreError,
};
pub use router::booking_router;
pub use service::{
    BookingError, CreateReservation, PaymentReview, ReservationService,
};
