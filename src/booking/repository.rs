use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{
    AccountId, BookingId, BookingStatus, PaymentMethod, PriceOverrideId, PropertyId, RoomTypeId,
    StatusEntry, StayRange,
};
use super::inventory::{InventoryError, InventoryLedger};

/// A listed property. City, address, and category feed search ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: PropertyId,
    pub tenant_id: AccountId,
    pub name: String,
    pub city: String,
    pub address: String,
    pub category: String,
}

/// A bookable unit within a property. `capacity` is the ceiling on
/// concurrently active bookings for any single night; it is edited by the
/// tenant, never by booking traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTypeRecord {
    pub id: RoomTypeId,
    pub property_id: PropertyId,
    pub name: String,
    pub base_price: Decimal,
    pub capacity: u32,
    pub guest_capacity: u32,
}

/// Date-scoped nightly price override (the "flexible price"). Ranges for one
/// room type must not overlap, which the store enforces at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOverrideRecord {
    pub id: PriceOverrideId,
    pub room_type_id: RoomTypeId,
    pub span: StayRange,
    pub nightly_price: Decimal,
}

impl PriceOverrideRecord {
    pub fn applies_on(&self, day: NaiveDate) -> bool {
        self.span.contains(day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: AccountId,
    pub display_name: String,
    pub verified: bool,
}

/// The reservation aggregate. Never deleted: cancellation appends a status
/// entry, preserving the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: BookingId,
    pub customer_id: AccountId,
    pub property_id: PropertyId,
    pub room_type_id: RoomTypeId,
    pub stay: StayRange,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
    pub total_price: Decimal,
    pub proof_of_payment: Option<String>,
    pub history: Vec<StatusEntry>,
}

impl BookingRecord {
    /// Current status is a pure function of the append-only history.
    pub fn current_status(&self) -> BookingStatus {
        self.history
            .last()
            .map(|entry| entry.status)
            .unwrap_or(BookingStatus::Canceled)
    }

    pub fn holds_inventory(&self) -> bool {
        self.current_status().holds_inventory()
    }
}

/// Everything the store needs to open a booking. The id, timestamps, and
/// initial history entry are minted inside the atomic reserve region.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub customer_id: AccountId,
    pub property_id: PropertyId,
    pub room_type_id: RoomTypeId,
    pub stay: StayRange,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
    pub total_price: Decimal,
}

/// Proof-of-payment side effect carried by a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofAction {
    Keep,
    Set(String),
    Clear,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("booking status changed concurrently, it is now {actual}")]
    StaleStatus { actual: BookingStatus },
    #[error("another writer invalidated this operation: {0}")]
    Conflict(String),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("flexible price range overlaps an existing entry for this room type")]
    OverlappingOverride,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage seam for the booking engine. Implementations must make `reserve`
/// (availability check + booking insert + inventory decrement) and `cancel`
/// (status append + inventory restore) atomic, and must apply `advance` as a
/// compare-and-swap on the booking's latest status.
pub trait BookingStore: Send + Sync {
    fn property(&self, id: PropertyId) -> Result<Option<PropertyRecord>, StoreError>;
    fn properties(&self) -> Result<Vec<PropertyRecord>, StoreError>;
    fn room_type(&self, id: RoomTypeId) -> Result<Option<RoomTypeRecord>, StoreError>;
    fn room_types_of(&self, property: PropertyId) -> Result<Vec<RoomTypeRecord>, StoreError>;
    fn customer(&self, id: AccountId) -> Result<Option<CustomerRecord>, StoreError>;

    fn price_overrides(&self, room_type: RoomTypeId)
        -> Result<Vec<PriceOverrideRecord>, StoreError>;
    /// Rejects ranges that intersect an existing override for the room type,
    /// so at most one entry ever matches a given day.
    fn put_price_override(&self, record: PriceOverrideRecord) -> Result<(), StoreError>;

    fn booking(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError>;
    fn bookings_for_room_type(&self, room_type: RoomTypeId)
        -> Result<Vec<BookingRecord>, StoreError>;

    /// Atomic unit: verify per-night availability, insert the booking, and
    /// decrement inventory. Two racing reserves can never both pass the check
    /// against the same stale count.
    fn reserve(&self, draft: BookingDraft) -> Result<BookingRecord, StoreError>;

    /// Append `next` to the history iff the latest status equals `expected`,
    /// applying the proof side effect in the same step.
    fn advance(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        proof: ProofAction,
    ) -> Result<BookingRecord, StoreError>;

    /// Append `Canceled` iff the latest status equals `expected`, restoring
    /// the booking's rooms in the same atomic step. A repeated cancel fails
    /// the status check and therefore never restores twice.
    fn cancel(&self, id: BookingId, expected: BookingStatus) -> Result<BookingRecord, StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    properties: HashMap<PropertyId, PropertyRecord>,
    room_types: HashMap<RoomTypeId, RoomTypeRecord>,
    customers: HashMap<AccountId, CustomerRecord>,
    overrides: HashMap<RoomTypeId, Vec<PriceOverrideRecord>>,
    bookings: HashMap<BookingId, BookingRecord>,
    ledger: InventoryLedger,
}

/// In-memory store. One mutex over the whole state is the transactional
/// boundary: every compound operation runs under a single lock acquisition.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn seed_property(&self, record: PropertyRecord) -> Result<(), StoreError> {
        self.lock()?.properties.insert(record.id, record);
        Ok(())
    }

    pub fn seed_room_type(&self, record: RoomTypeRecord) -> Result<(), StoreError> {
        self.lock()?.room_types.insert(record.id, record);
        Ok(())
    }

    pub fn seed_customer(&self, record: CustomerRecord) -> Result<(), StoreError> {
        self.lock()?.customers.insert(record.id, record);
        Ok(())
    }

    /// Rooms held on `day`, for ledger/booking agreement checks.
    pub fn held(&self, room_type: RoomTypeId, day: NaiveDate) -> Result<u32, StoreError> {
        Ok(self.lock()?.ledger.held(room_type, day))
    }
}

impl BookingStore for MemoryStore {
    fn property(&self, id: PropertyId) -> Result<Option<PropertyRecord>, StoreError> {
        Ok(self.lock()?.properties.get(&id).cloned())
    }

    fn properties(&self) -> Result<Vec<PropertyRecord>, StoreError> {
        let mut all: Vec<_> = self.lock()?.properties.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn room_type(&self, id: RoomTypeId) -> Result<Option<RoomTypeRecord>, StoreError> {
        Ok(self.lock()?.room_types.get(&id).cloned())
    }

    fn room_types_of(&self, property: PropertyId) -> Result<Vec<RoomTypeRecord>, StoreError> {
        let mut rooms: Vec<_> = self
            .lock()?
            .room_types
            .values()
            .filter(|room| room.property_id == property)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rooms)
    }

    fn customer(&self, id: AccountId) -> Result<Option<CustomerRecord>, StoreError> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    fn price_overrides(
        &self,
        room_type: RoomTypeId,
    ) -> Result<Vec<PriceOverrideRecord>, StoreError> {
        Ok(self
            .lock()?
            .overrides
            .get(&room_type)
            .cloned()
            .unwrap_or_default())
    }

    fn put_price_override(&self, record: PriceOverrideRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.room_types.contains_key(&record.room_type_id) {
            return Err(StoreError::NotFound);
        }
        let entries = state.overrides.entry(record.room_type_id).or_default();
        if entries
            .iter()
            .any(|existing| existing.id != record.id && existing.span.overlaps(&record.span))
        {
            return Err(StoreError::OverlappingOverride);
        }
        entries.retain(|existing| existing.id != record.id);
        entries.push(record);
        Ok(())
    }

    fn booking(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    fn bookings_for_room_type(
        &self,
        room_type: RoomTypeId,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .filter(|booking| booking.room_type_id == room_type)
            .cloned()
            .collect())
    }

    fn reserve(&self, draft: BookingDraft) -> Result<BookingRecord, StoreError> {
        let mut state = self.lock()?;
        let capacity = state
            .room_types
            .get(&draft.room_type_id)
            .ok_or(StoreError::NotFound)?
            .capacity;

        state
            .ledger
            .decrement(draft.room_type_id, draft.stay, draft.quantity, capacity)?;

        let record = BookingRecord {
            id: BookingId::generate(),
            customer_id: draft.customer_id,
            property_id: draft.property_id,
            room_type_id: draft.room_type_id,
            stay: draft.stay,
            quantity: draft.quantity,
            payment_method: draft.payment_method,
            total_price: draft.total_price,
            proof_of_payment: None,
            history: vec![StatusEntry::now(BookingStatus::initial(
                draft.payment_method,
            ))],
        };
        state.bookings.insert(record.id, record.clone());
        Ok(record)
    }

    fn advance(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        proof: ProofAction,
    ) -> Result<BookingRecord, StoreError> {
        let mut state = self.lock()?;
        let booking = state.bookings.get_mut(&id).ok_or(StoreError::NotFound)?;
        let actual = booking.current_status();
        if actual != expected {
            return Err(StoreError::StaleStatus { actual });
        }
        match proof {
            ProofAction::Keep => {}
            ProofAction::Set(reference) => booking.proof_of_payment = Some(reference),
            ProofAction::Clear => booking.proof_of_payment = None,
        }
        booking.history.push(StatusEntry::now(next));
        Ok(booking.clone())
    }

    fn cancel(&self, id: BookingId, expected: BookingStatus) -> Result<BookingRecord, StoreError> {
        let mut state = self.lock()?;
        let booking = state.bookings.get(&id).ok_or(StoreError::NotFound)?;
        let actual = booking.current_status();
        if actual != expected {
            return Err(StoreError::StaleStatus { actual });
        }
        if !actual.holds_inventory() {
            return Err(StoreError::StaleStatus { actual });
        }
        let (room_type, stay, quantity) = (booking.room_type_id, booking.stay, booking.quantity);
        state.ledger.increment(room_type, stay, quantity);
        let booking = state.bookings.get_mut(&id).ok_or(StoreError::NotFound)?;
        booking.history.push(StatusEntry::now(BookingStatus::Canceled));
        Ok(booking.clone())
    }
}
