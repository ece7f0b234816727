use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::availability::{self, ListingSummary, PropertySummary, RoomWindow, SortKey};
use super::calendar::{self, DayRate, LISTING_HORIZON_DAYS};
use super::domain::{
    BookingId, BookingStatus, PaymentMethod, PriceOverrideId, Principal, PropertyId, Role,
    RoomTypeId, StayRange,
};
use super::inventory::InventoryError;
use super::repository::{
    BookingDraft, BookingRecord, BookingStore, PriceOverrideRecord, ProofAction, RoomTypeRecord,
    StoreError,
};

/// One initial attempt plus one internal retry with a fresh availability
/// read; after that the shortage is surfaced to the caller.
const MAX_RESERVE_ATTEMPTS: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("customer account is not verified")]
    Unverified,
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservation {
    pub room_type_id: RoomTypeId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentReview {
    Approve,
    Reject,
}

/// The reservation state machine and the read surface built on the resolver
/// and aggregator. Owns every booking lifecycle transition; the inventory
/// side effects happen inside the store's atomic operations.
pub struct ReservationService<S> {
    store: Arc<S>,
    listing_horizon_days: u32,
}

impl<S> ReservationService<S>
where
    S: BookingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            listing_horizon_days: LISTING_HORIZON_DAYS,
        }
    }

    /// Horizon used by listing summaries when the caller supplies no range.
    pub fn with_listing_horizon(mut self, days: u32) -> Self {
        self.listing_horizon_days = days;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Per-day price and remaining rooms for an arbitrary window. Past
    /// windows are served for historical display.
    pub fn compute_availability(
        &self,
        room_type_id: RoomTypeId,
        window: StayRange,
    ) -> Result<Vec<DayRate>, BookingError> {
        if !window.is_well_formed() {
            return Err(BookingError::InvalidInput(
                "window end must be after window start".to_string(),
            ));
        }
        let room_type = self
            .store
            .room_type(room_type_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("room type"))?;
        self.resolve_days(&room_type, window)
    }

    /// Property-level summary. Without a caller range the availability flags
    /// cover the 30-day listing horizon from today and the price falls back
    /// to today's flexible price, else the base price.
    pub fn compute_property_summary(
        &self,
        property_id: PropertyId,
        window: Option<StayRange>,
    ) -> Result<PropertySummary, BookingError> {
        let property = self
            .store
            .property(property_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("property"))?;
        self.summarize_property(&property.id, window)
    }

    /// Search across all listed properties: similarity to `query` first, the
    /// caller's sort key as tiebreaker, stable for equal keys.
    pub fn search_properties(
        &self,
        query: &str,
        sort: SortKey,
        window: Option<StayRange>,
    ) -> Result<Vec<ListingSummary>, BookingError> {
        let mut listings = Vec::new();
        for property in self.store.properties().map_err(store_error)? {
            let summary = self.summarize_property(&property.id, window)?;
            listings.push(ListingSummary {
                property_id: property.id,
                similarity: availability::similarity_score(&property, query),
                name: property.name,
                city: property.city,
                address: property.address,
                category: property.category,
                summary,
            });
        }
        Ok(availability::rank(listings, sort))
    }

    /// Create a reservation. The availability check and the inventory
    /// decrement happen inside the store's atomic `reserve`; the read ahead
    /// of it only prices the stay and produces precise error detail.
    pub fn create(
        &self,
        principal: Principal,
        request: CreateReservation,
    ) -> Result<BookingRecord, BookingError> {
        if principal.role != Role::Customer {
            return Err(BookingError::Unauthorized(
                "only customers create reservations",
            ));
        }
        if request.quantity == 0 {
            return Err(BookingError::InvalidInput(
                "requested quantity must be positive".to_string(),
            ));
        }
        let stay = StayRange::new(request.check_in, request.check_out);
        if !stay.is_well_formed() {
            return Err(BookingError::InvalidInput(
                "check-out must be after check-in".to_string(),
            ));
        }
        if stay.check_in < Utc::now().date_naive() {
            return Err(BookingError::InvalidInput(
                "check-in date is in the past".to_string(),
            ));
        }

        let customer = self
            .store
            .customer(principal.account)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("customer"))?;
        if !customer.verified {
            return Err(BookingError::Unverified);
        }
        let room_type = self
            .store
            .room_type(request.room_type_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("room type"))?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let days = self.resolve_days(&room_type, stay)?;
            let available = calendar::min_available(&days);
            if available < request.quantity {
                return Err(BookingError::InsufficientInventory {
                    requested: request.quantity,
                    available,
                });
            }

            let draft = BookingDraft {
                customer_id: customer.id,
                property_id: room_type.property_id,
                room_type_id: room_type.id,
                stay,
                quantity: request.quantity,
                payment_method: request.payment_method,
                total_price: calendar::quote(&days) * Decimal::from(request.quantity),
            };

            match self.store.reserve(draft) {
                Ok(booking) => {
                    info!(
                        booking = %booking.id,
                        room_type = %room_type.id,
                        %stay,
                        quantity = booking.quantity,
                        status = %booking.current_status(),
                        "reservation created"
                    );
                    return Ok(booking);
                }
                Err(StoreError::Inventory(InventoryError::Insufficient {
                    requested,
                    available,
                    ..
                })) => {
                    // Lost the race after the pre-read. One more pass with
                    // fresh data before surfacing the shortage.
                    if attempts >= MAX_RESERVE_ATTEMPTS {
                        return Err(BookingError::InsufficientInventory {
                            requested,
                            available,
                        });
                    }
                }
                Err(StoreError::Conflict(reason)) => {
                    if attempts >= MAX_RESERVE_ATTEMPTS {
                        return Err(BookingError::Conflict(reason));
                    }
                }
                Err(other) => return Err(store_error(other)),
            }
        }
    }

    /// Customer attaches a proof-of-payment reference to a manual booking.
    pub fn upload_proof(
        &self,
        principal: Principal,
        booking_id: BookingId,
        proof_ref: String,
    ) -> Result<BookingRecord, BookingError> {
        if proof_ref.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "proof reference must not be empty".to_string(),
            ));
        }
        let booking = self.fetch(booking_id)?;
        if principal.role != Role::Customer || booking.customer_id != principal.account {
            return Err(BookingError::Unauthorized(
                "booking belongs to a different customer",
            ));
        }

        self.store
            .advance(
                booking_id,
                BookingStatus::WaitingForPayment,
                BookingStatus::WaitingForConfirmation,
                ProofAction::Set(proof_ref),
            )
            .map_err(store_error)
    }

    /// Tenant reviews the payment: approve confirms the booking, reject sends
    /// it back to waiting-for-payment and clears the proof. For gateway
    /// bookings the external confirmation signal arrives through the same
    /// approve path and no proof reference exists to require.
    pub fn confirm_payment(
        &self,
        principal: Principal,
        booking_id: BookingId,
        review: PaymentReview,
    ) -> Result<BookingRecord, BookingError> {
        let booking = self.fetch(booking_id)?;
        self.ensure_owning_tenant(principal, &booking)?;
        if booking.payment_method == PaymentMethod::Manual && booking.proof_of_payment.is_none() {
            return Err(BookingError::Conflict(
                "no proof of payment to review".to_string(),
            ));
        }

        let result = match review {
            PaymentReview::Approve => self.store.advance(
                booking_id,
                BookingStatus::WaitingForConfirmation,
                BookingStatus::Confirmed,
                ProofAction::Keep,
            ),
            PaymentReview::Reject => self.store.advance(
                booking_id,
                BookingStatus::WaitingForConfirmation,
                BookingStatus::WaitingForPayment,
                ProofAction::Clear,
            ),
        };
        let booking = result.map_err(store_error)?;
        info!(booking = %booking.id, ?review, status = %booking.current_status(), "payment reviewed");
        Ok(booking)
    }

    /// Cancel a booking from any inventory-holding state. Restores the
    /// booking's rooms exactly once; a repeated cancel is a conflict.
    pub fn cancel(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<BookingRecord, BookingError> {
        let booking = self.fetch(booking_id)?;
        self.ensure_owner_or_tenant(principal, &booking)?;

        let current = booking.current_status();
        if current == BookingStatus::Canceled {
            return Err(BookingError::Conflict(
                "booking is already canceled".to_string(),
            ));
        }

        let booking = self.store.cancel(booking_id, current).map_err(store_error)?;
        info!(booking = %booking.id, room_type = %booking.room_type_id, "reservation canceled, inventory restored");
        Ok(booking)
    }

    /// Audit view of one booking with its full status history.
    pub fn booking(
        &self,
        principal: Principal,
        booking_id: BookingId,
    ) -> Result<BookingRecord, BookingError> {
        let booking = self.fetch(booking_id)?;
        self.ensure_owner_or_tenant(principal, &booking)?;
        Ok(booking)
    }

    /// Tenant creates or replaces a flexible price for a room type. The store
    /// refuses overlapping ranges, so day-level precedence never has to be
    /// guessed at read time.
    pub fn set_price_override(
        &self,
        principal: Principal,
        room_type_id: RoomTypeId,
        span: StayRange,
        nightly_price: Decimal,
    ) -> Result<PriceOverrideRecord, BookingError> {
        if !span.is_well_formed() {
            return Err(BookingError::InvalidInput(
                "override end must be after override start".to_string(),
            ));
        }
        if nightly_price <= Decimal::ZERO {
            return Err(BookingError::InvalidInput(
                "nightly price must be positive".to_string(),
            ));
        }
        let room_type = self
            .store
            .room_type(room_type_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("room type"))?;
        let property = self
            .store
            .property(room_type.property_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("property"))?;
        if principal.role != Role::Tenant || property.tenant_id != principal.account {
            return Err(BookingError::Unauthorized(
                "room type belongs to a different tenant",
            ));
        }

        let record = PriceOverrideRecord {
            id: PriceOverrideId::generate(),
            room_type_id,
            span,
            nightly_price,
        };
        self.store
            .put_price_override(record.clone())
            .map_err(store_error)?;
        Ok(record)
    }

    fn fetch(&self, booking_id: BookingId) -> Result<BookingRecord, BookingError> {
        self.store
            .booking(booking_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("booking"))
    }

    fn resolve_days(
        &self,
        room_type: &RoomTypeRecord,
        window: StayRange,
    ) -> Result<Vec<DayRate>, BookingError> {
        let overrides = self
            .store
            .price_overrides(room_type.id)
            .map_err(store_error)?;
        let bookings = self
            .store
            .bookings_for_room_type(room_type.id)
            .map_err(store_error)?;
        Ok(calendar::resolve_window(
            room_type, &overrides, &bookings, window,
        ))
    }

    fn summarize_property(
        &self,
        property_id: &PropertyId,
        window: Option<StayRange>,
    ) -> Result<PropertySummary, BookingError> {
        let today = Utc::now().date_naive();
        let effective =
            window.unwrap_or_else(|| StayRange::window(today, self.listing_horizon_days));

        let room_types = self
            .store
            .room_types_of(*property_id)
            .map_err(store_error)?;
        let mut resolved = Vec::with_capacity(room_types.len());
        for room_type in &room_types {
            resolved.push(self.resolve_days(room_type, effective)?);
        }

        let rooms: Vec<RoomWindow<'_>> = room_types
            .iter()
            .zip(resolved.iter())
            .map(|(room_type, days)| RoomWindow {
                room_type,
                days: days.as_slice(),
            })
            .collect();
        let mut summary = availability::summarize(*property_id, &rooms);

        // No caller range: the listed price is today's override, else base.
        if window.is_none() {
            let mut price: Option<Decimal> = None;
            for room_type in &room_types {
                let overrides = self
                    .store
                    .price_overrides(room_type.id)
                    .map_err(store_error)?;
                let nightly = overrides
                    .iter()
                    .find(|entry| entry.applies_on(today))
                    .map(|entry| entry.nightly_price)
                    .unwrap_or(room_type.base_price);
                match price {
                    Some(current) if nightly >= current => {}
                    _ => price = Some(nightly),
                }
            }
            summary.price = price;
        }
        Ok(summary)
    }

    fn ensure_owning_tenant(
        &self,
        principal: Principal,
        booking: &BookingRecord,
    ) -> Result<(), BookingError> {
        let property = self
            .store
            .property(booking.property_id)
            .map_err(store_error)?
            .ok_or(BookingError::NotFound("property"))?;
        if principal.role != Role::Tenant || property.tenant_id != principal.account {
            return Err(BookingError::Unauthorized(
                "booking belongs to a different tenant",
            ));
        }
        Ok(())
    }

    fn ensure_owner_or_tenant(
        &self,
        principal: Principal,
        booking: &BookingRecord,
    ) -> Result<(), BookingError> {
        match principal.role {
            Role::Customer if booking.customer_id == principal.account => Ok(()),
            Role::Customer => Err(BookingError::Unauthorized(
                "booking belongs to a different customer",
            )),
            Role::Tenant => self.ensure_owning_tenant(principal, booking),
        }
    }
}

fn store_error(err: StoreError) -> BookingError {
    match err {
        StoreError::NotFound => BookingError::NotFound("record"),
        StoreError::StaleStatus { actual } => BookingError::Conflict(format!(
            "the action does not apply to the booking's current status ({actual})"
        )),
        StoreError::Conflict(reason) => BookingError::Conflict(reason),
        StoreError::Inventory(InventoryError::Insufficient {
            requested,
            available,
            ..
        }) => BookingError::InsufficientInventory {
            requested,
            available,
        },
        StoreError::OverlappingOverride => BookingError::Conflict(
            "flexible price range overlaps an existing entry".to_string(),
        ),
        StoreError::Unavailable(reason) => BookingError::Unavailable(reason),
    }
}
