use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;

use crate::booking::domain::{
    AccountId, BookingStatus, PaymentMethod, Principal, PropertyId, Role, RoomTypeId, StatusEntry,
    StayRange,
};
use crate::booking::repository::{
    BookingRecord, CustomerRecord, MemoryStore, PropertyRecord, RoomTypeRecord,
};
use crate::booking::service::{CreateReservation, ReservationService};

pub(super) struct Fixtures {
    pub tenant: AccountId,
    pub other_tenant: AccountId,
    pub property: PropertyId,
    /// Capacity 2, base price 500,000.
    pub deluxe: RoomTypeId,
    /// Capacity 4, base price 750,000.
    pub loft: RoomTypeId,
    pub customer_a: AccountId,
    pub customer_b: AccountId,
    pub unverified: AccountId,
}

pub(super) fn seeded_store() -> (Arc<MemoryStore>, Fixtures) {
    let store = Arc::new(MemoryStore::new());
    let fx = Fixtures {
        tenant: AccountId::generate(),
        other_tenant: AccountId::generate(),
        property: PropertyId::generate(),
        deluxe: RoomTypeId::generate(),
        loft: RoomTypeId::generate(),
        customer_a: AccountId::generate(),
        customer_b: AccountId::generate(),
        unverified: AccountId::generate(),
    };

    store
        .seed_property(PropertyRecord {
            id: fx.property,
            tenant_id: fx.tenant,
            name: "Harborview Guesthouse".to_string(),
            city: "Semarang".to_string(),
            address: "12 Pelabuhan Lane".to_string(),
            category: "guesthouse".to_string(),
        })
        .expect("seed property");
    store
        .seed_room_type(RoomTypeRecord {
            id: fx.deluxe,
            property_id: fx.property,
            name: "Deluxe Twin".to_string(),
            base_price: dec!(500000),
            capacity: 2,
            guest_capacity: 2,
        })
        .expect("seed room type");
    store
        .seed_room_type(RoomTypeRecord {
            id: fx.loft,
            property_id: fx.property,
            name: "Family Loft".to_string(),
            base_price: dec!(750000),
            capacity: 4,
            guest_capacity: 6,
        })
        .expect("seed room type");

    for (id, name, verified) in [
        (fx.customer_a, "Customer A", true),
        (fx.customer_b, "Customer B", true),
        (fx.unverified, "Unverified", false),
    ] {
        store
            .seed_customer(CustomerRecord {
                id,
                display_name: name.to_string(),
                verified,
            })
            .expect("seed customer");
    }

    (store, fx)
}

pub(super) fn build_service() -> (ReservationService<MemoryStore>, Arc<MemoryStore>, Fixtures) {
    let (store, fx) = seeded_store();
    (ReservationService::new(store.clone()), store, fx)
}

pub(super) fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// A stay far enough out that the past-check-in guard never interferes.
pub(super) fn future_stay(nights: u32) -> StayRange {
    StayRange::window(Utc::now().date_naive() + Duration::days(60), nights)
}

pub(super) fn customer(account: AccountId) -> Principal {
    Principal {
        account,
        role: Role::Customer,
    }
}

pub(super) fn tenant(account: AccountId) -> Principal {
    Principal {
        account,
        role: Role::Tenant,
    }
}

pub(super) fn reservation(
    room_type_id: RoomTypeId,
    stay: StayRange,
    quantity: u32,
    payment_method: PaymentMethod,
) -> CreateReservation {
    CreateReservation {
        room_type_id,
        check_in: stay.check_in,
        check_out: stay.check_out,
        quantity,
        payment_method,
    }
}

/// A standalone booking record for resolver-level tests.
pub(super) fn booking_fixture(
    fx: &Fixtures,
    room_type: RoomTypeId,
    stay: StayRange,
    quantity: u32,
    status: BookingStatus,
) -> BookingRecord {
    BookingRecord {
        id: crate::booking::domain::BookingId::generate(),
        customer_id: fx.customer_a,
        property_id: fx.property,
        room_type_id: room_type,
        stay,
        quantity,
        payment_method: PaymentMethod::Manual,
        total_price: dec!(0),
        proof_of_payment: None,
        history: vec![StatusEntry::now(status)],
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
