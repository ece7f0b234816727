use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::availability::SortKey;
use super::domain::{AccountId, BookingId, Principal, PropertyId, Role, RoomTypeId, StayRange};
use super::service::{BookingError, CreateReservation, PaymentReview, ReservationService};
use crate::booking::repository::BookingStore;

/// Router exposing the booking engine's operations. The identity collaborator
/// terminates authentication upstream and forwards the principal in trusted
/// headers; this layer only parses them.
pub fn booking_router<S>(service: Arc<ReservationService<S>>) -> Router
where
    S: BookingStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/room-types/:room_type_id/availability",
            get(availability_handler::<S>),
        )
        .route(
            "/api/v1/room-types/:room_type_id/price-overrides",
            post(price_override_handler::<S>),
        )
        .route(
            "/api/v1/properties/search",
            get(search_handler::<S>),
        )
        .route(
            "/api/v1/properties/:property_id/summary",
            get(summary_handler::<S>),
        )
        .route("/api/v1/bookings", post(create_handler::<S>))
        .route("/api/v1/bookings/:booking_id", get(booking_handler::<S>))
        .route(
            "/api/v1/bookings/:booking_id/proof",
            post(proof_handler::<S>),
        )
        .route(
            "/api/v1/bookings/:booking_id/review",
            post(review_handler::<S>),
        )
        .route(
            "/api/v1/bookings/:booking_id/cancel",
            post(cancel_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct OptionalWindowQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    sort: SortKey,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ProofPayload {
    proof_ref: String,
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    decision: PaymentReview,
}

#[derive(Debug, Deserialize)]
struct PriceOverridePayload {
    start: NaiveDate,
    end: NaiveDate,
    nightly_price: Decimal,
}

async fn availability_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(room_type_id): Path<Uuid>,
    Query(window): Query<WindowQuery>,
) -> Response {
    let window = StayRange::new(window.start, window.end);
    match service.compute_availability(RoomTypeId(room_type_id), window) {
        Ok(days) => (StatusCode::OK, Json(days)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn summary_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(property_id): Path<Uuid>,
    Query(query): Query<OptionalWindowQuery>,
) -> Response {
    let window = match optional_window(query.start, query.end) {
        Ok(window) => window,
        Err(err) => return error_response(err),
    };
    match service.compute_property_summary(PropertyId(property_id), window) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn search_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let window = match optional_window(query.start, query.end) {
        Ok(window) => window,
        Err(err) => return error_response(err),
    };
    match service.search_properties(&query.q, query.sort, window) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    headers: HeaderMap,
    Json(request): Json<CreateReservation>,
) -> Response {
    let principal = match principal_from_headers(&headers) {
        Ok(principal) => principal,
        Err(err) => return error_response(err),
    };
    match service.create(principal, request) {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn booking_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let principal = match principal_from_headers(&headers) {
        Ok(principal) => principal,
        Err(err) => return error_response(err),
    };
    match service.booking(principal, BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn proof_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ProofPayload>,
) -> Response {
    let principal = match principal_from_headers(&headers) {
        Ok(principal) => principal,
        Err(err) => return error_response(err),
    };
    match service.upload_proof(principal, BookingId(booking_id), payload.proof_ref) {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn review_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let principal = match principal_from_headers(&headers) {
        Ok(principal) => principal,
        Err(err) => return error_response(err),
    };
    match service.confirm_payment(principal, BookingId(booking_id), payload.decision) {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn cancel_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let principal = match principal_from_headers(&headers) {
        Ok(principal) => principal,
        Err(err) => return error_response(err),
    };
    match service.cancel(principal, BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, Json(booking)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn price_override_handler<S: BookingStore + 'static>(
    State(service): State<Arc<ReservationService<S>>>,
    Path(room_type_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<PriceOverridePayload>,
) -> Response {
    let principal = match principal_from_headers(&headers) {
        Ok(principal) => principal,
        Err(err) => return error_response(err),
    };
    let span = StayRange::new(payload.start, payload.end);
    match service.set_price_override(
        principal,
        RoomTypeId(room_type_id),
        span,
        payload.nightly_price,
    ) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

fn optional_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Option<StayRange>, BookingError> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(StayRange::new(start, end))),
        (None, None) => Ok(None),
        _ => Err(BookingError::InvalidInput(
            "start and end must be supplied together".to_string(),
        )),
    }
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, BookingError> {
    let account = headers
        .get("x-account-id")
        .and_then(|value| value.to_str().ok())
        .ok_or(BookingError::Unauthorized("missing x-account-id header"))?;
    let account = Uuid::parse_str(account)
        .map_err(|_| BookingError::Unauthorized("malformed x-account-id header"))?;

    let role = headers
        .get("x-account-role")
        .and_then(|value| value.to_str().ok())
        .ok_or(BookingError::Unauthorized("missing x-account-role header"))?;
    let role = match role.trim().to_ascii_lowercase().as_str() {
        "customer" => Role::Customer,
        "tenant" => Role::Tenant,
        _ => return Err(BookingError::Unauthorized("unknown x-account-role value")),
    };

    Ok(Principal {
        account: AccountId(account),
        role,
    })
}

pub(crate) fn error_response(err: BookingError) -> Response {
    let status = match &err {
        BookingError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::NotFound(_) => StatusCode::NOT_FOUND,
        BookingError::Unauthorized(_) | BookingError::Unverified => StatusCode::FORBIDDEN,
        BookingError::InsufficientInventory { .. } | BookingError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        BookingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = Json(json!({ "error": err.to_string() }));
    (status, body).into_response()
}
