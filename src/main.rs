use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stayhub::booking::{
    booking_router, AccountId, CreateReservation, CustomerRecord, MemoryStore, PaymentMethod,
    PaymentReview, Principal, PropertyId, PropertyRecord, ReservationService, Role, RoomTypeId,
    RoomTypeRecord, StayRange,
};
use stayhub::config::AppConfig;
use stayhub::error::AppError;
use stayhub::telemetry;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "stayhub",
    about = "Booking and inventory engine for a short-term rental marketplace",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a seeded reservation lifecycle end to end and print each step
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    /// Check-in date for the demo stay (defaults to 30 days from today)
    #[arg(long, value_parser = parse_date)]
    check_in: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo(args) => run_demo(args).map_err(AppError::from),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(
        ReservationService::new(store).with_listing_horizon(config.booking.listing_horizon_days),
    );

    let ops = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state);

    let app = booking_router(service).merge(ops).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "booking engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Seeds one property and replays the canonical manual-payment lifecycle:
/// create, racing second create, proof upload, tenant approval, cancellation,
/// and the retried second create that now fits.
fn run_demo(args: DemoArgs) -> Result<(), stayhub::booking::BookingError> {
    let check_in = args
        .check_in
        .unwrap_or_else(|| Utc::now().date_naive() + Duration::days(30));
    let stay = StayRange::window(check_in, 2);

    let store = Arc::new(MemoryStore::new());
    let tenant = AccountId::generate();
    let property_id = PropertyId::generate();
    let room_type_id = RoomTypeId::generate();
    let customer_a = AccountId::generate();
    let customer_b = AccountId::generate();

    store
        .seed_property(PropertyRecord {
            id: property_id,
            tenant_id: tenant,
            name: "Harborview Guesthouse".to_string(),
            city: "Semarang".to_string(),
            address: "12 Pelabuhan Lane".to_string(),
            category: "guesthouse".to_string(),
        })
        .map_err(|err| stayhub::booking::BookingError::Unavailable(err.to_string()))?;
    store
        .seed_room_type(RoomTypeRecord {
            id: room_type_id,
            property_id,
            name: "Deluxe Twin".to_string(),
            base_price: dec!(500000),
            capacity: 2,
            guest_capacity: 2,
        })
        .map_err(|err| stayhub::booking::BookingError::Unavailable(err.to_string()))?;
    for (id, name) in [(customer_a, "Customer A"), (customer_b, "Customer B")] {
        store
            .seed_customer(CustomerRecord {
                id,
                display_name: name.to_string(),
                verified: true,
            })
            .map_err(|err| stayhub::booking::BookingError::Unavailable(err.to_string()))?;
    }

    let service = ReservationService::new(store);
    let as_customer = |account| Principal {
        account,
        role: Role::Customer,
    };
    let as_tenant = Principal {
        account: tenant,
        role: Role::Tenant,
    };

    println!("stay window: {stay}");

    let booking = service.create(
        as_customer(customer_a),
        CreateReservation {
            room_type_id,
            check_in: stay.check_in,
            check_out: stay.check_out,
            quantity: 2,
            payment_method: PaymentMethod::Manual,
        },
    )?;
    println!(
        "A books 2 rooms -> {} (total {})",
        booking.current_status(),
        booking.total_price
    );

    let denied = service.create(
        as_customer(customer_b),
        CreateReservation {
            room_type_id,
            check_in: stay.check_in,
            check_out: stay.check_in + Duration::days(1),
            quantity: 1,
            payment_method: PaymentMethod::Manual,
        },
    );
    match denied {
        Ok(booking) => println!("B tries 1 room -> unexpectedly {}", booking.current_status()),
        Err(err) => println!("B tries 1 room -> {err}"),
    }

    let booking = service.upload_proof(
        as_customer(customer_a),
        booking.id,
        "proof/transfer-001.jpg".to_string(),
    )?;
    println!("A uploads proof -> {}", booking.current_status());

    let booking = service.confirm_payment(as_tenant, booking.id, PaymentReview::Approve)?;
    println!("tenant approves -> {}", booking.current_status());

    let booking = service.cancel(as_customer(customer_a), booking.id)?;
    println!("A cancels -> {}", booking.current_status());

    let retried = service.create(
        as_customer(customer_b),
        CreateReservation {
            room_type_id,
            check_in: stay.check_in,
            check_out: stay.check_in + Duration::days(1),
            quantity: 1,
            payment_method: PaymentMethod::Manual,
        },
    )?;
    println!("B retries -> {}", retried.current_status());

    println!("status history of A's booking:");
    for entry in &booking.history {
        println!("  {} at {}", entry.status, entry.at);
    }

    Ok(())
}
