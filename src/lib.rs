//! Inventory Stock Ledger API
//!
//! Tracks on-hand quantity per SKU, records every quantity change as an
//! immutable movement, derives stock status from configurable thresholds,
//! and serves dashboard aggregates consistent with the item records.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use handlers::inventory::StockLedgerState;
use services::items::ItemService;
use services::movements::MovementLedger;
use services::stats::StatsService;
use services::stock::StockMutationService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub items: ItemService,
    pub stock: StockMutationService,
    pub movements: MovementLedger,
    pub stats: StatsService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        Self {
            items: ItemService::new(db.clone(), event_sender.clone()),
            stock: StockMutationService::new(db.clone(), event_sender.clone()),
            movements: MovementLedger::new(db.clone()),
            stats: StatsService::new(db.clone()),
            db,
            config,
            event_sender,
        }
    }
}

impl StockLedgerState for AppState {
    fn item_service(&self) -> &ItemService {
        &self.items
    }

    fn stock_service(&self) -> &StockMutationService {
        &self.stock
    }

    fn movement_ledger(&self) -> &MovementLedger {
        &self.movements
    }

    fn stats_service(&self) -> &StatsService {
        &self.stats
    }
}

/// OpenAPI documentation for the ledger surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::inventory::list_items,
        handlers::inventory::create_item,
        handlers::inventory::get_item,
        handlers::inventory::update_item,
        handlers::inventory::deactivate_item,
        handlers::inventory::scan_in,
        handlers::inventory::check_out,
        handlers::inventory::list_movements,
        handlers::inventory::get_stats,
    ),
    components(schemas(
        handlers::inventory::ItemResponse,
        handlers::inventory::MovementResponse,
        handlers::inventory::CreateItemRequest,
        handlers::inventory::UpdateItemRequest,
        handlers::inventory::StockMovementRequest,
        handlers::inventory::ListItemsResponse,
        services::stats::InventoryStats,
        errors::ErrorResponse,
    )),
    tags((name = "inventory", description = "Inventory stock ledger"))
)]
pub struct ApiDoc;

/// Builds the application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/v1/inventory",
            handlers::inventory::inventory_router::<AppState>(),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe with a database ping.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "up" })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "down" })),
        ),
    }
}
