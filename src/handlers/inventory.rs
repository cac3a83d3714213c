use crate::entities::inventory_item::{self, StockStatus};
use crate::entities::inventory_movement::{self, IssueReason, ReceiptReason};
use crate::errors::ServiceError;
use crate::services::items::{ItemFilter, ItemPatch, ItemService, NewItem};
use crate::services::movements::MovementLedger;
use crate::services::stats::{InventoryStats, StatsService};
use crate::services::stock::StockMutationService;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// State required by the inventory handlers.
pub trait StockLedgerState: Clone + Send + Sync + 'static {
    fn item_service(&self) -> &ItemService;
    fn stock_service(&self) -> &StockMutationService;
    fn movement_ledger(&self) -> &MovementLedger;
    fn stats_service(&self) -> &StatsService;
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub location: String,
    pub category: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub on_hand_qty: i32,
    pub allocated: i32,
    pub min_qty: i32,
    pub reorder_qty: i32,
    #[schema(value_type = String, example = "10.00")]
    pub unit_cost: Decimal,
    pub status: String,
    /// Derived: on_hand_qty * unit_cost
    #[schema(value_type = String, example = "500.00")]
    pub total_value: Decimal,
    pub last_movement_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_item::Model> for ItemResponse {
    fn from(item: inventory_item::Model) -> Self {
        let total_value = item.total_value();
        Self {
            id: item.id,
            sku: item.sku,
            product_name: item.product_name,
            location: item.location,
            category: item.category,
            supplier_name: item.supplier_name,
            barcode: item.barcode,
            image_url: item.image_url,
            description: item.description,
            on_hand_qty: item.on_hand_qty,
            allocated: item.allocated,
            min_qty: item.min_qty,
            reorder_qty: item.reorder_qty,
            unit_cost: item.unit_cost,
            status: item.status,
            total_value,
            last_movement_at: item.last_movement_at,
            is_active: item.is_active,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub change_qty: i32,
    pub reason: String,
    pub reference: Option<String>,
    pub user_name: Option<String>,
    pub movement_date: DateTime<Utc>,
}

impl From<inventory_movement::Model> for MovementResponse {
    fn from(m: inventory_movement::Model) -> Self {
        Self {
            id: m.id,
            item_id: m.item_id,
            change_qty: m.change_qty,
            reason: m.reason,
            reference: m.reference,
            user_name: m.user_name,
            movement_date: m.movement_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(min = 1))]
    pub product_name: String,
    #[validate(length(min = 1))]
    pub location: String,
    pub category: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub on_hand_qty: i32,
    #[validate(range(min = 0))]
    pub min_qty: i32,
    pub reorder_qty: Option<i32>,
    #[schema(value_type = String, example = "10.00")]
    pub unit_cost: Decimal,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    pub product_name: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub min_qty: Option<i32>,
    pub reorder_qty: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub unit_cost: Option<Decimal>,
    /// Administrative quantity override; routed through the stock
    /// mutation service as an Inventory Adjustment.
    pub on_hand_qty: Option<i32>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockMovementRequest {
    pub quantity: i32,
    /// One of the fixed reason categories for the direction of movement.
    #[validate(length(min = 1))]
    pub reason: String,
    pub reference: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ItemFilters {
    pub status: Option<String>,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListItemsResponse {
    pub items: Vec<ItemResponse>,
    pub total: usize,
}

/// Create the inventory router
pub fn inventory_router<S>() -> Router<S>
where
    S: StockLedgerState,
{
    Router::new()
        .route("/", get(list_items::<S>).post(create_item::<S>))
        .route("/stats", get(get_stats::<S>))
        .route(
            "/:id",
            get(get_item::<S>)
                .put(update_item::<S>)
                .delete(deactivate_item::<S>),
        )
        .route("/:id/scan-in", post(scan_in::<S>))
        .route("/:id/check-out", post(check_out::<S>))
        .route("/:id/movements", get(list_movements::<S>))
}

/// List inventory items with optional filtering
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(ItemFilters),
    responses(
        (status = 200, description = "Inventory list returned", body = ListItemsResponse),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_items<S>(
    State(state): State<S>,
    Query(filters): Query<ItemFilters>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    let status = match filters.status.as_deref() {
        Some(s) => Some(StockStatus::from_str(s).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown stock status: {}", s))
        })?),
        None => None,
    };

    let items = state
        .item_service()
        .list(ItemFilter {
            status,
            category: filters.category,
            sku_contains: filters.sku,
            include_inactive: filters.include_inactive.unwrap_or(false),
        })
        .await?;

    let items: Vec<ItemResponse> = items.into_iter().map(Into::into).collect();
    let total = items.len();
    Ok((StatusCode::OK, Json(ListItemsResponse { items, total })))
}

/// Register a new inventory item
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Inventory item created", body = ItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_item<S>(
    State(state): State<S>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let item = state
        .item_service()
        .create(NewItem {
            sku: payload.sku,
            product_name: payload.product_name,
            location: payload.location,
            category: payload.category,
            supplier_name: payload.supplier_name,
            barcode: payload.barcode,
            image_url: payload.image_url,
            description: payload.description,
            on_hand_qty: payload.on_hand_qty,
            min_qty: payload.min_qty,
            reorder_qty: payload.reorder_qty,
            unit_cost: payload.unit_cost,
            actor: payload.actor,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// Get a single inventory item
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item returned", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item<S>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    let item = state.item_service().get(id).await?;
    Ok((StatusCode::OK, Json(ItemResponse::from(item))))
}

/// Update an inventory item's descriptive, threshold, or pricing fields.
/// A request carrying `on_hand_qty` is an administrative correction and
/// goes through the guarded mutation path so the ledger stays consistent.
#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Inventory item updated", body = ItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_item<S>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let patch = ItemPatch {
        product_name: payload.product_name,
        location: payload.location,
        category: payload.category,
        supplier_name: payload.supplier_name,
        barcode: payload.barcode,
        image_url: payload.image_url,
        description: payload.description,
        min_qty: payload.min_qty,
        reorder_qty: payload.reorder_qty,
        unit_cost: payload.unit_cost,
    };

    let mut item = if patch.is_empty() {
        state.item_service().get(id).await?
    } else {
        state.item_service().update(id, patch).await?
    };

    if let Some(target) = payload.on_hand_qty {
        item = state
            .stock_service()
            .adjust_to(id, target, payload.actor)
            .await?;
    }

    Ok((StatusCode::OK, Json(ItemResponse::from(item))))
}

/// Deactivate (soft-delete) an inventory item
#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 204, description = "Inventory item deactivated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn deactivate_item<S>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    state.item_service().deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Receive stock into an item
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/scan-in",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = StockMovementRequest,
    responses(
        (status = 200, description = "Stock received", body = ItemResponse),
        (status = 400, description = "Invalid quantity or reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn scan_in<S>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockMovementRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    let reason = ReceiptReason::from_str(&payload.reason).ok_or_else(|| {
        ServiceError::ValidationError(format!("unknown scan-in reason: {}", payload.reason))
    })?;

    let item = state
        .stock_service()
        .scan_in(id, payload.quantity, reason, payload.reference, payload.actor)
        .await?;

    Ok((StatusCode::OK, Json(ItemResponse::from(item))))
}

/// Issue stock out of an item
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/check-out",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = StockMovementRequest,
    responses(
        (status = 200, description = "Stock issued", body = ItemResponse),
        (status = 400, description = "Invalid quantity or reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn check_out<S>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockMovementRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    let reason = IssueReason::from_str(&payload.reason).ok_or_else(|| {
        ServiceError::ValidationError(format!("unknown check-out reason: {}", payload.reason))
    })?;

    let item = state
        .stock_service()
        .check_out(id, payload.quantity, reason, payload.reference, payload.actor)
        .await?;

    Ok((StatusCode::OK, Json(ItemResponse::from(item))))
}

/// Audit trail for an item, most recent movement first
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/movements",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Movement history returned", body = [MovementResponse]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_movements<S>(
    State(state): State<S>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    let movements = state.movement_ledger().list_for_item(id).await?;
    let movements: Vec<MovementResponse> = movements.into_iter().map(Into::into).collect();
    Ok((StatusCode::OK, Json(movements)))
}

/// Dashboard aggregates over active items
#[utoipa::path(
    get,
    path = "/api/v1/inventory/stats",
    responses(
        (status = 200, description = "Inventory statistics returned", body = InventoryStats),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_stats<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: StockLedgerState,
{
    let stats = state.stats_service().compute_stats().await?;
    Ok((StatusCode::OK, Json(stats)))
}
