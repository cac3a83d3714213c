use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItems, StockStatus},
        inventory_movement::{self, ReceiptReason},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Fields required to register a new stock-keeping unit.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub sku: String,
    pub product_name: String,
    pub location: String,
    pub category: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub on_hand_qty: i32,
    pub min_qty: i32,
    /// Defaults to `2 * min_qty` when omitted or non-positive.
    pub reorder_qty: Option<i32>,
    pub unit_cost: Decimal,
    pub actor: Option<String>,
}

/// Partial update of descriptive, threshold, and pricing fields.
/// Quantity overrides are not part of the patch; they go through
/// [`crate::services::stock::StockMutationService::adjust_to`].
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub product_name: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub supplier_name: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub min_qty: Option<i32>,
    pub reorder_qty: Option<i32>,
    pub unit_cost: Option<Decimal>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.supplier_name.is_none()
            && self.barcode.is_none()
            && self.image_url.is_none()
            && self.description.is_none()
            && self.min_qty.is_none()
            && self.reorder_qty.is_none()
            && self.unit_cost.is_none()
    }
}

/// Optional list filters.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub status: Option<StockStatus>,
    pub category: Option<String>,
    pub sku_contains: Option<String>,
    pub include_inactive: bool,
}

/// Durable record of each SKU's identity, quantities, and pricing.
#[derive(Clone)]
pub struct ItemService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ItemService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        InventoryItems::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        filter: ItemFilter,
    ) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let mut query = InventoryItems::find();
        if !filter.include_inactive {
            query = query.filter(inventory_item::Column::IsActive.eq(true));
        }
        if let Some(status) = filter.status {
            query = query.filter(inventory_item::Column::Status.eq(status.as_str()));
        }
        if let Some(category) = filter.category {
            query = query.filter(inventory_item::Column::Category.eq(category));
        }
        if let Some(fragment) = filter.sku_contains {
            query = query.filter(inventory_item::Column::Sku.contains(fragment));
        }

        let items = query
            .order_by_asc(inventory_item::Column::Sku)
            .all(self.db.as_ref())
            .await?;
        Ok(items)
    }

    /// Registers a new item. A non-zero initial quantity also seeds the
    /// movement ledger in the same transaction, so replaying an item's
    /// movements always reproduces its on-hand balance.
    #[instrument(skip(self, spec), fields(sku = %spec.sku))]
    pub async fn create(&self, spec: NewItem) -> Result<inventory_item::Model, ServiceError> {
        if spec.sku.trim().is_empty() {
            return Err(ServiceError::ValidationError("sku must not be empty".into()));
        }
        if spec.product_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "product_name must not be empty".into(),
            ));
        }
        if spec.location.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "location must not be empty".into(),
            ));
        }
        if spec.min_qty < 0 {
            return Err(ServiceError::ValidationError(
                "min_qty must not be negative".into(),
            ));
        }
        if spec.unit_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_cost must not be negative".into(),
            ));
        }
        if spec.on_hand_qty < 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "initial quantity must not be negative, got {}",
                spec.on_hand_qty
            )));
        }

        let existing = InventoryItems::find()
            .filter(inventory_item::Column::Sku.eq(spec.sku.clone()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} already exists",
                spec.sku
            )));
        }

        let reorder_qty = match spec.reorder_qty {
            Some(q) if q > 0 => q,
            _ => spec.min_qty.checked_mul(2).ok_or_else(|| {
                ServiceError::ValidationError(
                    "min_qty is too large to derive the default reorder quantity".into(),
                )
            })?,
        };
        let status = StockStatus::classify(spec.on_hand_qty, spec.min_qty);
        let now = Utc::now();
        let item_id = Uuid::new_v4();

        let model = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let seeded = spec.on_hand_qty != 0;
                    let item = inventory_item::ActiveModel {
                        id: Set(item_id),
                        sku: Set(spec.sku),
                        product_name: Set(spec.product_name),
                        location: Set(spec.location),
                        category: Set(spec.category),
                        supplier_name: Set(spec.supplier_name),
                        barcode: Set(spec.barcode),
                        image_url: Set(spec.image_url),
                        description: Set(spec.description),
                        on_hand_qty: Set(spec.on_hand_qty),
                        allocated: Set(0),
                        min_qty: Set(spec.min_qty),
                        reorder_qty: Set(reorder_qty),
                        unit_cost: Set(spec.unit_cost),
                        status: Set(status.as_str().to_string()),
                        last_movement_at: Set(seeded.then_some(now)),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };
                    let item = item.insert(txn).await?;

                    if seeded {
                        let movement = inventory_movement::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            item_id: Set(item.id),
                            change_qty: Set(spec.on_hand_qty),
                            reason: Set(ReceiptReason::InventoryAdjustment.as_str().to_string()),
                            reference: Set(None),
                            user_name: Set(spec.actor),
                            movement_date: Set(now),
                        };
                        movement.insert(txn).await?;
                    }

                    Ok(item)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(item_id = %model.id, sku = %model.sku, initial_qty = model.on_hand_qty, "created inventory item");
        self.event_sender
            .send(Event::ItemCreated {
                item_id: model.id,
                sku: model.sku.clone(),
                initial_qty: model.on_hand_qty,
            })
            .await;

        Ok(model)
    }

    /// Applies a partial field update. Status is recomputed against the
    /// new threshold; the write is guarded by the on-hand quantity read
    /// inside the transaction so a concurrent stock mutation cannot be
    /// overwritten with a stale classification.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: ItemPatch,
    ) -> Result<inventory_item::Model, ServiceError> {
        if let Some(name) = &patch.product_name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "product_name must not be empty".into(),
                ));
            }
        }
        if let Some(location) = &patch.location {
            if location.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "location must not be empty".into(),
                ));
            }
        }
        if let Some(min_qty) = patch.min_qty {
            if min_qty < 0 {
                return Err(ServiceError::ValidationError(
                    "min_qty must not be negative".into(),
                ));
            }
        }
        if let Some(unit_cost) = patch.unit_cost {
            if unit_cost < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "unit_cost must not be negative".into(),
                ));
            }
        }

        let model = self
            .db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = InventoryItems::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Inventory item {} not found", id))
                        })?;

                    let new_min = patch.min_qty.unwrap_or(item.min_qty);
                    let new_status = StockStatus::classify(item.on_hand_qty, new_min);

                    let mut update = InventoryItems::update_many()
                        .col_expr(
                            inventory_item::Column::Status,
                            Expr::value(new_status.as_str()),
                        )
                        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(inventory_item::Column::Id.eq(id))
                        .filter(inventory_item::Column::OnHandQty.eq(item.on_hand_qty));

                    if let Some(v) = patch.product_name {
                        update = update.col_expr(inventory_item::Column::ProductName, Expr::value(v));
                    }
                    if let Some(v) = patch.location {
                        update = update.col_expr(inventory_item::Column::Location, Expr::value(v));
                    }
                    if let Some(v) = patch.category {
                        update = update.col_expr(inventory_item::Column::Category, Expr::value(v));
                    }
                    if let Some(v) = patch.supplier_name {
                        update =
                            update.col_expr(inventory_item::Column::SupplierName, Expr::value(v));
                    }
                    if let Some(v) = patch.barcode {
                        update = update.col_expr(inventory_item::Column::Barcode, Expr::value(v));
                    }
                    if let Some(v) = patch.image_url {
                        update = update.col_expr(inventory_item::Column::ImageUrl, Expr::value(v));
                    }
                    if let Some(v) = patch.description {
                        update =
                            update.col_expr(inventory_item::Column::Description, Expr::value(v));
                    }
                    if let Some(v) = patch.min_qty {
                        update = update.col_expr(inventory_item::Column::MinQty, Expr::value(v));
                    }
                    if let Some(v) = patch.reorder_qty {
                        update = update.col_expr(inventory_item::Column::ReorderQty, Expr::value(v));
                    }
                    if let Some(v) = patch.unit_cost {
                        update = update.col_expr(inventory_item::Column::UnitCost, Expr::value(v));
                    }

                    let result = update.exec(txn).await?;
                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Inventory item {} was modified concurrently, retry",
                            id
                        )));
                    }

                    InventoryItems::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::InternalError(format!(
                                "Inventory item {} vanished during update",
                                id
                            ))
                        })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        self.event_sender.send(Event::ItemUpdated(id)).await;
        Ok(model)
    }

    /// Soft delete. The item and its movement history stay queryable.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<(), ServiceError> {
        let item = self.get(id).await?;

        let mut active: inventory_item::ActiveModel = item.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(self.db.as_ref()).await?;

        self.event_sender.send(Event::ItemDeactivated(id)).await;
        Ok(())
    }
}
