use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItems, StockStatus},
        inventory_movement::{self, IssueReason, ReceiptReason},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// The only legitimate writer of `on_hand_qty`.
///
/// Every mutation runs as one transaction: read the item, validate,
/// write the new quantity behind an optimistic compare on the quantity
/// that was read, and append the movement row. Losing the compare means
/// a concurrent mutation landed first; the caller gets a `Conflict` and
/// retries against fresh state rather than silently re-running.
#[derive(Clone)]
pub struct StockMutationService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl StockMutationService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Receives stock into an item (scan-in).
    #[instrument(skip(self, reference, actor))]
    pub async fn scan_in(
        &self,
        item_id: Uuid,
        quantity: i32,
        reason: ReceiptReason,
        reference: Option<String>,
        actor: Option<String>,
    ) -> Result<inventory_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "scan-in quantity must be positive, got {}",
                quantity
            )));
        }

        let updated = self
            .apply_movement(item_id, quantity, None, reason.as_str().to_string(), reference, actor)
            .await?;

        self.event_sender
            .send(Event::StockReceived {
                item_id,
                quantity,
                new_on_hand: updated.on_hand_qty,
                reason: reason.as_str().to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Issues stock out of an item (check-out). Rejects, never clamps,
    /// when the requested quantity exceeds the current on-hand balance.
    #[instrument(skip(self, reference, actor))]
    pub async fn check_out(
        &self,
        item_id: Uuid,
        quantity: i32,
        reason: IssueReason,
        reference: Option<String>,
        actor: Option<String>,
    ) -> Result<inventory_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "check-out quantity must be positive, got {}",
                quantity
            )));
        }

        let updated = self
            .apply_movement(item_id, -quantity, None, reason.as_str().to_string(), reference, actor)
            .await?;

        self.event_sender
            .send(Event::StockIssued {
                item_id,
                quantity,
                new_on_hand: updated.on_hand_qty,
                reason: reason.as_str().to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Administrative override: brings the on-hand balance to `target_qty`
    /// by issuing the delta through the regular mutation path as an
    /// Inventory Adjustment, so the ledger stays replayable.
    #[instrument(skip(self, actor))]
    pub async fn adjust_to(
        &self,
        item_id: Uuid,
        target_qty: i32,
        actor: Option<String>,
    ) -> Result<inventory_item::Model, ServiceError> {
        if target_qty < 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "target quantity must not be negative, got {}",
                target_qty
            )));
        }

        let item = InventoryItems::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .filter(|i| i.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        let delta = target_qty - item.on_hand_qty;
        if delta == 0 {
            return Ok(item);
        }

        // The quantity compare runs against the balance read above, so a
        // mutation landing between that read and the write is a Conflict
        // rather than a silently skewed override.
        let reason = ReceiptReason::InventoryAdjustment.as_str().to_string();
        let updated = self
            .apply_movement(
                item_id,
                delta,
                Some(item.on_hand_qty),
                reason.clone(),
                None,
                actor,
            )
            .await?;

        if delta > 0 {
            self.event_sender
                .send(Event::StockReceived {
                    item_id,
                    quantity: delta,
                    new_on_hand: updated.on_hand_qty,
                    reason,
                })
                .await;
        } else {
            self.event_sender
                .send(Event::StockIssued {
                    item_id,
                    quantity: -delta,
                    new_on_hand: updated.on_hand_qty,
                    reason,
                })
                .await;
        }

        Ok(updated)
    }

    /// Applies a signed quantity delta and appends the movement record,
    /// all inside one transaction. When `expected_on_hand` is given, the
    /// quantity compare runs against that balance instead of the one
    /// re-read inside the transaction.
    async fn apply_movement(
        &self,
        item_id: Uuid,
        delta: i32,
        expected_on_hand: Option<i32>,
        reason: String,
        reference: Option<String>,
        actor: Option<String>,
    ) -> Result<inventory_item::Model, ServiceError> {
        self.db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = InventoryItems::find_by_id(item_id)
                        .one(txn)
                        .await?
                        .filter(|i| i.is_active)
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Inventory item {} not found",
                                item_id
                            ))
                        })?;

                    let prior = expected_on_hand.unwrap_or(item.on_hand_qty);
                    let new_on_hand = prior.checked_add(delta).ok_or_else(|| {
                        ServiceError::InvalidQuantity(format!(
                            "applying {} to an on-hand balance of {} overflows",
                            delta, prior
                        ))
                    })?;
                    if new_on_hand < 0 {
                        return Err(ServiceError::InsufficientStock(format!(
                            "requested {}, on hand {}",
                            -delta, prior
                        )));
                    }

                    let new_status = StockStatus::classify(new_on_hand, item.min_qty);

                    // Server-assigned, non-decreasing per item.
                    let now = Utc::now();
                    let movement_date = item.last_movement_at.map_or(now, |prev| now.max(prev));

                    let result = InventoryItems::update_many()
                        .col_expr(inventory_item::Column::OnHandQty, Expr::value(new_on_hand))
                        .col_expr(
                            inventory_item::Column::Status,
                            Expr::value(new_status.as_str()),
                        )
                        .col_expr(
                            inventory_item::Column::LastMovementAt,
                            Expr::value(movement_date),
                        )
                        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(movement_date))
                        .filter(inventory_item::Column::Id.eq(item.id))
                        .filter(inventory_item::Column::OnHandQty.eq(prior))
                        .exec(txn)
                        .await?;

                    if result.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Inventory item {} was modified concurrently, retry",
                            item_id
                        )));
                    }

                    let movement = inventory_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item.id),
                        change_qty: Set(delta),
                        reason: Set(reason),
                        reference: Set(reference),
                        user_name: Set(actor),
                        movement_date: Set(movement_date),
                    };
                    movement.insert(txn).await?;

                    info!(
                        item_id = %item.id,
                        sku = %item.sku,
                        delta,
                        new_on_hand,
                        status = new_status.as_str(),
                        "applied stock movement"
                    );

                    Ok(inventory_item::Model {
                        on_hand_qty: new_on_hand,
                        status: new_status.as_str().to_string(),
                        last_movement_at: Some(movement_date),
                        updated_at: movement_date,
                        ..item
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, DbConfig};
    use crate::events;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    async fn service() -> (Arc<DbPool>, StockMutationService) {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("db connect");
        db::run_migrations(&pool).await.expect("migrations");

        let db = Arc::new(pool);
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(events::process_events(rx));
        let svc = StockMutationService::new(db.clone(), EventSender::new(tx));
        (db, svc)
    }

    async fn insert_item(db: &DbPool, on_hand_qty: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        inventory_item::ActiveModel {
            id: Set(id),
            sku: Set(format!("SKU-{}", id.simple())),
            product_name: Set("Widget".to_string()),
            location: Set("MAIN-WH".to_string()),
            category: Set(None),
            supplier_name: Set(None),
            barcode: Set(None),
            image_url: Set(None),
            description: Set(None),
            on_hand_qty: Set(on_hand_qty),
            allocated: Set(0),
            min_qty: Set(2),
            reorder_qty: Set(4),
            unit_cost: Set(dec!(1.00)),
            status: Set(StockStatus::classify(on_hand_qty, 2).as_str().to_string()),
            last_movement_at: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("insert item");
        id
    }

    #[tokio::test]
    async fn stale_balance_compare_surfaces_conflict() {
        let (db, svc) = service().await;
        let id = insert_item(db.as_ref(), 10).await;

        // The balance moves after a caller read 10
        svc.check_out(id, 3, IssueReason::CustomerOrder, None, None)
            .await
            .expect("check out");

        let err = svc
            .apply_movement(
                id,
                -1,
                Some(10),
                ReceiptReason::InventoryAdjustment.as_str().to_string(),
                None,
                None,
            )
            .await
            .expect_err("stale compare");
        assert_matches!(err, ServiceError::Conflict(_));

        // The losing write left no trace
        let item = InventoryItems::find_by_id(id)
            .one(db.as_ref())
            .await
            .expect("query")
            .expect("item");
        assert_eq!(item.on_hand_qty, 7);
        let movements = inventory_movement::Entity::find()
            .filter(inventory_movement::Column::ItemId.eq(id))
            .all(db.as_ref())
            .await
            .expect("movements");
        assert_eq!(movements.len(), 1);
    }

    #[tokio::test]
    async fn matching_balance_compare_commits() {
        let (db, svc) = service().await;
        let id = insert_item(db.as_ref(), 10).await;

        let updated = svc
            .apply_movement(
                id,
                -4,
                Some(10),
                ReceiptReason::InventoryAdjustment.as_str().to_string(),
                None,
                None,
            )
            .await
            .expect("matching compare");
        assert_eq!(updated.on_hand_qty, 6);

        let movements = inventory_movement::Entity::find()
            .filter(inventory_movement::Column::ItemId.eq(id))
            .all(db.as_ref())
            .await
            .expect("movements");
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].change_qty, -4);
    }
}
