use crate::{
    db::DbPool,
    entities::{
        inventory_item::Entity as InventoryItems,
        inventory_movement::{self, Entity as InventoryMovements},
    },
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read path over the append-only movement ledger. Appends happen only
/// inside stock mutation transactions; this service never writes.
#[derive(Clone)]
pub struct MovementLedger {
    db: Arc<DbPool>,
}

impl MovementLedger {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Audit trail for the item detail view, most recent first.
    #[instrument(skip(self))]
    pub async fn list_for_item(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<inventory_movement::Model>, ServiceError> {
        InventoryItems::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item {} not found", item_id))
            })?;

        let movements = InventoryMovements::find()
            .filter(inventory_movement::Column::ItemId.eq(item_id))
            .order_by_desc(inventory_movement::Column::MovementDate)
            .order_by_desc(inventory_movement::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(movements)
    }

    /// Replays every movement for an item. Items are seeded with an
    /// opening movement at creation, so the replayed sum must equal the
    /// item's current on-hand balance; used by consistency checks.
    #[instrument(skip(self))]
    pub async fn replayed_on_hand(&self, item_id: Uuid) -> Result<i64, ServiceError> {
        let movements = InventoryMovements::find()
            .filter(inventory_movement::Column::ItemId.eq(item_id))
            .all(self.db.as_ref())
            .await?;
        Ok(movements.iter().map(|m| m.change_qty as i64).sum())
    }
}
