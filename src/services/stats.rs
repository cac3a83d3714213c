use crate::{
    db::DbPool,
    entities::inventory_item::{self, Entity as InventoryItems, StockStatus},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Dashboard counters over active items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryStats {
    pub total_items: u64,
    pub low_stock_items: u64,
    pub out_of_stock_items: u64,
    /// Sum of on_hand_qty * unit_cost across active items.
    #[schema(value_type = String, example = "500.00")]
    pub total_value: Decimal,
}

/// Recomputes aggregates from the item store on every read. No cached
/// counters exist, so the numbers can never drift from the items.
#[derive(Clone)]
pub struct StatsService {
    db: Arc<DbPool>,
}

impl StatsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn compute_stats(&self) -> Result<InventoryStats, ServiceError> {
        let items = InventoryItems::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await?;

        let mut stats = InventoryStats {
            total_items: 0,
            low_stock_items: 0,
            out_of_stock_items: 0,
            total_value: Decimal::ZERO,
        };
        for item in &items {
            stats.total_items += 1;
            match item.stock_status() {
                StockStatus::LowStock => stats.low_stock_items += 1,
                StockStatus::OutOfStock => stats.out_of_stock_items += 1,
                StockStatus::InStock => {}
            }
            stats.total_value += item.total_value();
        }

        Ok(stats)
    }
}
