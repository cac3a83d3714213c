use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock status derived from on-hand quantity and the reorder threshold.
///
/// Stored as text in the database; always recomputed on every quantity
/// or threshold change, never updated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Classifies an on-hand quantity against the reorder threshold.
    pub fn classify(on_hand_qty: i32, min_qty: i32) -> Self {
        if on_hand_qty <= 0 {
            StockStatus::OutOfStock
        } else if on_hand_qty <= min_qty {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_stock" => Some(StockStatus::InStock),
            "low_stock" => Some(StockStatus::LowStock),
            "out_of_stock" => Some(StockStatus::OutOfStock),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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
    pub unit_cost: Decimal,
    pub status: String, // stored as string, see StockStatus
    pub last_movement_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_movement::Entity")]
    InventoryMovement,
}

impl Related<super::inventory_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryMovement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_str(&self.status)
            .unwrap_or_else(|| StockStatus::classify(self.on_hand_qty, self.min_qty))
    }

    /// Derived, never stored: on-hand quantity priced at unit cost.
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.on_hand_qty) * self.unit_cost
    }
}
