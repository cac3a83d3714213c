use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason categories accepted for stock receipts (scan-in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptReason {
    PurchaseOrderReceived,
    ReturnFromCustomer,
    ManufacturingCompletion,
    InventoryAdjustment,
    TransferIn,
    Other,
}

impl ReceiptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptReason::PurchaseOrderReceived => "Purchase Order Received",
            ReceiptReason::ReturnFromCustomer => "Return from Customer",
            ReceiptReason::ManufacturingCompletion => "Manufacturing Completion",
            ReceiptReason::InventoryAdjustment => "Inventory Adjustment",
            ReceiptReason::TransferIn => "Transfer In",
            ReceiptReason::Other => "Other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Purchase Order Received" => Some(ReceiptReason::PurchaseOrderReceived),
            "Return from Customer" => Some(ReceiptReason::ReturnFromCustomer),
            "Manufacturing Completion" => Some(ReceiptReason::ManufacturingCompletion),
            "Inventory Adjustment" => Some(ReceiptReason::InventoryAdjustment),
            "Transfer In" => Some(ReceiptReason::TransferIn),
            "Other" => Some(ReceiptReason::Other),
            _ => None,
        }
    }
}

/// Reason categories accepted for stock issues (check-out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueReason {
    CustomerOrder,
    ManufacturingUse,
    DamagedDefective,
    TransferOut,
    InventoryAdjustment,
    Other,
}

impl IssueReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueReason::CustomerOrder => "Customer Order",
            IssueReason::ManufacturingUse => "Manufacturing Use",
            IssueReason::DamagedDefective => "Damaged/Defective",
            IssueReason::TransferOut => "Transfer Out",
            IssueReason::InventoryAdjustment => "Inventory Adjustment",
            IssueReason::Other => "Other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Customer Order" => Some(IssueReason::CustomerOrder),
            "Manufacturing Use" => Some(IssueReason::ManufacturingUse),
            "Damaged/Defective" => Some(IssueReason::DamagedDefective),
            "Transfer Out" => Some(IssueReason::TransferOut),
            "Inventory Adjustment" => Some(IssueReason::InventoryAdjustment),
            "Other" => Some(IssueReason::Other),
            _ => None,
        }
    }
}

/// Append-only movement record. Rows are written only inside stock
/// mutation transactions (and the item-creation seeding path); no
/// update or delete path exists anywhere in the crate.
///
/// The reason is stored as text rather than a closed enum so new
/// categories can be added without a schema migration; validation
/// against [`ReceiptReason`]/[`IssueReason`] happens at the API boundary.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub change_qty: i32, // positive = receipt, negative = issue
    pub reason: String,
    pub reference: Option<String>,
    pub user_name: Option<String>,
    pub movement_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.movement_date {
            active_model.movement_date = Set(Utc::now());
        }
        Ok(active_model)
    }
}
