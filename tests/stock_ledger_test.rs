mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use stockledger_api::{
    entities::{
        inventory_item::StockStatus,
        inventory_movement::{IssueReason, ReceiptReason},
    },
    errors::ServiceError,
    services::items::{ItemFilter, ItemPatch},
};
use uuid::Uuid;

#[tokio::test]
async fn dashboard_scenario_walkthrough() {
    let ctx = common::setup().await;

    // Item created with 50 on hand, reorder point 20, unit cost 10.00
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-001", 50, 20, "10.00"))
        .await
        .expect("create");
    assert_eq!(item.stock_status(), StockStatus::InStock);
    assert_eq!(item.total_value(), "500.00".parse::<Decimal>().unwrap());

    let stats = ctx.stats.compute_stats().await.expect("stats");
    assert_eq!(stats.total_items, 1);
    assert_eq!(stats.total_value, "500.00".parse::<Decimal>().unwrap());

    // Check out 35 -> 15 on hand, low stock
    let item = ctx
        .stock
        .check_out(item.id, 35, IssueReason::CustomerOrder, None, None)
        .await
        .expect("check out 35");
    assert_eq!(item.on_hand_qty, 15);
    assert_eq!(item.stock_status(), StockStatus::LowStock);

    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    assert_eq!(movements[0].change_qty, -35);

    // Check out the remaining 15 -> out of stock
    let item = ctx
        .stock
        .check_out(item.id, 15, IssueReason::CustomerOrder, None, None)
        .await
        .expect("check out 15");
    assert_eq!(item.on_hand_qty, 0);
    assert_eq!(item.stock_status(), StockStatus::OutOfStock);

    // One more unit must be rejected, balance untouched
    let err = ctx
        .stock
        .check_out(item.id, 1, IssueReason::CustomerOrder, None, None)
        .await
        .expect_err("empty item");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let item = ctx.items.get(item.id).await.expect("get");
    assert_eq!(item.on_hand_qty, 0);
    assert_eq!(item.stock_status(), StockStatus::OutOfStock);

    let stats = ctx.stats.compute_stats().await.expect("stats");
    assert_eq!(stats.out_of_stock_items, 1);
    assert_eq!(stats.total_value, Decimal::ZERO);
}

#[tokio::test]
async fn non_positive_quantities_are_rejected_without_movements() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-002", 10, 2, "1.50"))
        .await
        .expect("create");

    let err = ctx
        .stock
        .scan_in(item.id, -5, ReceiptReason::PurchaseOrderReceived, None, None)
        .await
        .expect_err("negative scan-in");
    assert_matches!(err, ServiceError::InvalidQuantity(_));

    let err = ctx
        .stock
        .check_out(item.id, 0, IssueReason::CustomerOrder, None, None)
        .await
        .expect_err("zero check-out");
    assert_matches!(err, ServiceError::InvalidQuantity(_));

    // Only the seeding movement exists
    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].change_qty, 10);
}

#[tokio::test]
async fn scan_in_then_check_out_round_trips() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-003", 8, 3, "2.00"))
        .await
        .expect("create");

    let after_in = ctx
        .stock
        .scan_in(
            item.id,
            12,
            ReceiptReason::PurchaseOrderReceived,
            Some("PO-1001".to_string()),
            Some("alex".to_string()),
        )
        .await
        .expect("scan in");
    assert_eq!(after_in.on_hand_qty, 20);

    let after_out = ctx
        .stock
        .check_out(
            item.id,
            12,
            IssueReason::CustomerOrder,
            Some("SO-2001".to_string()),
            Some("alex".to_string()),
        )
        .await
        .expect("check out");
    assert_eq!(after_out.on_hand_qty, item.on_hand_qty);

    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    assert_eq!(movements.len(), 3); // seed + in + out, newest first
    assert_eq!(movements[0].change_qty, -12);
    assert_eq!(movements[1].change_qty, 12);
    assert_eq!(movements[0].reference.as_deref(), Some("SO-2001"));
    assert_eq!(movements[1].user_name.as_deref(), Some("alex"));
}

#[tokio::test]
async fn ledger_replay_reproduces_on_hand_balance() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-004", 30, 5, "4.25"))
        .await
        .expect("create");

    ctx.stock
        .scan_in(item.id, 7, ReceiptReason::ReturnFromCustomer, None, None)
        .await
        .expect("scan in");
    ctx.stock
        .check_out(item.id, 19, IssueReason::ManufacturingUse, None, None)
        .await
        .expect("check out");
    ctx.stock
        .scan_in(item.id, 2, ReceiptReason::ManufacturingCompletion, None, None)
        .await
        .expect("scan in");

    let current = ctx.items.get(item.id).await.expect("get");
    let replayed = ctx
        .movements
        .replayed_on_hand(item.id)
        .await
        .expect("replay");
    assert_eq!(replayed, current.on_hand_qty as i64);
    assert_eq!(current.on_hand_qty, 20);

    // Movement timestamps are non-decreasing, newest first in the trail
    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    for pair in movements.windows(2) {
        assert!(pair[0].movement_date >= pair[1].movement_date);
    }
}

#[tokio::test]
async fn zero_quantity_creation_emits_no_seed_movement() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-005", 0, 5, "3.00"))
        .await
        .expect("create");

    assert_eq!(item.stock_status(), StockStatus::OutOfStock);
    assert!(item.last_movement_at.is_none());

    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    assert!(movements.is_empty());
    assert_eq!(ctx.movements.replayed_on_hand(item.id).await.unwrap(), 0);
}

#[tokio::test]
async fn reorder_quantity_defaults_to_twice_the_threshold() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-006", 5, 12, "1.00"))
        .await
        .expect("create");
    assert_eq!(item.reorder_qty, 24);

    let mut spec = common::item_spec("WIDGET-007", 5, 12, "1.00");
    spec.reorder_qty = Some(40);
    let item = ctx.items.create(spec).await.expect("create");
    assert_eq!(item.reorder_qty, 40);
}

#[tokio::test]
async fn near_max_scan_in_is_rejected_without_movements() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-016", 1, 0, "1.00"))
        .await
        .expect("create");

    let err = ctx
        .stock
        .scan_in(
            item.id,
            i32::MAX,
            ReceiptReason::PurchaseOrderReceived,
            None,
            None,
        )
        .await
        .expect_err("balance would not fit");
    assert_matches!(err, ServiceError::InvalidQuantity(_));

    let item = ctx.items.get(item.id).await.expect("get");
    assert_eq!(item.on_hand_qty, 1);
    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    assert_eq!(movements.len(), 1); // seed only

    // Filling up to the representable maximum still works
    let item = ctx
        .stock
        .scan_in(
            item.id,
            i32::MAX - 1,
            ReceiptReason::PurchaseOrderReceived,
            None,
            None,
        )
        .await
        .expect("scan in to the limit");
    assert_eq!(item.on_hand_qty, i32::MAX);
}

#[tokio::test]
async fn oversized_threshold_cannot_derive_a_reorder_default() {
    let ctx = common::setup().await;

    let spec = common::item_spec("WIDGET-017", 5, i32::MAX / 2 + 1, "1.00");
    let err = ctx
        .items
        .create(spec)
        .await
        .expect_err("doubled threshold would not fit");
    assert_matches!(err, ServiceError::ValidationError(_));

    // An explicit reorder quantity sidesteps the derivation
    let mut spec = common::item_spec("WIDGET-017", 5, i32::MAX / 2 + 1, "1.00");
    spec.reorder_qty = Some(10);
    let item = ctx.items.create(spec).await.expect("create");
    assert_eq!(item.reorder_qty, 10);
}

#[tokio::test]
async fn create_validates_required_fields_and_uniqueness() {
    let ctx = common::setup().await;

    let mut spec = common::item_spec("", 5, 2, "1.00");
    spec.sku = "".to_string();
    let err = ctx.items.create(spec).await.expect_err("empty sku");
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut spec = common::item_spec("WIDGET-008", -1, 2, "1.00");
    spec.on_hand_qty = -1;
    let err = ctx.items.create(spec).await.expect_err("negative qty");
    assert_matches!(err, ServiceError::InvalidQuantity(_));

    ctx.items
        .create(common::item_spec("WIDGET-009", 5, 2, "1.00"))
        .await
        .expect("first create");
    let err = ctx
        .items
        .create(common::item_spec("WIDGET-009", 5, 2, "1.00"))
        .await
        .expect_err("duplicate sku");
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn threshold_update_reclassifies_status() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-010", 15, 10, "1.00"))
        .await
        .expect("create");
    assert_eq!(item.stock_status(), StockStatus::InStock);

    let updated = ctx
        .items
        .update(
            item.id,
            ItemPatch {
                min_qty: Some(20),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.stock_status(), StockStatus::LowStock);
    assert_eq!(updated.on_hand_qty, 15); // update never touches quantity
}

#[tokio::test]
async fn quantity_override_routes_through_the_ledger() {
    let ctx = common::setup().await;
    let item = ctx
        .items
        .create(common::item_spec("WIDGET-011", 10, 2, "1.00"))
        .await
        .expect("create");

    let adjusted = ctx
        .stock
        .adjust_to(item.id, 25, Some("admin".to_string()))
        .await
        .expect("adjust up");
    assert_eq!(adjusted.on_hand_qty, 25);

    let adjusted = ctx
        .stock
        .adjust_to(item.id, 4, Some("admin".to_string()))
        .await
        .expect("adjust down");
    assert_eq!(adjusted.on_hand_qty, 4);

    let movements = ctx.movements.list_for_item(item.id).await.expect("trail");
    assert_eq!(movements.len(), 3); // seed, +15, -21
    assert_eq!(movements[0].change_qty, -21);
    assert_eq!(movements[0].reason, "Inventory Adjustment");
    assert_eq!(
        ctx.movements.replayed_on_hand(item.id).await.unwrap(),
        4
    );

    let err = ctx
        .stock
        .adjust_to(item.id, -1, None)
        .await
        .expect_err("negative target");
    assert_matches!(err, ServiceError::InvalidQuantity(_));
}

#[tokio::test]
async fn deactivated_items_reject_mutations_and_leave_stats() {
    let ctx = common::setup().await;
    let keep = ctx
        .items
        .create(common::item_spec("WIDGET-012", 5, 10, "2.00"))
        .await
        .expect("create");
    let gone = ctx
        .items
        .create(common::item_spec("WIDGET-013", 7, 1, "3.00"))
        .await
        .expect("create");

    ctx.items.deactivate(gone.id).await.expect("deactivate");

    let err = ctx
        .stock
        .scan_in(gone.id, 1, ReceiptReason::Other, None, None)
        .await
        .expect_err("inactive item");
    assert_matches!(err, ServiceError::NotFound(_));

    let stats = ctx.stats.compute_stats().await.expect("stats");
    assert_eq!(stats.total_items, 1);
    assert_eq!(stats.low_stock_items, 1); // keep: 5 on hand vs threshold 10
    assert_eq!(stats.total_value, "10.00".parse::<Decimal>().unwrap());

    // Still visible when inactive items are requested
    let all = ctx
        .items
        .list(ItemFilter {
            include_inactive: true,
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(all.len(), 2);
    assert_eq!(keep.on_hand_qty, 5);
}

#[tokio::test]
async fn list_filters_by_status() {
    let ctx = common::setup().await;
    ctx.items
        .create(common::item_spec("WIDGET-014", 50, 10, "1.00"))
        .await
        .expect("create");
    ctx.items
        .create(common::item_spec("WIDGET-015", 3, 10, "1.00"))
        .await
        .expect("create");

    let low = ctx
        .items
        .list(ItemFilter {
            status: Some(StockStatus::LowStock),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].sku, "WIDGET-015");
}

#[tokio::test]
async fn missing_items_return_not_found() {
    let ctx = common::setup().await;
    let nobody = Uuid::new_v4();

    assert_matches!(
        ctx.items.get(nobody).await.expect_err("get"),
        ServiceError::NotFound(_)
    );
    assert_matches!(
        ctx.stock
            .scan_in(nobody, 1, ReceiptReason::Other, None, None)
            .await
            .expect_err("scan in"),
        ServiceError::NotFound(_)
    );
    assert_matches!(
        ctx.movements
            .list_for_item(nobody)
            .await
            .expect_err("movements"),
        ServiceError::NotFound(_)
    );
}
