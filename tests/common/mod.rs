use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use stockledger_api::{
    db::{self, DbConfig},
    events::{self, EventSender},
    services::{
        items::{ItemService, NewItem},
        movements::MovementLedger,
        stats::StatsService,
        stock::StockMutationService,
    },
};
use tokio::sync::mpsc;

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub items: ItemService,
    pub stock: StockMutationService,
    pub movements: MovementLedger,
    pub stats: StatsService,
    pub event_sender: EventSender,
}

/// Fresh in-memory database with a single connection so transactions
/// serialize deterministically.
pub async fn setup() -> TestContext {
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
    let (tx, rx) = mpsc::channel(100);
    let event_sender = EventSender::new(tx);
    tokio::spawn(events::process_events(rx));

    TestContext {
        items: ItemService::new(db.clone(), event_sender.clone()),
        stock: StockMutationService::new(db.clone(), event_sender.clone()),
        movements: MovementLedger::new(db.clone()),
        stats: StatsService::new(db.clone()),
        event_sender,
        db,
    }
}

pub fn item_spec(sku: &str, on_hand_qty: i32, min_qty: i32, unit_cost: &str) -> NewItem {
    NewItem {
        sku: sku.to_string(),
        product_name: format!("{} product", sku),
        location: "MAIN-WH".to_string(),
        category: None,
        supplier_name: None,
        barcode: None,
        image_url: None,
        description: None,
        on_hand_qty,
        min_qty,
        reorder_qty: None,
        unit_cost: unit_cost.parse::<Decimal>().expect("decimal"),
        actor: Some("test".to_string()),
    }
}
