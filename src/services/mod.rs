// Item Store: administrative CRUD over inventory items
pub mod items;

// Stock Mutation Service: the only writer of on-hand quantity
pub mod stock;

// Movement Ledger read path and replay checks
pub mod movements;

// Dashboard aggregates
pub mod stats;
