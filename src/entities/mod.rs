pub mod inventory_item;
pub mod inventory_movement;
