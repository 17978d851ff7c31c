//! SeaORM entities

pub mod battery;
pub mod battery_event;
pub mod reservation;
pub mod reservation_item;
pub mod station;
pub mod swap_transaction;
