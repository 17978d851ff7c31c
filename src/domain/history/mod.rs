//! Battery history aggregate

pub mod model;
pub mod repository;

pub use model::{BatteryEvent, BatteryEventType};
pub use repository::BatteryEventRepository;
