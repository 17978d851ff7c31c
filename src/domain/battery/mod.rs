//! Battery aggregate
//!
//! Contains the Battery entity, its status state machine, and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{Battery, BatteryStatus};
pub use repository::BatteryRepository;
