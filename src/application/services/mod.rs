//! Application services

pub mod battery_registry;
pub mod battery_transfer;
pub mod reputation;
pub mod reservation_engine;
pub mod reservation_expiry;
pub mod swap_workflow;

pub use battery_registry::BatteryRegistry;
pub use battery_transfer::BatteryTransfer;
pub use reputation::{ReputationBreakdown, ReputationTracker, MONTHLY_SCORE_MAX};
pub use reservation_engine::{
    ReservationEngine, ReservationPolicy, ReservationView, AUTO_EXPIRE_REASON,
    DEFAULT_CANCEL_REASON,
};
pub use reservation_expiry::start_reservation_expiry_task;
pub use swap_workflow::{SwapPolicy, SwapWorkflow};
