//! Application layer: business services and collaborator ports.

pub mod ports;
pub mod services;

pub use ports::{SubscriptionDirectory, SubscriptionGrant, VehicleDirectory};
pub use services::{
    start_reservation_expiry_task, BatteryRegistry, BatteryTransfer, ReputationTracker,
    ReservationEngine, ReservationPolicy, ReservationView, SwapPolicy, SwapWorkflow,
};
