//! Swap transaction aggregate
//!
//! Contains the SwapTransaction entity, the wear model, and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{
    compute_degradation, energy_cost, energy_used_kwh, Degradation, SwapStatus, SwapTransaction,
    MAINTENANCE_SOH_FLOOR, WEAR_FACTOR,
};
pub use repository::SwapRepository;
