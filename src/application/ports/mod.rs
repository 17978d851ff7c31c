//! Ports to collaborators outside this core.

pub mod outbound;

pub use outbound::{SubscriptionDirectory, SubscriptionGrant, VehicleDirectory};
