//! Outbound ports — interfaces to collaborators this core consumes but
//! does not own.
//!
//! Subscription plans and user/vehicle records live in other services;
//! the reservation engine only needs the two narrow questions below.
//! Production implementations live outside this crate; test and
//! development doubles live in
//! [`memory`](crate::infrastructure::storage::memory).

use async_trait::async_trait;

use crate::domain::DomainResult;

/// The slice of an active subscription that reservation creation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionGrant {
    pub subscription_id: i64,
    /// How many batteries the plan allows per reservation.
    pub battery_limit: u32,
}

/// Subscription lookups for quota validation.
#[async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    /// The Active subscription for (user, vehicle), or None.
    async fn active_subscription(
        &self,
        user_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<Option<SubscriptionGrant>>;
}

/// Vehicle ownership checks.
#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    async fn vehicle_belongs_to_user(&self, user_id: i64, vehicle_id: i64) -> DomainResult<bool>;
}
