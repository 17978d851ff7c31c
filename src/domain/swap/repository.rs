//! Swap transaction repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{SwapStatus, SwapTransaction};
use crate::domain::DomainResult;

#[async_trait]
pub trait SwapRepository: Send + Sync {
    async fn insert(&self, tx: SwapTransaction) -> DomainResult<SwapTransaction>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<SwapTransaction>>;

    /// Conditional PendingConfirm -> terminal transition. Returns false
    /// when the transaction was already processed by another staff
    /// member.
    async fn resolve(
        &self,
        id: i64,
        next: SwapStatus,
        staff_id: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// All swaps for a vehicle, most recent first.
    async fn list_for_vehicle(&self, vehicle_id: i64) -> DomainResult<Vec<SwapTransaction>>;
}
