//! Battery event log interface

use async_trait::async_trait;

use super::model::BatteryEvent;
use crate::domain::DomainResult;

#[async_trait]
pub trait BatteryEventRepository: Send + Sync {
    /// Append one entry. The log is append-only; there is no update or
    /// delete.
    async fn append(&self, event: BatteryEvent) -> DomainResult<BatteryEvent>;

    /// Full history for a battery, oldest first.
    async fn find_for_battery(&self, battery_id: i64) -> DomainResult<Vec<BatteryEvent>>;

    /// Number of Swapped entries for a battery, used by the
    /// high-swap-count maintenance rule.
    async fn count_swaps(&self, battery_id: i64) -> DomainResult<u64>;
}
