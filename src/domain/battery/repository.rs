//! Battery repository interface

use async_trait::async_trait;

use super::model::{Battery, BatteryStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait BatteryRepository: Send + Sync {
    /// Insert a new battery; fails with Conflict on a duplicate serial.
    /// Returns the stored battery with its assigned id.
    async fn insert(&self, battery: Battery) -> DomainResult<Battery>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Battery>>;

    async fn find_by_serial(&self, serial: &str) -> DomainResult<Option<Battery>>;

    /// All batteries parked at a station, any status.
    async fn find_at_station(&self, station_id: i64) -> DomainResult<Vec<Battery>>;

    /// Full-row update (charge, SoH, cycles, links).
    async fn update(&self, battery: Battery) -> DomainResult<()>;

    /// Conditional status transition: set `next` only if the stored
    /// status still equals `expected`. Returns false when the battery
    /// was concurrently moved to another status — the caller lost the
    /// race and must not assume anything changed.
    async fn transition_status(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
    ) -> DomainResult<bool>;

    /// Conditional transition that also re-homes the battery onto a
    /// vehicle (station link cleared) in the same write.
    async fn transition_to_vehicle(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
        vehicle_id: i64,
    ) -> DomainResult<bool>;

    /// Conditional transition that also parks the battery at a station
    /// (vehicle link cleared) in the same write.
    async fn transition_to_station(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
        station_id: i64,
    ) -> DomainResult<bool>;

    /// First battery at the station in the given status, lowest id wins.
    async fn find_first_at_station_with_status(
        &self,
        station_id: i64,
        status: BatteryStatus,
    ) -> DomainResult<Option<Battery>>;

    /// The battery currently mounted on a vehicle, if any.
    async fn find_on_vehicle(&self, vehicle_id: i64) -> DomainResult<Option<Battery>>;

    /// The two writes of a confirmed exchange as one transaction: the
    /// outgoing battery (expected PendingOut) parks at `station_id` in
    /// `old_next`, the incoming battery (expected PendingIn) mounts on
    /// `vehicle_id` as InUse. Returns false, changing nothing, if either
    /// battery left its expected status.
    async fn complete_exchange(
        &self,
        old_id: i64,
        old_next: BatteryStatus,
        station_id: i64,
        new_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<bool>;

    /// Terminal administrative delete. History rows survive.
    async fn delete(&self, id: i64) -> DomainResult<()>;
}
