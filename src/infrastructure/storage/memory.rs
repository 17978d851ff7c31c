//! In-memory repository implementations for development and testing

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::application::ports::{SubscriptionDirectory, SubscriptionGrant, VehicleDirectory};
use crate::domain::battery::{Battery, BatteryRepository, BatteryStatus};
use crate::domain::history::{BatteryEvent, BatteryEventRepository, BatteryEventType};
use crate::domain::reservation::{
    Reservation, ReservationItem, ReservationRepository, ReservationStatus,
};
use crate::domain::station::{Station, StationRepository};
use crate::domain::swap::{SwapRepository, SwapStatus, SwapTransaction};
use crate::domain::RepositoryProvider;
use crate::shared::errors::DomainError;
use crate::domain::DomainResult;

/// In-memory repository provider backed by DashMaps.
///
/// Conditional transitions lock the entry they mutate, so the
/// compare-and-set semantics match the SQL `UPDATE .. WHERE status = ?`
/// implementations under concurrent callers.
pub struct InMemoryRepositoryProvider {
    batteries: DashMap<i64, Battery>,
    reservations: DashMap<i64, Reservation>,
    reservation_items: DashMap<i64, ReservationItem>,
    stations: DashMap<i64, Station>,
    swaps: DashMap<i64, SwapTransaction>,
    battery_events: DashMap<i64, BatteryEvent>,
    battery_counter: AtomicI64,
    reservation_counter: AtomicI64,
    item_counter: AtomicI64,
    station_counter: AtomicI64,
    swap_counter: AtomicI64,
    event_counter: AtomicI64,
    // Serializes the two-battery exchange write against itself.
    exchange_lock: Mutex<()>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            batteries: DashMap::new(),
            reservations: DashMap::new(),
            reservation_items: DashMap::new(),
            stations: DashMap::new(),
            swaps: DashMap::new(),
            battery_events: DashMap::new(),
            battery_counter: AtomicI64::new(1),
            reservation_counter: AtomicI64::new(1),
            item_counter: AtomicI64::new(1),
            station_counter: AtomicI64::new(1),
            swap_counter: AtomicI64::new(1),
            event_counter: AtomicI64::new(1),
            exchange_lock: Mutex::new(()),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn batteries(&self) -> &dyn BatteryRepository {
        self
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        self
    }

    fn stations(&self) -> &dyn StationRepository {
        self
    }

    fn swaps(&self) -> &dyn SwapRepository {
        self
    }

    fn battery_events(&self) -> &dyn BatteryEventRepository {
        self
    }
}

// ── BatteryRepository ───────────────────────────────────────────

#[async_trait]
impl BatteryRepository for InMemoryRepositoryProvider {
    async fn insert(&self, mut battery: Battery) -> DomainResult<Battery> {
        if self
            .batteries
            .iter()
            .any(|b| b.serial_number == battery.serial_number)
        {
            return Err(DomainError::Conflict(format!(
                "battery serial {} already exists",
                battery.serial_number
            )));
        }
        battery.id = self.battery_counter.fetch_add(1, Ordering::SeqCst);
        self.batteries.insert(battery.id, battery.clone());
        Ok(battery)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Battery>> {
        Ok(self.batteries.get(&id).map(|b| b.clone()))
    }

    async fn find_by_serial(&self, serial: &str) -> DomainResult<Option<Battery>> {
        Ok(self
            .batteries
            .iter()
            .find(|b| b.serial_number == serial)
            .map(|b| b.clone()))
    }

    async fn find_at_station(&self, station_id: i64) -> DomainResult<Vec<Battery>> {
        let mut out: Vec<Battery> = self
            .batteries
            .iter()
            .filter(|b| b.station_id == Some(station_id))
            .map(|b| b.clone())
            .collect();
        out.sort_by_key(|b| b.id);
        Ok(out)
    }

    async fn update(&self, battery: Battery) -> DomainResult<()> {
        if !self.batteries.contains_key(&battery.id) {
            return Err(DomainError::not_found("battery", "id", battery.id));
        }
        self.batteries.insert(battery.id, battery);
        Ok(())
    }

    async fn transition_status(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
    ) -> DomainResult<bool> {
        match self.batteries.get_mut(&id) {
            Some(mut b) if b.status == expected => {
                b.status = next;
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_to_vehicle(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
        vehicle_id: i64,
    ) -> DomainResult<bool> {
        match self.batteries.get_mut(&id) {
            Some(mut b) if b.status == expected => {
                b.status = next;
                b.vehicle_id = Some(vehicle_id);
                b.station_id = None;
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_to_station(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
        station_id: i64,
    ) -> DomainResult<bool> {
        match self.batteries.get_mut(&id) {
            Some(mut b) if b.status == expected => {
                b.status = next;
                b.station_id = Some(station_id);
                b.vehicle_id = None;
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_first_at_station_with_status(
        &self,
        station_id: i64,
        status: BatteryStatus,
    ) -> DomainResult<Option<Battery>> {
        let mut matching: Vec<Battery> = self
            .batteries
            .iter()
            .filter(|b| b.station_id == Some(station_id) && b.status == status)
            .map(|b| b.clone())
            .collect();
        matching.sort_by_key(|b| b.id);
        Ok(matching.into_iter().next())
    }

    async fn find_on_vehicle(&self, vehicle_id: i64) -> DomainResult<Option<Battery>> {
        Ok(self
            .batteries
            .iter()
            .find(|b| b.vehicle_id == Some(vehicle_id))
            .map(|b| b.clone()))
    }

    async fn complete_exchange(
        &self,
        old_id: i64,
        old_next: BatteryStatus,
        station_id: i64,
        new_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<bool> {
        let _guard = self
            .exchange_lock
            .lock()
            .map_err(|_| DomainError::Storage("exchange lock poisoned".into()))?;

        let old_snapshot = match self.batteries.get(&old_id) {
            Some(b) if b.status == BatteryStatus::PendingOut => b.clone(),
            _ => return Ok(false),
        };

        // Write the outgoing side first, then the incoming side; undo
        // the first write if the second loses its race.
        {
            let mut old = self
                .batteries
                .get_mut(&old_id)
                .ok_or_else(|| DomainError::not_found("battery", "id", old_id))?;
            old.status = old_next;
            old.station_id = Some(station_id);
            old.vehicle_id = None;
            old.updated_at = Utc::now();
        }

        let incoming_ok = match self.batteries.get_mut(&new_id) {
            Some(mut b) if b.status == BatteryStatus::PendingIn => {
                b.status = BatteryStatus::InUse;
                b.vehicle_id = Some(vehicle_id);
                b.station_id = None;
                b.updated_at = Utc::now();
                true
            }
            _ => false,
        };

        if !incoming_ok {
            self.batteries.insert(old_id, old_snapshot);
            return Ok(false);
        }
        Ok(true)
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        self.batteries
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("battery", "id", id))?;
        Ok(())
    }
}

// ── ReservationRepository ───────────────────────────────────────

#[async_trait]
impl ReservationRepository for InMemoryRepositoryProvider {
    async fn insert_with_items(
        &self,
        mut reservation: Reservation,
        battery_ids: &[i64],
    ) -> DomainResult<Reservation> {
        reservation.id = self.reservation_counter.fetch_add(1, Ordering::SeqCst);
        for battery_id in battery_ids {
            let item = ReservationItem {
                id: self.item_counter.fetch_add(1, Ordering::SeqCst),
                reservation_id: reservation.id,
                battery_id: *battery_id,
            };
            self.reservation_items.insert(item.id, item);
        }
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(&id).map(|r| r.clone()))
    }

    async fn find_active_for_vehicle(&self, vehicle_id: i64) -> DomainResult<Option<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .find(|r| r.vehicle_id == vehicle_id && r.status == ReservationStatus::Active)
            .map(|r| r.clone()))
    }

    async fn list_for_user(&self, user_id: i64) -> DomainResult<Vec<Reservation>> {
        let mut out: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();
        out.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at));
        Ok(out)
    }

    async fn find_for_user_in_range(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id && r.reserved_at >= from && r.reserved_at < to)
            .map(|r| r.clone())
            .collect())
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Active && r.expire_at < now)
            .map(|r| r.clone())
            .collect())
    }

    async fn finish(
        &self,
        id: i64,
        next: ReservationStatus,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DomainResult<bool> {
        match self.reservations.get_mut(&id) {
            Some(mut r) if r.status == ReservationStatus::Active => {
                r.status = next;
                r.cancelled_at = Some(at);
                if let Some(reason) = reason {
                    r.cancel_reason = Some(reason.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_used(
        &self,
        id: i64,
        swap_transaction_id: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        match self.reservations.get_mut(&id) {
            Some(mut r) if r.status == ReservationStatus::Active => {
                r.status = ReservationStatus::Used;
                r.used_at = Some(at);
                r.swap_transaction_id = Some(swap_transaction_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn items_for(&self, reservation_id: i64) -> DomainResult<Vec<ReservationItem>> {
        let mut out: Vec<ReservationItem> = self
            .reservation_items
            .iter()
            .filter(|i| i.reservation_id == reservation_id)
            .map(|i| i.clone())
            .collect();
        out.sort_by_key(|i| i.id);
        Ok(out)
    }

    async fn battery_is_held(&self, battery_id: i64) -> DomainResult<bool> {
        for item in self.reservation_items.iter() {
            if item.battery_id != battery_id {
                continue;
            }
            if let Some(r) = self.reservations.get(&item.reservation_id) {
                if r.status == ReservationStatus::Active {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

// ── StationRepository ───────────────────────────────────────────

#[async_trait]
impl StationRepository for InMemoryRepositoryProvider {
    async fn insert(&self, mut station: Station) -> DomainResult<Station> {
        station.id = self.station_counter.fetch_add(1, Ordering::SeqCst);
        self.stations.insert(station.id, station.clone());
        Ok(station)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Station>> {
        Ok(self.stations.get(&id).map(|s| s.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        let mut out: Vec<Station> = self.stations.iter().map(|s| s.clone()).collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }
}

// ── SwapRepository ──────────────────────────────────────────────

#[async_trait]
impl SwapRepository for InMemoryRepositoryProvider {
    async fn insert(&self, mut tx: SwapTransaction) -> DomainResult<SwapTransaction> {
        tx.id = self.swap_counter.fetch_add(1, Ordering::SeqCst);
        self.swaps.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<SwapTransaction>> {
        Ok(self.swaps.get(&id).map(|t| t.clone()))
    }

    async fn resolve(
        &self,
        id: i64,
        next: SwapStatus,
        staff_id: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        match self.swaps.get_mut(&id) {
            Some(mut t) if t.status == SwapStatus::PendingConfirm => {
                t.status = next;
                t.confirmed_by = Some(staff_id);
                t.processed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_vehicle(&self, vehicle_id: i64) -> DomainResult<Vec<SwapTransaction>> {
        let mut out: Vec<SwapTransaction> = self
            .swaps
            .iter()
            .filter(|t| t.vehicle_id == vehicle_id)
            .map(|t| t.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }
}

// ── BatteryEventRepository ──────────────────────────────────────

#[async_trait]
impl BatteryEventRepository for InMemoryRepositoryProvider {
    async fn append(&self, mut event: BatteryEvent) -> DomainResult<BatteryEvent> {
        event.id = self.event_counter.fetch_add(1, Ordering::SeqCst);
        self.battery_events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_for_battery(&self, battery_id: i64) -> DomainResult<Vec<BatteryEvent>> {
        let mut out: Vec<BatteryEvent> = self
            .battery_events
            .iter()
            .filter(|e| e.battery_id == battery_id)
            .map(|e| e.clone())
            .collect();
        out.sort_by_key(|e| e.id);
        Ok(out)
    }

    async fn count_swaps(&self, battery_id: i64) -> DomainResult<u64> {
        Ok(self
            .battery_events
            .iter()
            .filter(|e| e.battery_id == battery_id && e.event_type == BatteryEventType::Swapped)
            .count() as u64)
    }
}

// ── Directory doubles ───────────────────────────────────────────

/// Fixed subscription lookups for tests and development.
pub struct StaticSubscriptionDirectory {
    grants: DashMap<(i64, i64), SubscriptionGrant>,
}

impl StaticSubscriptionDirectory {
    pub fn new() -> Self {
        Self {
            grants: DashMap::new(),
        }
    }

    pub fn grant(&self, user_id: i64, vehicle_id: i64, subscription_id: i64, battery_limit: u32) {
        self.grants.insert(
            (user_id, vehicle_id),
            SubscriptionGrant {
                subscription_id,
                battery_limit,
            },
        );
    }

    pub fn revoke(&self, user_id: i64, vehicle_id: i64) {
        self.grants.remove(&(user_id, vehicle_id));
    }
}

impl Default for StaticSubscriptionDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionDirectory for StaticSubscriptionDirectory {
    async fn active_subscription(
        &self,
        user_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<Option<SubscriptionGrant>> {
        Ok(self.grants.get(&(user_id, vehicle_id)).map(|g| g.clone()))
    }
}

/// Fixed vehicle ownership lookups for tests and development.
pub struct StaticVehicleDirectory {
    owners: DashMap<i64, i64>,
}

impl StaticVehicleDirectory {
    pub fn new() -> Self {
        Self {
            owners: DashMap::new(),
        }
    }

    pub fn assign(&self, vehicle_id: i64, user_id: i64) {
        self.owners.insert(vehicle_id, user_id);
    }
}

impl Default for StaticVehicleDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VehicleDirectory for StaticVehicleDirectory {
    async fn vehicle_belongs_to_user(&self, user_id: i64, vehicle_id: i64) -> DomainResult<bool> {
        Ok(self.owners.get(&vehicle_id).map(|o| *o) == Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conditional_transition_checks_expected_status() {
        let repos = InMemoryRepositoryProvider::new();
        let b = repos
            .batteries()
            .insert(Battery::provision("BAT-100", 1, 2000.0))
            .await
            .unwrap();

        let won = repos
            .batteries()
            .transition_status(b.id, BatteryStatus::Available, BatteryStatus::Reserved)
            .await
            .unwrap();
        assert!(won);

        // Second writer expecting Available must lose.
        let lost = repos
            .batteries()
            .transition_status(b.id, BatteryStatus::Available, BatteryStatus::Reserved)
            .await
            .unwrap();
        assert!(!lost);
    }

    #[tokio::test]
    async fn duplicate_serial_rejected() {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .batteries()
            .insert(Battery::provision("BAT-DUP", 1, 2000.0))
            .await
            .unwrap();
        let err = repos
            .batteries()
            .insert(Battery::provision("BAT-DUP", 1, 2000.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn exchange_rolls_back_when_incoming_side_lost() {
        let repos = InMemoryRepositoryProvider::new();
        let mut old = Battery::provision("BAT-OLD", 1, 2000.0);
        old.status = BatteryStatus::PendingOut;
        old.vehicle_id = Some(5);
        old.station_id = None;
        let old = repos.batteries().insert(old).await.unwrap();

        // Incoming battery is Available, not PendingIn.
        let incoming = repos
            .batteries()
            .insert(Battery::provision("BAT-NEW", 1, 2000.0))
            .await
            .unwrap();

        let ok = repos
            .batteries()
            .complete_exchange(old.id, BatteryStatus::Available, 1, incoming.id, 5)
            .await
            .unwrap();
        assert!(!ok);

        // Outgoing side untouched after the rollback.
        let stored = repos.batteries().find_by_id(old.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BatteryStatus::PendingOut);
        assert_eq!(stored.vehicle_id, Some(5));
    }

    #[tokio::test]
    async fn finish_is_single_winner() {
        let repos = InMemoryRepositoryProvider::new();
        let r = repos
            .reservations()
            .insert_with_items(Reservation::new(1, 10, 100, 1000, 1, 60), &[1])
            .await
            .unwrap();

        let now = Utc::now();
        let first = repos
            .reservations()
            .finish(r.id, ReservationStatus::Cancelled, now, Some("User cancelled"))
            .await
            .unwrap();
        let second = repos
            .reservations()
            .finish(r.id, ReservationStatus::Expired, now, None)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let stored = repos.reservations().find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
        assert_eq!(stored.cancel_reason.as_deref(), Some("User cancelled"));
    }

    #[tokio::test]
    async fn battery_is_held_only_for_active_reservations() {
        let repos = InMemoryRepositoryProvider::new();
        let r = repos
            .reservations()
            .insert_with_items(Reservation::new(1, 10, 100, 1000, 1, 60), &[42])
            .await
            .unwrap();
        assert!(repos.reservations().battery_is_held(42).await.unwrap());

        repos
            .reservations()
            .finish(r.id, ReservationStatus::Cancelled, Utc::now(), None)
            .await
            .unwrap();
        assert!(!repos.reservations().battery_is_held(42).await.unwrap());
    }
}
