//! Reservation engine: creation, queries, cancellation, expiry.
//!
//! Owns the "one active reservation per vehicle" invariant and the
//! atomic selection-and-lock of batteries. Check-then-act sections run
//! under per-vehicle and per-station async mutexes; on top of that every
//! battery status write is a conditional update keyed on the expected
//! prior status, so a racing writer turns into a clean no-op instead of
//! a double allocation.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::battery_registry::BatteryRegistry;
use super::reputation::ReputationTracker;
use crate::application::ports::outbound::{SubscriptionDirectory, VehicleDirectory};
use crate::domain::{
    Battery, BatteryStatus, DomainResult, RepositoryProvider, Reservation, ReservationStatus,
};
use crate::shared::errors::DomainError;

/// Reason recorded when the background sweep expires a reservation.
pub const AUTO_EXPIRE_REASON: &str = "Auto-expired after 1 hour";

/// Reason recorded when the user cancels without giving one.
pub const DEFAULT_CANCEL_REASON: &str = "User cancelled";

/// Tunables for reservation creation.
#[derive(Debug, Clone, Copy)]
pub struct ReservationPolicy {
    /// How long a reservation holds its batteries.
    pub ttl_minutes: i64,
    /// Auto-selection only considers batteries at or above this charge.
    pub min_charge_percent: f64,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            min_charge_percent: 95.0,
        }
    }
}

/// A reservation plus the batteries it holds and the countdown shown to
/// the user, computed at read time.
#[derive(Debug, Clone)]
pub struct ReservationView {
    pub reservation: Reservation,
    pub batteries: Vec<Battery>,
    pub remaining_minutes: i64,
}

pub struct ReservationEngine {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<BatteryRegistry>,
    reputation: Arc<ReputationTracker>,
    subscriptions: Arc<dyn SubscriptionDirectory>,
    vehicles: Arc<dyn VehicleDirectory>,
    policy: ReservationPolicy,
    // Mutual-exclusion sections for check-then-act invariants. Always
    // vehicle lock before station lock to keep lock order consistent.
    vehicle_locks: DashMap<i64, Arc<Mutex<()>>>,
    station_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl ReservationEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<BatteryRegistry>,
        reputation: Arc<ReputationTracker>,
        subscriptions: Arc<dyn SubscriptionDirectory>,
        vehicles: Arc<dyn VehicleDirectory>,
        policy: ReservationPolicy,
    ) -> Self {
        Self {
            repos,
            registry,
            reputation,
            subscriptions,
            vehicles,
            policy,
            vehicle_locks: DashMap::new(),
            station_locks: DashMap::new(),
        }
    }

    fn vehicle_lock(&self, vehicle_id: i64) -> Arc<Mutex<()>> {
        self.vehicle_locks
            .entry(vehicle_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn station_lock(&self, station_id: i64) -> Arc<Mutex<()>> {
        self.station_locks
            .entry(station_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn ensure_owned(&self, user_id: i64, vehicle_id: i64) -> DomainResult<()> {
        if !self
            .vehicles
            .vehicle_belongs_to_user(user_id, vehicle_id)
            .await?
        {
            return Err(DomainError::Forbidden(format!(
                "vehicle {vehicle_id} does not belong to user {user_id}"
            )));
        }
        Ok(())
    }

    // ── Creation ───────────────────────────────────────────────

    pub async fn create(
        &self,
        user_id: i64,
        vehicle_id: i64,
        station_id: i64,
        quantity: u32,
        battery_ids: Option<Vec<i64>>,
    ) -> DomainResult<ReservationView> {
        self.ensure_owned(user_id, vehicle_id).await?;

        let grant = self
            .subscriptions
            .active_subscription(user_id, vehicle_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("Subscription", "vehicle_id", vehicle_id)
            })?;

        self.reputation.gate(user_id).await?;

        if quantity == 0 {
            return Err(DomainError::InvalidInput("quantity must be at least 1".into()));
        }

        if self.repos.stations().find_by_id(station_id).await?.is_none() {
            return Err(DomainError::not_found("Station", "id", station_id));
        }

        // Serialize the check-then-act window per vehicle and the
        // select-then-lock window per station.
        let vehicle_mutex = self.vehicle_lock(vehicle_id);
        let _vehicle_guard = vehicle_mutex.lock().await;

        if self
            .repos
            .reservations()
            .find_active_for_vehicle(vehicle_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "vehicle {vehicle_id} already has an active reservation"
            )));
        }

        // Quota is checked once the vehicle is known to be free, so a
        // request tripping both rules reports the conflict.
        if quantity > grant.battery_limit {
            return Err(DomainError::QuotaExceeded {
                requested: quantity,
                limit: grant.battery_limit,
            });
        }

        let station_mutex = self.station_lock(station_id);
        let _station_guard = station_mutex.lock().await;

        let selected = match battery_ids {
            Some(ids) => self.validate_explicit_selection(station_id, quantity, ids).await?,
            None => self.auto_select(station_id, quantity).await?,
        };

        let locked = self.lock_all(&selected, user_id).await?;

        let reservation = Reservation::new(
            user_id,
            vehicle_id,
            station_id,
            grant.subscription_id,
            quantity,
            self.policy.ttl_minutes,
        );
        let reservation = match self
            .repos
            .reservations()
            .insert_with_items(reservation, &locked)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // Inserting failed after the batteries were locked:
                // give them back before surfacing the error.
                self.release_many(&locked, Some(user_id), "reservation insert failed")
                    .await;
                return Err(e);
            }
        };

        metrics::counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = reservation.id,
            user_id,
            vehicle_id,
            station_id,
            quantity,
            "Reservation created"
        );

        self.view(reservation).await
    }

    /// Caller-supplied battery ids: each must be at the target station
    /// and Available, and the count must equal the requested quantity.
    async fn validate_explicit_selection(
        &self,
        station_id: i64,
        quantity: u32,
        ids: Vec<i64>,
    ) -> DomainResult<Vec<i64>> {
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != ids.len() {
            return Err(DomainError::InvalidInput(
                "battery selection contains duplicates".into(),
            ));
        }
        if ids.len() != quantity as usize {
            return Err(DomainError::InvalidInput(format!(
                "selected {} batteries for a quantity of {quantity}",
                ids.len()
            )));
        }

        for id in &ids {
            let battery = self
                .repos
                .batteries()
                .find_by_id(*id)
                .await?
                .ok_or_else(|| DomainError::not_found("Battery", "id", *id))?;
            if battery.station_id != Some(station_id) {
                return Err(DomainError::InvalidInput(format!(
                    "battery {} is not at station {station_id}",
                    battery.serial_number
                )));
            }
            if !battery.is_available() {
                return Err(DomainError::InvalidInput(format!(
                    "battery {} is {}, not Available",
                    battery.serial_number, battery.status
                )));
            }
        }
        Ok(ids)
    }

    /// Best-charged Available batteries at or above the charge floor,
    /// ties broken by SoH.
    async fn auto_select(&self, station_id: i64, quantity: u32) -> DomainResult<Vec<i64>> {
        let mut candidates: Vec<Battery> = self
            .repos
            .batteries()
            .find_at_station(station_id)
            .await?
            .into_iter()
            .filter(|b| b.is_available() && b.charge_percent >= self.policy.min_charge_percent)
            .collect();

        candidates.sort_by(|a, b| {
            b.charge_percent
                .partial_cmp(&a.charge_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.soh_percent
                        .partial_cmp(&a.soh_percent)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        if candidates.len() < quantity as usize {
            return Err(DomainError::InsufficientInventory {
                station_id,
                requested: quantity,
                available: candidates.len() as u32,
            });
        }

        Ok(candidates
            .into_iter()
            .take(quantity as usize)
            .map(|b| b.id)
            .collect())
    }

    /// Lock every selected battery Available -> Reserved, all or
    /// nothing. A lost race on any unit rolls back the ones already
    /// locked and surfaces a retryable Conflict.
    async fn lock_all(&self, battery_ids: &[i64], user_id: i64) -> DomainResult<Vec<i64>> {
        let mut locked: Vec<i64> = Vec::with_capacity(battery_ids.len());
        for id in battery_ids {
            match self.registry.lock_for_reservation(*id, user_id).await {
                Ok(true) => locked.push(*id),
                Ok(false) => {
                    self.release_many(&locked, Some(user_id), "battery lock race lost")
                        .await;
                    return Err(DomainError::Conflict(format!(
                        "battery {id} was taken by a concurrent reservation"
                    )));
                }
                Err(e) => {
                    self.release_many(&locked, Some(user_id), "battery lock failed")
                        .await;
                    return Err(e);
                }
            }
        }
        metrics::counter!("batteries_locked_total").increment(locked.len() as u64);
        Ok(locked)
    }

    /// Best-effort release during rollback and sweeps; individual
    /// failures are logged, not propagated.
    async fn release_many(&self, battery_ids: &[i64], actor: Option<i64>, notes: &str) {
        for id in battery_ids {
            if let Err(e) = self
                .registry
                .release_from_reservation(*id, actor, notes)
                .await
            {
                warn!(battery_id = id, error = %e, "Failed to release battery");
            }
        }
    }

    // ── Queries ────────────────────────────────────────────────

    async fn view(&self, reservation: Reservation) -> DomainResult<ReservationView> {
        let items = self.repos.reservations().items_for(reservation.id).await?;
        let mut batteries = Vec::with_capacity(items.len());
        for item in items {
            if let Some(b) = self.repos.batteries().find_by_id(item.battery_id).await? {
                batteries.push(b);
            }
        }
        let remaining_minutes = reservation.remaining_minutes(Utc::now());
        Ok(ReservationView {
            reservation,
            batteries,
            remaining_minutes,
        })
    }

    /// The vehicle's Active reservation, or None. Absence is not an
    /// error; the HTTP edge maps None to "no content".
    pub async fn get_active(
        &self,
        user_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<Option<ReservationView>> {
        self.ensure_owned(user_id, vehicle_id).await?;
        match self
            .repos
            .reservations()
            .find_active_for_vehicle(vehicle_id)
            .await?
        {
            Some(r) => Ok(Some(self.view(r).await?)),
            None => Ok(None),
        }
    }

    /// All of the user's reservations, most recent first.
    pub async fn list(&self, user_id: i64) -> DomainResult<Vec<ReservationView>> {
        let mut views = Vec::new();
        for r in self.repos.reservations().list_for_user(user_id).await? {
            views.push(self.view(r).await?);
        }
        Ok(views)
    }

    /// Stations a user can reserve at.
    pub async fn list_stations(&self) -> DomainResult<Vec<crate::domain::Station>> {
        self.repos.stations().find_all().await
    }

    /// A single reservation. Cross-user lookups get NotFound rather
    /// than Forbidden so existence does not leak.
    pub async fn get(&self, user_id: i64, reservation_id: i64) -> DomainResult<ReservationView> {
        let reservation = self
            .repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;
        self.view(reservation).await
    }

    // ── Cancellation ───────────────────────────────────────────

    pub async fn cancel(
        &self,
        user_id: i64,
        reservation_id: i64,
        reason: Option<&str>,
    ) -> DomainResult<ReservationView> {
        let reservation = self
            .repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;

        if !reservation.is_active() {
            return Err(DomainError::InvalidState(format!(
                "reservation {reservation_id} is {}, only Active reservations can be cancelled",
                reservation.status
            )));
        }

        let reason = reason.unwrap_or(DEFAULT_CANCEL_REASON);
        let now = Utc::now();

        // Terminal transition first; whoever wins it owns the release.
        // A concurrent expiry sweep that got there first makes this a
        // no-op and we report the state honestly.
        let won = self
            .repos
            .reservations()
            .finish(reservation_id, ReservationStatus::Cancelled, now, Some(reason))
            .await?;
        if !won {
            return Err(DomainError::InvalidState(format!(
                "reservation {reservation_id} was already closed"
            )));
        }

        let items = self.repos.reservations().items_for(reservation_id).await?;
        let battery_ids: Vec<i64> = items.iter().map(|i| i.battery_id).collect();
        self.release_many(&battery_ids, Some(user_id), reason).await;

        metrics::counter!("reservations_cancelled_total").increment(1);
        info!(reservation_id, user_id, reason, "Reservation cancelled");

        let reservation = self
            .repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;
        self.view(reservation).await
    }

    // ── Expiry sweep ───────────────────────────────────────────

    /// Close every overdue Active reservation and give its batteries
    /// back. Each reservation is processed independently; a failure on
    /// one is logged and the sweep moves on. Safe to re-run: expired
    /// reservations drop out of the overdue query, and the terminal
    /// transition is conditional so a racing cancel wins cleanly.
    pub async fn auto_expire_sweep(&self) -> DomainResult<u32> {
        let now = Utc::now();
        let overdue = self.repos.reservations().find_overdue(now).await?;
        if overdue.is_empty() {
            return Ok(0);
        }

        info!(count = overdue.len(), "Expiring overdue reservations");
        let mut expired = 0u32;

        for reservation in overdue {
            let won = match self
                .repos
                .reservations()
                .finish(
                    reservation.id,
                    ReservationStatus::Expired,
                    now,
                    Some(AUTO_EXPIRE_REASON),
                )
                .await
            {
                Ok(won) => won,
                Err(e) => {
                    warn!(reservation_id = reservation.id, error = %e, "Failed to expire reservation");
                    continue;
                }
            };
            if !won {
                // A cancel or swap beat us to the terminal status.
                continue;
            }

            match self.repos.reservations().items_for(reservation.id).await {
                Ok(items) => {
                    let ids: Vec<i64> = items.iter().map(|i| i.battery_id).collect();
                    self.release_many(&ids, None, AUTO_EXPIRE_REASON).await;
                }
                Err(e) => {
                    warn!(reservation_id = reservation.id, error = %e, "Failed to load items for expired reservation");
                }
            }

            expired += 1;
        }

        if expired > 0 {
            metrics::counter!("reservations_expired_total").increment(expired as u64);
        }
        Ok(expired)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::Station;
    use crate::infrastructure::storage::memory::{
        InMemoryRepositoryProvider, StaticSubscriptionDirectory, StaticVehicleDirectory,
    };

    struct Harness {
        repos: Arc<InMemoryRepositoryProvider>,
        registry: Arc<BatteryRegistry>,
        subscriptions: Arc<StaticSubscriptionDirectory>,
        engine: Arc<ReservationEngine>,
        station_id: i64,
    }

    const USER: i64 = 1;
    const VEHICLE: i64 = 10;

    async fn setup() -> Harness {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let station = repos
            .stations()
            .insert(Station::new("S1", "1 Main St"))
            .await
            .unwrap();

        let subscriptions = Arc::new(StaticSubscriptionDirectory::new());
        subscriptions.grant(USER, VEHICLE, 1000, 2);
        let vehicles = Arc::new(StaticVehicleDirectory::new());
        vehicles.assign(VEHICLE, USER);

        let registry = Arc::new(BatteryRegistry::new(
            repos.clone() as Arc<dyn RepositoryProvider>
        ));
        let reputation = Arc::new(ReputationTracker::new(
            repos.clone() as Arc<dyn RepositoryProvider>
        ));
        let engine = Arc::new(ReservationEngine::new(
            repos.clone() as Arc<dyn RepositoryProvider>,
            registry.clone(),
            reputation,
            subscriptions.clone(),
            vehicles,
            ReservationPolicy::default(),
        ));
        Harness {
            repos,
            registry,
            subscriptions,
            engine,
            station_id: station.id,
        }
    }

    async fn add_battery(h: &Harness, serial: &str, charge: f64, soh: f64) -> i64 {
        let b = h
            .registry
            .provision(serial, h.station_id, 2000.0, 99)
            .await
            .unwrap();
        let mut b = h.repos.batteries().find_by_id(b.id).await.unwrap().unwrap();
        b.charge_percent = charge;
        b.soh_percent = soh;
        h.repos.batteries().update(b).await.unwrap();
        b_id(serial, &h.repos).await
    }

    async fn b_id(serial: &str, repos: &InMemoryRepositoryProvider) -> i64 {
        repos
            .batteries()
            .find_by_serial(serial)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn auto_select_prefers_charge_then_soh() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 97.0, 90.0).await;
        add_battery(&h, "BAT-002", 97.0, 95.0).await;
        add_battery(&h, "BAT-003", 94.0, 100.0).await; // below the floor
        add_battery(&h, "BAT-004", 99.0, 80.0).await;

        let view = h
            .engine
            .create(USER, VEHICLE, h.station_id, 2, None)
            .await
            .unwrap();
        let serials: Vec<&str> = view
            .batteries
            .iter()
            .map(|b| b.serial_number.as_str())
            .collect();
        // 99% first, then the 97% tie broken by SoH
        assert_eq!(serials, vec!["BAT-004", "BAT-002"]);
        for b in &view.batteries {
            assert_eq!(b.status, BatteryStatus::Reserved);
        }
        assert!(view.remaining_minutes <= 60 && view.remaining_minutes >= 59);
    }

    #[tokio::test]
    async fn second_reservation_for_vehicle_conflicts() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;
        add_battery(&h, "BAT-002", 100.0, 100.0).await;

        h.engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap();
        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_creates_for_same_vehicle_yield_one_winner() {
        let h = setup().await;
        for i in 0..4 {
            add_battery(&h, &format!("BAT-00{i}"), 100.0, 100.0).await;
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = h.engine.clone();
            let station = h.station_id;
            handles.push(tokio::spawn(async move {
                engine.create(USER, VEHICLE, station, 1, None).await
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);

        // Exactly one battery ended up Reserved
        let reserved = h
            .repos
            .batteries()
            .find_at_station(h.station_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|b| b.status == BatteryStatus::Reserved)
            .count();
        assert_eq!(reserved, 1);
    }

    #[tokio::test]
    async fn quantity_over_plan_limit_is_rejected() {
        let h = setup().await;
        for i in 0..3 {
            add_battery(&h, &format!("BAT-00{i}"), 100.0, 100.0).await;
        }
        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 3, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::QuotaExceeded {
                requested: 3,
                limit: 2
            }
        ));
    }

    #[tokio::test]
    async fn conflict_is_reported_before_quota() {
        let h = setup().await;
        for i in 0..4 {
            add_battery(&h, &format!("BAT-00{i}"), 100.0, 100.0).await;
        }
        h.engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap();

        // Trips both rules; the vehicle conflict must win.
        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 3, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_stations_covers_every_station() {
        let h = setup().await;
        h.repos
            .stations()
            .insert(Station::new("S2", "2 Side St"))
            .await
            .unwrap();
        let stations = h.engine.list_stations().await.unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "S1");
        assert_eq!(stations[1].name, "S2");
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let h = setup().await;
        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn shortfall_reports_inventory_not_partial_lock() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;

        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 2, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientInventory {
                requested: 2,
                available: 1,
                ..
            }
        ));
        // The one candidate must not be left Reserved
        let b = h
            .repos
            .batteries()
            .find_by_serial("BAT-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.status, BatteryStatus::Available);
    }

    #[tokio::test]
    async fn explicit_selection_rejects_duplicates_and_off_station_units() {
        let h = setup().await;
        let id = add_battery(&h, "BAT-001", 100.0, 100.0).await;

        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 2, Some(vec![id, id]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let other = h
            .repos
            .stations()
            .insert(Station::new("S2", "2 Side St"))
            .await
            .unwrap();
        let far = h
            .registry
            .provision("BAT-FAR", other.id, 2000.0, 99)
            .await
            .unwrap();
        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 1, Some(vec![far.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_subscription_is_not_found() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;
        h.subscriptions.revoke(USER, VEHICLE);
        let err = h
            .engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn foreign_vehicle_is_forbidden() {
        let h = setup().await;
        let err = h
            .engine
            .create(USER, 999, h.station_id, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancel_releases_batteries_and_records_reason() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;

        let view = h
            .engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap();
        let cancelled = h
            .engine
            .cancel(USER, view.reservation.id, None)
            .await
            .unwrap();
        assert_eq!(cancelled.reservation.status, ReservationStatus::Cancelled);
        assert_eq!(
            cancelled.reservation.cancel_reason.as_deref(),
            Some(DEFAULT_CANCEL_REASON)
        );
        assert_eq!(cancelled.batteries[0].status, BatteryStatus::Available);

        // A second cancel finds the reservation already closed
        let err = h
            .engine
            .cancel(USER, view.reservation.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn cross_user_lookup_is_not_found() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;
        let view = h
            .engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap();
        let err = h.engine.get(2, view.reservation.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        let err = h.engine.cancel(2, view.reservation.id, None).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn sweep_expires_overdue_and_frees_batteries() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;

        // A negative TTL makes the reservation overdue the moment it
        // exists, without sleeping in the test.
        let engine = ReservationEngine::new(
            h.repos.clone() as Arc<dyn RepositoryProvider>,
            h.registry.clone(),
            Arc::new(ReputationTracker::new(
                h.repos.clone() as Arc<dyn RepositoryProvider>
            )),
            h.subscriptions.clone(),
            {
                let vehicles = Arc::new(StaticVehicleDirectory::new());
                vehicles.assign(VEHICLE, USER);
                vehicles
            },
            ReservationPolicy {
                ttl_minutes: -1,
                min_charge_percent: 95.0,
            },
        );

        let view = engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap();

        let expired = engine.auto_expire_sweep().await.unwrap();
        assert_eq!(expired, 1);

        let r = h
            .repos
            .reservations()
            .find_by_id(view.reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(r.status, ReservationStatus::Expired);
        assert_eq!(r.cancel_reason.as_deref(), Some(AUTO_EXPIRE_REASON));

        let b = h
            .repos
            .batteries()
            .find_by_serial("BAT-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.status, BatteryStatus::Available);

        // Second sweep is a no-op
        assert_eq!(engine.auto_expire_sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_active_returns_none_after_cancel() {
        let h = setup().await;
        add_battery(&h, "BAT-001", 100.0, 100.0).await;
        let view = h
            .engine
            .create(USER, VEHICLE, h.station_id, 1, None)
            .await
            .unwrap();
        assert!(h.engine.get_active(USER, VEHICLE).await.unwrap().is_some());
        h.engine.cancel(USER, view.reservation.id, None).await.unwrap();
        assert!(h.engine.get_active(USER, VEHICLE).await.unwrap().is_none());
    }
}
