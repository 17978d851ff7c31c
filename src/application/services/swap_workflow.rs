//! Swap workflow: staging, staff confirmation, rejection, and the
//! self-service fast path.
//!
//! One state machine covers both entry points. A staff-confirmed swap
//! stages the outgoing battery as PendingOut and the incoming one as
//! PendingIn, then a confirmation re-homes both in a single storage
//! transaction. The self-service path is the degenerate case: it runs
//! the same staging and confirmation back-to-back in one call.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::swap::{compute_degradation, energy_cost, energy_used_kwh};
use crate::domain::{
    Battery, BatteryEvent, BatteryEventType, BatteryStatus, DomainResult, RepositoryProvider,
    SwapStatus, SwapTransaction,
};
use crate::application::ports::outbound::VehicleDirectory;
use crate::shared::errors::DomainError;

/// Tunables for the swap workflow.
#[derive(Debug, Clone, Copy)]
pub struct SwapPolicy {
    /// Swapped-event count beyond which a battery is forced into
    /// maintenance after its next swap.
    pub swap_count_threshold: u64,
    /// Price charged per kWh drawn from the returned battery.
    pub price_per_kwh: Decimal,
}

impl Default for SwapPolicy {
    fn default() -> Self {
        Self {
            swap_count_threshold: 50,
            price_per_kwh: Decimal::new(3500, 0),
        }
    }
}

pub struct SwapWorkflow {
    repos: Arc<dyn RepositoryProvider>,
    vehicles: Arc<dyn VehicleDirectory>,
    policy: SwapPolicy,
}

impl SwapWorkflow {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        vehicles: Arc<dyn VehicleDirectory>,
        policy: SwapPolicy,
    ) -> Self {
        Self {
            repos,
            vehicles,
            policy,
        }
    }

    // ── Staging ────────────────────────────────────────────────

    /// Stage a physical exchange at a station: the vehicle's battery
    /// goes PendingOut, a replacement goes PendingIn, and a
    /// PendingConfirm transaction records the pair for staff review.
    ///
    /// The replacement comes from the vehicle's active reservation at
    /// this station when one exists, otherwise the best-charged
    /// Available battery.
    pub async fn request_swap(
        &self,
        user_id: i64,
        vehicle_id: i64,
        station_id: i64,
        start_percent: f64,
        end_percent: f64,
    ) -> DomainResult<SwapTransaction> {
        if !self
            .vehicles
            .vehicle_belongs_to_user(user_id, vehicle_id)
            .await?
        {
            return Err(DomainError::Forbidden(format!(
                "vehicle {vehicle_id} does not belong to user {user_id}"
            )));
        }
        if self.repos.stations().find_by_id(station_id).await?.is_none() {
            return Err(DomainError::not_found("Station", "id", station_id));
        }

        let old = self
            .repos
            .batteries()
            .find_on_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Battery", "vehicle_id", vehicle_id))?;

        // Validates end < start before anything is staged.
        let degradation = compute_degradation(start_percent, end_percent, old.soh_percent)?;

        let staged_out = self
            .repos
            .batteries()
            .transition_status(old.id, BatteryStatus::InUse, BatteryStatus::PendingOut)
            .await?;
        if !staged_out {
            return Err(DomainError::Conflict(format!(
                "battery {} is already part of another swap",
                old.serial_number
            )));
        }

        let (new_battery, reservation_id) = match self.stage_incoming(vehicle_id, station_id).await
        {
            Ok(staged) => staged,
            Err(e) => {
                // Undo the outgoing staging before surfacing the error.
                self.unstage_outgoing(old.id).await;
                return Err(e);
            }
        };

        let energy_kwh = energy_used_kwh(degradation.depth, old.initial_capacity_wh);
        let tx = SwapTransaction {
            id: 0,
            reference: Uuid::new_v4(),
            user_id,
            vehicle_id,
            station_id,
            old_battery_id: old.id,
            new_battery_id: Some(new_battery.id),
            reservation_id,
            status: SwapStatus::PendingConfirm,
            start_percent,
            end_percent,
            energy_kwh,
            cost: energy_cost(energy_kwh, self.policy.price_per_kwh),
            confirmed_by: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        let tx = match self.repos.swaps().insert(tx).await {
            Ok(tx) => tx,
            Err(e) => {
                self.unstage_outgoing(old.id).await;
                self.unstage_incoming(new_battery.id, reservation_id).await;
                return Err(e);
            }
        };

        info!(
            swap_id = tx.id,
            reference = %tx.reference,
            vehicle_id,
            station_id,
            "Swap staged for confirmation"
        );
        Ok(tx)
    }

    /// Pick and stage the incoming battery. Reserved units of the
    /// vehicle's active reservation take priority over open inventory.
    async fn stage_incoming(
        &self,
        vehicle_id: i64,
        station_id: i64,
    ) -> DomainResult<(Battery, Option<i64>)> {
        if let Some(reservation) = self
            .repos
            .reservations()
            .find_active_for_vehicle(vehicle_id)
            .await?
        {
            if reservation.station_id == station_id {
                for item in self.repos.reservations().items_for(reservation.id).await? {
                    let staged = self
                        .repos
                        .batteries()
                        .transition_status(
                            item.battery_id,
                            BatteryStatus::Reserved,
                            BatteryStatus::PendingIn,
                        )
                        .await?;
                    if staged {
                        let battery = self
                            .repos
                            .batteries()
                            .find_by_id(item.battery_id)
                            .await?
                            .ok_or_else(|| {
                                DomainError::not_found("Battery", "id", item.battery_id)
                            })?;
                        return Ok((battery, Some(reservation.id)));
                    }
                }
            }
        }

        // No usable reservation: take the best-charged Available unit.
        let mut candidates: Vec<Battery> = self
            .repos
            .batteries()
            .find_at_station(station_id)
            .await?
            .into_iter()
            .filter(|b| b.is_available())
            .collect();
        candidates.sort_by(|a, b| {
            b.charge_percent
                .partial_cmp(&a.charge_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for candidate in candidates {
            let staged = self
                .repos
                .batteries()
                .transition_status(
                    candidate.id,
                    BatteryStatus::Available,
                    BatteryStatus::PendingIn,
                )
                .await?;
            if staged {
                return Ok((candidate, None));
            }
        }

        Err(DomainError::InsufficientInventory {
            station_id,
            requested: 1,
            available: 0,
        })
    }

    async fn unstage_outgoing(&self, battery_id: i64) {
        if let Err(e) = self
            .repos
            .batteries()
            .transition_status(battery_id, BatteryStatus::PendingOut, BatteryStatus::InUse)
            .await
        {
            warn!(battery_id, error = %e, "Failed to unstage outgoing battery");
        }
    }

    /// Return a staged battery to where it came from: its reservation's
    /// hold when the reservation is still Active, open inventory
    /// otherwise.
    async fn unstage_incoming(&self, battery_id: i64, reservation_id: Option<i64>) {
        let back_to_hold = match reservation_id {
            Some(id) => matches!(
                self.repos.reservations().find_by_id(id).await,
                Ok(Some(ref r)) if r.is_active()
            ),
            None => false,
        };
        let restored = if back_to_hold {
            BatteryStatus::Reserved
        } else {
            BatteryStatus::Available
        };
        match self
            .repos
            .batteries()
            .transition_status(battery_id, BatteryStatus::PendingIn, restored)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(battery_id, "Staged battery left PendingIn before it was unstaged");
            }
            Err(e) => {
                warn!(battery_id, error = %e, "Failed to unstage incoming battery");
            }
        }
    }

    // ── Confirmation ───────────────────────────────────────────

    /// Staff confirms the physical exchange. The conditional status
    /// resolve is the mutual-exclusion gate: exactly one confirm or
    /// reject wins, everyone else gets InvalidState.
    pub async fn confirm_swap(&self, tx_id: i64, staff_id: i64) -> DomainResult<SwapTransaction> {
        let tx = self.get(tx_id).await?;
        if !tx.is_pending() {
            return Err(DomainError::InvalidState(format!(
                "swap {tx_id} already processed ({})",
                tx.status
            )));
        }

        let now = Utc::now();
        let won = self
            .repos
            .swaps()
            .resolve(tx_id, SwapStatus::Completed, staff_id, now)
            .await?;
        if !won {
            return Err(DomainError::InvalidState(format!(
                "swap {tx_id} already processed"
            )));
        }

        let mut old = self
            .repos
            .batteries()
            .find_by_id(tx.old_battery_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Battery", "id", tx.old_battery_id))?;

        let degradation =
            compute_degradation(tx.start_percent, tx.end_percent, old.soh_percent)?;
        let old_next = if degradation.needs_maintenance {
            BatteryStatus::Maintenance
        } else {
            BatteryStatus::Available
        };

        // Wear lands on the returned battery before it is re-homed.
        old.charge_percent = tx.end_percent;
        old.soh_percent = degradation.new_soh;
        old.cycle_count += degradation.cycle_fraction;
        old.current_capacity_wh = old.initial_capacity_wh * degradation.new_soh / 100.0;
        self.repos.batteries().update(old.clone()).await?;

        let incoming = match tx.new_battery_id {
            Some(id) => id,
            None => {
                self.repos
                    .batteries()
                    .find_first_at_station_with_status(tx.station_id, BatteryStatus::PendingIn)
                    .await?
                    .map(|b| b.id)
                    .ok_or_else(|| {
                        DomainError::InvalidState(format!(
                            "no battery staged for hand-out at station {}",
                            tx.station_id
                        ))
                    })?
            }
        };

        // Old to the station, new onto the vehicle, one transaction.
        let exchanged = self
            .repos
            .batteries()
            .complete_exchange(tx.old_battery_id, old_next, tx.station_id, incoming, tx.vehicle_id)
            .await?;
        if !exchanged {
            return Err(DomainError::Conflict(format!(
                "swap {tx_id} batteries changed state during confirmation"
            )));
        }

        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(tx.old_battery_id, BatteryEventType::Swapped)
                    .values(BatteryStatus::PendingOut.as_str(), old_next.as_str())
                    .at_station(tx.station_id)
                    .by(staff_id)
                    .with_notes(format!("swap {}", tx.reference))
                    .soh(degradation.new_soh),
            )
            .await?;
        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(incoming, BatteryEventType::Swapped)
                    .values(
                        BatteryStatus::PendingIn.as_str(),
                        BatteryStatus::InUse.as_str(),
                    )
                    .on_vehicle(tx.vehicle_id)
                    .by(staff_id)
                    .with_notes(format!("swap {}", tx.reference)),
            )
            .await?;

        if let Some(reservation_id) = tx.reservation_id {
            if !self
                .repos
                .reservations()
                .mark_used(reservation_id, tx_id, now)
                .await?
            {
                warn!(reservation_id, "Reservation already closed before swap confirmation");
            }
        }

        self.apply_swap_count_rule(tx.old_battery_id, old_next).await?;

        metrics::counter!("swaps_confirmed_total").increment(1);
        info!(swap_id = tx_id, staff_id, "Swap confirmed");

        self.get(tx_id).await
    }

    /// Batteries swapped past the threshold go to maintenance even when
    /// their SoH still reads fine.
    async fn apply_swap_count_rule(
        &self,
        battery_id: i64,
        current: BatteryStatus,
    ) -> DomainResult<()> {
        if current != BatteryStatus::Available {
            return Ok(());
        }
        let swaps = self.repos.battery_events().count_swaps(battery_id).await?;
        if swaps <= self.policy.swap_count_threshold {
            return Ok(());
        }
        let moved = self
            .repos
            .batteries()
            .transition_status(battery_id, BatteryStatus::Available, BatteryStatus::Maintenance)
            .await?;
        if moved {
            self.repos
                .battery_events()
                .append(
                    BatteryEvent::new(battery_id, BatteryEventType::MaintenanceIn)
                        .values(
                            BatteryStatus::Available.as_str(),
                            BatteryStatus::Maintenance.as_str(),
                        )
                        .with_notes(format!("swap count {swaps} over threshold")),
                )
                .await?;
            info!(battery_id, swaps, "Battery forced into maintenance by swap count");
        }
        Ok(())
    }

    // ── Rejection ──────────────────────────────────────────────

    /// Staff rejects the exchange: the outgoing battery goes back on
    /// the vehicle, the staged one returns to open inventory.
    pub async fn reject_swap(&self, tx_id: i64, staff_id: i64) -> DomainResult<SwapTransaction> {
        let tx = self.get(tx_id).await?;
        if !tx.is_pending() {
            return Err(DomainError::InvalidState(format!(
                "swap {tx_id} already processed ({})",
                tx.status
            )));
        }

        let won = self
            .repos
            .swaps()
            .resolve(tx_id, SwapStatus::Rejected, staff_id, Utc::now())
            .await?;
        if !won {
            return Err(DomainError::InvalidState(format!(
                "swap {tx_id} already processed"
            )));
        }

        self.unstage_outgoing(tx.old_battery_id).await;

        let staged = match tx.new_battery_id {
            Some(id) => Some(id),
            None => self
                .repos
                .batteries()
                .find_first_at_station_with_status(tx.station_id, BatteryStatus::PendingIn)
                .await?
                .map(|b| b.id),
        };
        if let Some(id) = staged {
            self.unstage_incoming(id, tx.reservation_id).await;
        }

        info!(swap_id = tx_id, staff_id, "Swap rejected");
        self.get(tx_id).await
    }

    // ── Self-service path ──────────────────────────────────────

    /// Self-service kiosks skip the staff gate: the same staging and
    /// confirmation run back-to-back in one call.
    pub async fn execute_self_swap(
        &self,
        user_id: i64,
        vehicle_id: i64,
        station_id: i64,
        start_percent: f64,
        end_percent: f64,
    ) -> DomainResult<SwapTransaction> {
        let tx = self
            .request_swap(user_id, vehicle_id, station_id, start_percent, end_percent)
            .await?;
        self.confirm_swap(tx.id, user_id).await
    }

    pub async fn get(&self, tx_id: i64) -> DomainResult<SwapTransaction> {
        self.repos
            .swaps()
            .find_by_id(tx_id)
            .await?
            .ok_or_else(|| DomainError::not_found("SwapTransaction", "id", tx_id))
    }

    /// The vehicle's swap history, most recent first.
    pub async fn list_for_vehicle(
        &self,
        user_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<Vec<SwapTransaction>> {
        if !self
            .vehicles
            .vehicle_belongs_to_user(user_id, vehicle_id)
            .await?
        {
            return Err(DomainError::Forbidden(format!(
                "vehicle {vehicle_id} does not belong to user {user_id}"
            )));
        }
        self.repos.swaps().list_for_vehicle(vehicle_id).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::{Reservation, Station};
    use crate::infrastructure::storage::memory::{
        InMemoryRepositoryProvider, StaticVehicleDirectory,
    };

    const USER: i64 = 1;
    const STAFF: i64 = 50;
    const VEHICLE: i64 = 10;

    struct Harness {
        repos: Arc<InMemoryRepositoryProvider>,
        workflow: SwapWorkflow,
        station_id: i64,
        mounted_id: i64,
    }

    /// One battery mounted on the vehicle, one Available at the station.
    async fn setup() -> Harness {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let station = repos
            .stations()
            .insert(Station::new("S1", "1 Main St"))
            .await
            .unwrap();

        let mounted = repos
            .batteries()
            .insert(Battery::provision("BAT-OLD", station.id, 2000.0))
            .await
            .unwrap();
        repos
            .batteries()
            .transition_to_vehicle(
                mounted.id,
                BatteryStatus::Available,
                BatteryStatus::InUse,
                VEHICLE,
            )
            .await
            .unwrap();

        repos
            .batteries()
            .insert(Battery::provision("BAT-NEW", station.id, 2000.0))
            .await
            .unwrap();

        let vehicles = Arc::new(StaticVehicleDirectory::new());
        vehicles.assign(VEHICLE, USER);

        let workflow = SwapWorkflow::new(
            repos.clone() as Arc<dyn RepositoryProvider>,
            vehicles,
            SwapPolicy::default(),
        );
        Harness {
            repos,
            workflow,
            station_id: station.id,
            mounted_id: mounted.id,
        }
    }

    async fn battery(h: &Harness, serial: &str) -> Battery {
        h.repos
            .batteries()
            .find_by_serial(serial)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn request_stages_both_batteries_and_prices_the_energy() {
        let h = setup().await;
        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();

        assert_eq!(tx.status, SwapStatus::PendingConfirm);
        assert_eq!(battery(&h, "BAT-OLD").await.status, BatteryStatus::PendingOut);
        assert_eq!(battery(&h, "BAT-NEW").await.status, BatteryStatus::PendingIn);
        // 60% depth of a 2000 Wh pack
        assert!((tx.energy_kwh - 1.2).abs() < 1e-9);
        assert_eq!(tx.cost, Decimal::new(4200, 0));
    }

    #[tokio::test]
    async fn request_rejects_end_charge_not_below_start() {
        let h = setup().await;
        let err = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 40.0, 40.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        // Nothing staged
        assert_eq!(battery(&h, "BAT-OLD").await.status, BatteryStatus::InUse);
    }

    #[tokio::test]
    async fn out_of_range_percents_stage_nothing() {
        let h = setup().await;
        let err = h
            .workflow
            .execute_self_swap(USER, VEHICLE, h.station_id, 100.0, -20.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let err = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 120.0, 40.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        // Charge and statuses untouched
        let old = battery(&h, "BAT-OLD").await;
        assert_eq!(old.status, BatteryStatus::InUse);
        assert_eq!(old.charge_percent, 100.0);
        assert_eq!(battery(&h, "BAT-NEW").await.status, BatteryStatus::Available);
    }

    #[tokio::test]
    async fn request_without_inventory_unstages_the_outgoing_battery() {
        let h = setup().await;
        // Remove the only replacement
        let spare = battery(&h, "BAT-NEW").await;
        h.repos
            .batteries()
            .transition_status(spare.id, BatteryStatus::Available, BatteryStatus::Maintenance)
            .await
            .unwrap();

        let err = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientInventory { .. }));
        assert_eq!(battery(&h, "BAT-OLD").await.status, BatteryStatus::InUse);
    }

    #[tokio::test]
    async fn confirm_applies_wear_and_rehomes_both_batteries() {
        let h = setup().await;
        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        let confirmed = h.workflow.confirm_swap(tx.id, STAFF).await.unwrap();
        assert_eq!(confirmed.status, SwapStatus::Completed);
        assert_eq!(confirmed.confirmed_by, Some(STAFF));
        assert!(confirmed.processed_at.is_some());

        // 60% depth, wear factor 0.75: 100 - 0.45
        let old = battery(&h, "BAT-OLD").await;
        assert_eq!(old.status, BatteryStatus::Available);
        assert_eq!(old.station_id, Some(h.station_id));
        assert_eq!(old.vehicle_id, None);
        assert!((old.soh_percent - 99.55).abs() < 1e-9);
        assert!((old.charge_percent - 40.0).abs() < 1e-9);
        assert!((old.cycle_count - 0.6).abs() < 1e-9);
        assert!((old.current_capacity_wh - 2000.0 * 99.55 / 100.0).abs() < 1e-6);

        let new = battery(&h, "BAT-NEW").await;
        assert_eq!(new.status, BatteryStatus::InUse);
        assert_eq!(new.vehicle_id, Some(VEHICLE));
        assert_eq!(new.station_id, None);

        // Both sides of the exchange are in the history log
        assert_eq!(
            h.repos.battery_events().count_swaps(old.id).await.unwrap(),
            1
        );
        assert_eq!(
            h.repos.battery_events().count_swaps(new.id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn deep_discharge_on_worn_battery_lands_in_maintenance() {
        let h = setup().await;
        let mut old = battery(&h, "BAT-OLD").await;
        old.soh_percent = 80.5;
        h.repos.batteries().update(old).await.unwrap();

        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 0.0)
            .await
            .unwrap();
        h.workflow.confirm_swap(tx.id, STAFF).await.unwrap();

        let old = battery(&h, "BAT-OLD").await;
        // Full cycle at 0.75 wear: 80.5 - 0.75 = 79.75, under the floor
        assert!((old.soh_percent - 79.75).abs() < 1e-9);
        assert_eq!(old.status, BatteryStatus::Maintenance);
    }

    #[tokio::test]
    async fn second_confirm_or_reject_gets_invalid_state() {
        let h = setup().await;
        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        h.workflow.confirm_swap(tx.id, STAFF).await.unwrap();

        let err = h.workflow.confirm_swap(tx.id, STAFF).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        let err = h.workflow.reject_swap(tx.id, STAFF).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn reject_restores_the_pre_swap_picture() {
        let h = setup().await;
        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        let rejected = h.workflow.reject_swap(tx.id, STAFF).await.unwrap();
        assert_eq!(rejected.status, SwapStatus::Rejected);

        let old = battery(&h, "BAT-OLD").await;
        assert_eq!(old.status, BatteryStatus::InUse);
        assert_eq!(old.vehicle_id, Some(VEHICLE));
        // Wear is only applied on confirmation
        assert_eq!(old.soh_percent, 100.0);

        assert_eq!(battery(&h, "BAT-NEW").await.status, BatteryStatus::Available);
    }

    #[tokio::test]
    async fn reserved_battery_is_preferred_and_reservation_consumed() {
        let h = setup().await;
        // A better-charged open unit that must NOT win over the
        // reserved one
        h.repos
            .batteries()
            .insert(Battery::provision("BAT-OPEN", h.station_id, 2000.0))
            .await
            .unwrap();

        let reserved = battery(&h, "BAT-NEW").await;
        h.repos
            .batteries()
            .transition_status(reserved.id, BatteryStatus::Available, BatteryStatus::Reserved)
            .await
            .unwrap();
        let reservation = h
            .repos
            .reservations()
            .insert_with_items(
                Reservation::new(USER, VEHICLE, h.station_id, 1000, 1, 60),
                &[reserved.id],
            )
            .await
            .unwrap();

        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        assert_eq!(tx.new_battery_id, Some(reserved.id));
        assert_eq!(tx.reservation_id, Some(reservation.id));

        h.workflow.confirm_swap(tx.id, STAFF).await.unwrap();

        let r = h
            .repos
            .reservations()
            .find_by_id(reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(r.status, crate::domain::ReservationStatus::Used);
        assert_eq!(r.swap_transaction_id, Some(tx.id));
        assert_eq!(battery(&h, "BAT-OPEN").await.status, BatteryStatus::Available);
    }

    #[tokio::test]
    async fn rejection_returns_reserved_battery_to_its_hold() {
        let h = setup().await;
        let reserved = battery(&h, "BAT-NEW").await;
        h.repos
            .batteries()
            .transition_status(reserved.id, BatteryStatus::Available, BatteryStatus::Reserved)
            .await
            .unwrap();
        let reservation = h
            .repos
            .reservations()
            .insert_with_items(
                Reservation::new(USER, VEHICLE, h.station_id, 1000, 1, 60),
                &[reserved.id],
            )
            .await
            .unwrap();

        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        assert_eq!(tx.reservation_id, Some(reservation.id));
        h.workflow.reject_swap(tx.id, STAFF).await.unwrap();

        // The hold survives the rejection intact: still Reserved, still
        // linked, invisible to other vehicles.
        assert_eq!(battery(&h, "BAT-NEW").await.status, BatteryStatus::Reserved);
        let r = h
            .repos
            .reservations()
            .find_by_id(reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(r.status, crate::domain::ReservationStatus::Active);
        assert!(h
            .repos
            .reservations()
            .battery_is_held(reserved.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn list_for_vehicle_is_owner_only_and_recent_first() {
        let h = setup().await;
        let first = h
            .workflow
            .execute_self_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        // The previous swap left BAT-OLD Available at the station, so a
        // second exchange can run immediately.
        let second = h
            .workflow
            .execute_self_swap(USER, VEHICLE, h.station_id, 90.0, 30.0)
            .await
            .unwrap();

        let swaps = h.workflow.list_for_vehicle(USER, VEHICLE).await.unwrap();
        assert_eq!(swaps.len(), 2);
        assert_eq!(swaps[0].id, second.id);
        assert_eq!(swaps[1].id, first.id);

        let err = h.workflow.list_for_vehicle(2, VEHICLE).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn self_swap_completes_in_one_call() {
        let h = setup().await;
        let tx = h
            .workflow
            .execute_self_swap(USER, VEHICLE, h.station_id, 100.0, 40.0)
            .await
            .unwrap();
        assert_eq!(tx.status, SwapStatus::Completed);
        assert_eq!(tx.confirmed_by, Some(USER));
        assert_eq!(battery(&h, "BAT-NEW").await.status, BatteryStatus::InUse);
        assert_eq!(battery(&h, "BAT-OLD").await.status, BatteryStatus::Available);
    }

    #[tokio::test]
    async fn swap_count_over_threshold_forces_maintenance() {
        let h = setup().await;
        let old = battery(&h, "BAT-OLD").await;
        // Seed the log past the threshold
        for _ in 0..=SwapPolicy::default().swap_count_threshold {
            h.repos
                .battery_events()
                .append(BatteryEvent::new(old.id, BatteryEventType::Swapped))
                .await
                .unwrap();
        }

        let tx = h
            .workflow
            .request_swap(USER, VEHICLE, h.station_id, 100.0, 90.0)
            .await
            .unwrap();
        h.workflow.confirm_swap(tx.id, STAFF).await.unwrap();

        let old = battery(&h, "BAT-OLD").await;
        assert_eq!(old.status, BatteryStatus::Maintenance);
        let history = h
            .repos
            .battery_events()
            .find_for_battery(old.id)
            .await
            .unwrap();
        assert!(history
            .iter()
            .any(|e| e.event_type == BatteryEventType::MaintenanceIn));
    }

    #[tokio::test]
    async fn foreign_vehicle_is_forbidden() {
        let h = setup().await;
        let err = h
            .workflow
            .request_swap(USER, 999, h.station_id, 100.0, 40.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
