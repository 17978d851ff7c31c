//! Battery registry: authoritative status transitions and queries.
//!
//! Every mutation goes through this service so that each one appends a
//! history entry. Nothing else flips a battery's status.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    Battery, BatteryEvent, BatteryEventType, BatteryStatus, DomainResult, RepositoryProvider,
};
use crate::shared::errors::DomainError;

/// Service for battery lifecycle operations.
pub struct BatteryRegistry {
    repos: Arc<dyn RepositoryProvider>,
}

impl BatteryRegistry {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Admin provisioning of a new physical unit by serial number.
    pub async fn provision(
        &self,
        serial: &str,
        station_id: i64,
        capacity_wh: f64,
        admin_id: i64,
    ) -> DomainResult<Battery> {
        if self.repos.stations().find_by_id(station_id).await?.is_none() {
            return Err(DomainError::not_found("Station", "id", station_id));
        }
        if self.repos.batteries().find_by_serial(serial).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "battery serial {serial} already provisioned"
            )));
        }

        let battery = self
            .repos
            .batteries()
            .insert(Battery::provision(serial, station_id, capacity_wh))
            .await?;

        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery.id, BatteryEventType::Provisioned)
                    .values("", BatteryStatus::Available.as_str())
                    .at_station(station_id)
                    .by(admin_id)
                    .soh(battery.soh_percent),
            )
            .await?;

        info!(serial, station_id, "Battery provisioned");
        Ok(battery)
    }

    pub async fn get(&self, id: i64) -> DomainResult<Battery> {
        self.repos
            .batteries()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Battery", "id", id))
    }

    pub async fn list_at_station(&self, station_id: i64) -> DomainResult<Vec<Battery>> {
        self.repos.batteries().find_at_station(station_id).await
    }

    pub async fn history(&self, battery_id: i64) -> DomainResult<Vec<BatteryEvent>> {
        self.repos.battery_events().find_for_battery(battery_id).await
    }

    /// Conditional Available -> Reserved lock for a reservation.
    /// Returns false when the battery was grabbed concurrently.
    pub async fn lock_for_reservation(&self, battery_id: i64, user_id: i64) -> DomainResult<bool> {
        let won = self
            .repos
            .batteries()
            .transition_status(battery_id, BatteryStatus::Available, BatteryStatus::Reserved)
            .await?;
        if won {
            self.repos
                .battery_events()
                .append(
                    BatteryEvent::new(battery_id, BatteryEventType::Reserved)
                        .values(
                            BatteryStatus::Available.as_str(),
                            BatteryStatus::Reserved.as_str(),
                        )
                        .by(user_id),
                )
                .await?;
        }
        Ok(won)
    }

    /// Conditional Reserved -> Available release on cancel or expiry.
    pub async fn release_from_reservation(
        &self,
        battery_id: i64,
        actor_user_id: Option<i64>,
        notes: &str,
    ) -> DomainResult<bool> {
        let won = self
            .repos
            .batteries()
            .transition_status(battery_id, BatteryStatus::Reserved, BatteryStatus::Available)
            .await?;
        if won {
            let mut event = BatteryEvent::new(battery_id, BatteryEventType::Released)
                .values(
                    BatteryStatus::Reserved.as_str(),
                    BatteryStatus::Available.as_str(),
                )
                .with_notes(notes);
            if let Some(actor) = actor_user_id {
                event = event.by(actor);
            }
            self.repos.battery_events().append(event).await?;
        } else {
            warn!(battery_id, "Release skipped: battery no longer Reserved");
        }
        Ok(won)
    }

    /// Staff pulls a battery from circulation.
    pub async fn send_to_maintenance(
        &self,
        battery_id: i64,
        staff_id: i64,
        notes: &str,
    ) -> DomainResult<()> {
        let battery = self.get(battery_id).await?;
        if !battery.status.can_transition(BatteryStatus::Maintenance) {
            return Err(DomainError::InvalidState(format!(
                "battery {} cannot enter maintenance from {}",
                battery.serial_number, battery.status
            )));
        }
        let won = self
            .repos
            .batteries()
            .transition_status(battery_id, battery.status, BatteryStatus::Maintenance)
            .await?;
        if !won {
            return Err(DomainError::Conflict(
                "battery status changed concurrently".into(),
            ));
        }
        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery_id, BatteryEventType::MaintenanceIn)
                    .values(battery.status.as_str(), BatteryStatus::Maintenance.as_str())
                    .by(staff_id)
                    .with_notes(notes)
                    .soh(battery.soh_percent),
            )
            .await?;
        info!(battery_id, staff_id, "Battery sent to maintenance");
        Ok(())
    }

    /// Staff returns a serviced battery to circulation.
    pub async fn return_to_service(&self, battery_id: i64, staff_id: i64) -> DomainResult<()> {
        let battery = self.get(battery_id).await?;
        let won = self
            .repos
            .batteries()
            .transition_status(
                battery_id,
                BatteryStatus::Maintenance,
                BatteryStatus::Available,
            )
            .await?;
        if !won {
            return Err(DomainError::InvalidState(format!(
                "battery {} is not in maintenance",
                battery.serial_number
            )));
        }
        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery_id, BatteryEventType::MaintenanceOut)
                    .values(
                        BatteryStatus::Maintenance.as_str(),
                        BatteryStatus::Available.as_str(),
                    )
                    .by(staff_id)
                    .soh(battery.soh_percent),
            )
            .await?;
        Ok(())
    }

    /// Admin correction of a drifted SoH reading.
    pub async fn adjust_soh(
        &self,
        battery_id: i64,
        new_soh: f64,
        admin_id: i64,
        notes: &str,
    ) -> DomainResult<Battery> {
        if !(0.0..=100.0).contains(&new_soh) {
            return Err(DomainError::InvalidInput(format!(
                "SoH {new_soh} outside 0..=100"
            )));
        }
        let mut battery = self.get(battery_id).await?;
        let old_soh = battery.soh_percent;
        battery.soh_percent = new_soh;
        self.repos.batteries().update(battery.clone()).await?;

        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery_id, BatteryEventType::SohAdjusted)
                    .values(format!("{old_soh}"), format!("{new_soh}"))
                    .by(admin_id)
                    .with_notes(notes)
                    .soh(new_soh),
            )
            .await?;
        Ok(battery)
    }

    /// Staff charge reading after topping a battery up.
    pub async fn update_charge(
        &self,
        battery_id: i64,
        charge_percent: f64,
        staff_id: i64,
    ) -> DomainResult<Battery> {
        if !(0.0..=100.0).contains(&charge_percent) {
            return Err(DomainError::InvalidInput(format!(
                "charge {charge_percent} outside 0..=100"
            )));
        }
        let mut battery = self.get(battery_id).await?;
        let old = battery.charge_percent;
        battery.charge_percent = charge_percent;
        self.repos.batteries().update(battery.clone()).await?;

        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery_id, BatteryEventType::ChargeUpdated)
                    .values(format!("{old}"), format!("{charge_percent}"))
                    .by(staff_id),
            )
            .await?;
        Ok(battery)
    }

    /// Terminal administrative delete. Only idle batteries can go; the
    /// event log keeps its rows.
    pub async fn retire(&self, battery_id: i64, admin_id: i64) -> DomainResult<()> {
        let battery = self.get(battery_id).await?;
        match battery.status {
            BatteryStatus::Available | BatteryStatus::Damaged | BatteryStatus::Maintenance => {}
            other => {
                return Err(DomainError::InvalidState(format!(
                    "battery {} is {other}, only idle batteries can be retired",
                    battery.serial_number
                )))
            }
        }
        if self.repos.reservations().battery_is_held(battery_id).await? {
            return Err(DomainError::InvalidState(format!(
                "battery {} is held by an active reservation",
                battery.serial_number
            )));
        }

        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery_id, BatteryEventType::Retired)
                    .values(battery.status.as_str(), "")
                    .by(admin_id)
                    .soh(battery.soh_percent),
            )
            .await?;
        self.repos.batteries().delete(battery_id).await?;
        info!(battery_id, serial = %battery.serial_number, "Battery retired");
        Ok(())
    }

    /// Swapped-event count from the append-only log.
    pub async fn swap_count(&self, battery_id: i64) -> DomainResult<u64> {
        self.repos.battery_events().count_swaps(battery_id).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;

    async fn setup() -> (Arc<InMemoryRepositoryProvider>, BatteryRegistry, i64) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let station = repos
            .stations()
            .insert(crate::domain::Station::new("S1", "1 Main St"))
            .await
            .unwrap();
        let registry = BatteryRegistry::new(repos.clone() as Arc<dyn RepositoryProvider>);
        (repos, registry, station.id)
    }

    #[tokio::test]
    async fn provision_rejects_duplicate_serial() {
        let (_repos, registry, station) = setup().await;
        registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();
        let err = registry
            .provision("BAT-001", station, 2000.0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn provision_records_history() {
        let (_repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();
        let history = registry.history(b.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_type, BatteryEventType::Provisioned);
        assert_eq!(history[0].actor_user_id, Some(1));
    }

    #[tokio::test]
    async fn lock_then_release_roundtrip() {
        let (_repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();

        assert!(registry.lock_for_reservation(b.id, 7).await.unwrap());
        // Second lock loses the race
        assert!(!registry.lock_for_reservation(b.id, 8).await.unwrap());

        assert!(registry
            .release_from_reservation(b.id, Some(7), "cancelled")
            .await
            .unwrap());
        assert_eq!(registry.get(b.id).await.unwrap().status, BatteryStatus::Available);
    }

    #[tokio::test]
    async fn release_of_unreserved_battery_is_noop() {
        let (_repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();
        assert!(!registry
            .release_from_reservation(b.id, None, "sweep")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn maintenance_cycle_appends_events() {
        let (_repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();

        registry.send_to_maintenance(b.id, 2, "annual check").await.unwrap();
        assert_eq!(
            registry.get(b.id).await.unwrap().status,
            BatteryStatus::Maintenance
        );
        registry.return_to_service(b.id, 2).await.unwrap();
        assert_eq!(
            registry.get(b.id).await.unwrap().status,
            BatteryStatus::Available
        );

        let kinds: Vec<_> = registry
            .history(b.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert!(kinds.contains(&BatteryEventType::MaintenanceIn));
        assert!(kinds.contains(&BatteryEventType::MaintenanceOut));
    }

    #[tokio::test]
    async fn reserved_battery_cannot_enter_maintenance() {
        let (_repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();
        registry.lock_for_reservation(b.id, 7).await.unwrap();
        let err = registry.send_to_maintenance(b.id, 2, "x").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn adjust_soh_validates_range_and_logs() {
        let (_repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();

        assert!(registry.adjust_soh(b.id, 120.0, 1, "typo").await.is_err());

        let updated = registry.adjust_soh(b.id, 92.5, 1, "recalibrated").await.unwrap();
        assert_eq!(updated.soh_percent, 92.5);
        let history = registry.history(b.id).await.unwrap();
        assert!(history
            .iter()
            .any(|e| e.event_type == BatteryEventType::SohAdjusted));
    }

    #[tokio::test]
    async fn retire_refuses_locked_battery_and_keeps_history() {
        let (repos, registry, station) = setup().await;
        let b = registry.provision("BAT-001", station, 2000.0, 1).await.unwrap();

        registry.lock_for_reservation(b.id, 7).await.unwrap();
        assert!(registry.retire(b.id, 1).await.is_err());
        registry.release_from_reservation(b.id, Some(7), "done").await.unwrap();

        registry.retire(b.id, 1).await.unwrap();
        assert!(repos.batteries().find_by_id(b.id).await.unwrap().is_none());
        // History survives the delete
        assert!(!registry.history(b.id).await.unwrap().is_empty());
    }
}
