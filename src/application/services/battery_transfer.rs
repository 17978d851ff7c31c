//! Admin-initiated battery relocation between stations.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    Battery, BatteryEvent, BatteryEventType, BatteryStatus, DomainResult, RepositoryProvider,
};
use crate::shared::errors::DomainError;

pub struct BatteryTransfer {
    repos: Arc<dyn RepositoryProvider>,
}

impl BatteryTransfer {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Move an Available battery from one station to another. The
    /// station move is a conditional update keyed on Available, so a
    /// reservation racing this transfer cannot strand a locked battery
    /// at the wrong station.
    pub async fn transfer(
        &self,
        battery_id: i64,
        from_station_id: i64,
        to_station_id: i64,
        admin_id: i64,
        notes: Option<&str>,
    ) -> DomainResult<Battery> {
        if from_station_id == to_station_id {
            return Err(DomainError::InvalidInput(
                "source and destination stations are the same".into(),
            ));
        }

        let battery = self
            .repos
            .batteries()
            .find_by_id(battery_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Battery", "id", battery_id))?;

        if battery.status != BatteryStatus::Available {
            return Err(DomainError::InvalidState(format!(
                "battery {} is {}, only Available batteries can be transferred",
                battery.serial_number, battery.status
            )));
        }
        if battery.station_id != Some(from_station_id) {
            return Err(DomainError::Mismatch(format!(
                "battery {} is not at station {from_station_id}",
                battery.serial_number
            )));
        }
        if self
            .repos
            .stations()
            .find_by_id(to_station_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Station", "id", to_station_id));
        }

        let moved = self
            .repos
            .batteries()
            .transition_to_station(
                battery_id,
                BatteryStatus::Available,
                BatteryStatus::Available,
                to_station_id,
            )
            .await?;
        if !moved {
            return Err(DomainError::Conflict(format!(
                "battery {} was locked while the transfer was in flight",
                battery.serial_number
            )));
        }

        self.repos
            .battery_events()
            .append(
                BatteryEvent::new(battery_id, BatteryEventType::Transferred)
                    .values(from_station_id.to_string(), to_station_id.to_string())
                    .at_station(to_station_id)
                    .by(admin_id)
                    .with_notes(notes.unwrap_or("inventory rebalancing"))
                    .soh(battery.soh_percent),
            )
            .await?;

        info!(
            battery_id,
            from_station_id, to_station_id, admin_id, "Battery transferred"
        );

        self.repos
            .batteries()
            .find_by_id(battery_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Battery", "id", battery_id))
    }
}

// ── Tests ──────────────────────────────────────────────────────
