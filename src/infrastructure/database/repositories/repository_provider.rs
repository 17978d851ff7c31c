//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::battery::BatteryRepository;
use crate::domain::history::BatteryEventRepository;
use crate::domain::reservation::ReservationRepository;
use crate::domain::station::StationRepository;
use crate::domain::swap::SwapRepository;
use crate::domain::RepositoryProvider;

use super::battery_event_repository::SeaOrmBatteryEventRepository;
use super::battery_repository::SeaOrmBatteryRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::station_repository::SeaOrmStationRepository;
use super::swap_repository::SeaOrmSwapRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository
/// accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let battery = repos.batteries().find_by_serial("BAT-001").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    batteries: SeaOrmBatteryRepository,
    reservations: SeaOrmReservationRepository,
    stations: SeaOrmStationRepository,
    swaps: SeaOrmSwapRepository,
    battery_events: SeaOrmBatteryEventRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            batteries: SeaOrmBatteryRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            stations: SeaOrmStationRepository::new(db.clone()),
            swaps: SeaOrmSwapRepository::new(db.clone()),
            battery_events: SeaOrmBatteryEventRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn batteries(&self) -> &dyn BatteryRepository {
        &self.batteries
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn swaps(&self) -> &dyn SwapRepository {
        &self.swaps
    }

    fn battery_events(&self) -> &dyn BatteryEventRepository {
        &self.battery_events
    }
}
