//! Domain layer: entities, status state machines, and repository
//! interfaces.

pub mod battery;
pub mod history;
pub mod reservation;
pub mod station;
pub mod swap;

use crate::shared::errors::DomainError;

pub use battery::{Battery, BatteryRepository, BatteryStatus};
pub use history::{BatteryEvent, BatteryEventRepository, BatteryEventType};
pub use reservation::{Reservation, ReservationItem, ReservationRepository, ReservationStatus};
pub use station::{Station, StationRepository};
pub use swap::{SwapRepository, SwapStatus, SwapTransaction};

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let battery = repos.batteries().find_by_id(1).await?;
///     let active = repos.reservations().find_active_for_vehicle(7).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn batteries(&self) -> &dyn BatteryRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn stations(&self) -> &dyn StationRepository;
    fn swaps(&self) -> &dyn SwapRepository;
    fn battery_events(&self) -> &dyn BatteryEventRepository;
}
