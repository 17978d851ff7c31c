//! SeaORM repository implementations

pub mod battery_event_repository;
pub mod battery_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod station_repository;
pub mod swap_repository;

pub use battery_event_repository::SeaOrmBatteryEventRepository;
pub use battery_repository::SeaOrmBatteryRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use reservation_repository::SeaOrmReservationRepository;
pub use station_repository::SeaOrmStationRepository;
pub use swap_repository::SeaOrmSwapRepository;
