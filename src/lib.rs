//! # VoltSwap Station Service
//!
//! Battery swap-station system: battery fleet lifecycle, timed
//! reservations with automatic expiry, reputation-gated booking and
//! staff-confirmed swap transactions.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, state machines and repository traits
//! - **application**: Services implementing the reservation, swap and
//!   transfer workflows, plus outbound ports to collaborators
//! - **infrastructure**: SeaORM persistence, migrations, in-memory storage
//! - **shared**: Error taxonomy and shutdown coordination

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

// Re-export the shutdown primitives used by the binary and tests
pub use shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
