//! In-memory storage implementations

pub mod memory;

pub use memory::{InMemoryRepositoryProvider, StaticSubscriptionDirectory, StaticVehicleDirectory};
