//! Reservation aggregate
//!
//! Contains the Reservation entity, its item join rows, and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{Reservation, ReservationItem, ReservationStatus};
pub use repository::ReservationRepository;
