//! Battery domain entity and its status state machine.

use chrono::{DateTime, Utc};

use crate::shared::errors::DomainError;

/// Physical battery status.
///
/// Batteries cycle indefinitely; no status is terminal. Every transition
/// must appear in [`BatteryStatus::can_transition`] — callers never flip
/// a status outside that table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryStatus {
    /// Charged and sitting at a station, free to reserve or hand out
    Available,
    /// Held by an active reservation
    Reserved,
    /// Mounted on a vehicle
    InUse,
    /// Coming off a vehicle, waiting for staff confirmation
    PendingOut,
    /// Staged at a station for hand-out, waiting for staff confirmation
    PendingIn,
    /// Physically damaged, unusable until inspected
    Damaged,
    /// Pulled from circulation for service
    Maintenance,
}

impl BatteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::InUse => "InUse",
            Self::PendingOut => "PendingOut",
            Self::PendingIn => "PendingIn",
            Self::Damaged => "Damaged",
            Self::Maintenance => "Maintenance",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Available" => Self::Available,
            "Reserved" => Self::Reserved,
            "InUse" => Self::InUse,
            "PendingOut" => Self::PendingOut,
            "PendingIn" => Self::PendingIn,
            "Damaged" => Self::Damaged,
            _ => Self::Maintenance,
        }
    }

    /// The explicit transition table. Anything not listed here is
    /// rejected, no matter which workflow asks for it.
    pub fn can_transition(&self, next: BatteryStatus) -> bool {
        use BatteryStatus::*;
        matches!(
            (*self, next),
            // Reservation lock / release
            (Available, Reserved)
                | (Reserved, Available)
                // Staff-confirmed swap staging
                | (Available, PendingIn)
                | (Reserved, PendingIn)
                | (InUse, PendingOut)
                // Staff confirmation outcome
                | (PendingOut, Available)
                | (PendingOut, Maintenance)
                | (PendingIn, InUse)
                // Staff rejection restores the pre-swap picture
                | (PendingOut, InUse)
                | (PendingIn, Available)
                | (PendingIn, Reserved)
                // Self-service swap: hand-out and return in one step
                | (Available, InUse)
                | (InUse, Available)
                | (InUse, Maintenance)
                // Service & damage handling
                | (Available, Maintenance)
                | (Maintenance, Available)
                | (Available, Damaged)
                | (Damaged, Maintenance)
        )
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A physical battery unit.
///
/// Exactly one of `station_id` / `vehicle_id` is set, except transiently
/// inside a swap-confirmation transaction.
#[derive(Debug, Clone)]
pub struct Battery {
    pub id: i64,
    /// Manufacturer serial, unique across the fleet
    pub serial_number: String,
    pub status: BatteryStatus,
    /// Charge percent, 0..=100
    pub charge_percent: f64,
    /// State of health percent, 0..=100
    pub soh_percent: f64,
    /// Cumulative equivalent-full-cycle count
    pub cycle_count: f64,
    pub current_capacity_wh: f64,
    pub initial_capacity_wh: f64,
    pub station_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Battery {
    /// A freshly provisioned battery: full charge, full health,
    /// parked at its commissioning station.
    pub fn provision(serial_number: impl Into<String>, station_id: i64, capacity_wh: f64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            serial_number: serial_number.into(),
            status: BatteryStatus::Available,
            charge_percent: 100.0,
            soh_percent: 100.0,
            cycle_count: 0.0,
            current_capacity_wh: capacity_wh,
            initial_capacity_wh: capacity_wh,
            station_id: Some(station_id),
            vehicle_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BatteryStatus::Available
    }

    /// Apply a status transition, enforcing the transition table.
    pub fn transition(&mut self, next: BatteryStatus) -> Result<(), DomainError> {
        if !self.status.can_transition(next) {
            return Err(DomainError::InvalidState(format!(
                "battery {} cannot go {} -> {}",
                self.serial_number, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move the battery onto a vehicle, clearing the station link.
    pub fn attach_to_vehicle(&mut self, vehicle_id: i64) {
        self.vehicle_id = Some(vehicle_id);
        self.station_id = None;
        self.updated_at = Utc::now();
    }

    /// Park the battery at a station, clearing the vehicle link.
    pub fn place_at_station(&mut self, station_id: i64) {
        self.station_id = Some(station_id);
        self.vehicle_id = None;
        self.updated_at = Utc::now();
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_battery() -> Battery {
        Battery::provision("BAT-001", 1, 2000.0)
    }

    #[test]
    fn provisioned_battery_is_available_at_station() {
        let b = sample_battery();
        assert!(b.is_available());
        assert_eq!(b.charge_percent, 100.0);
        assert_eq!(b.soh_percent, 100.0);
        assert_eq!(b.cycle_count, 0.0);
        assert_eq!(b.station_id, Some(1));
        assert_eq!(b.vehicle_id, None);
    }

    #[test]
    fn reserve_and_release_cycle() {
        let mut b = sample_battery();
        b.transition(BatteryStatus::Reserved).unwrap();
        assert_eq!(b.status, BatteryStatus::Reserved);
        b.transition(BatteryStatus::Available).unwrap();
        assert_eq!(b.status, BatteryStatus::Available);
    }

    #[test]
    fn reserved_cannot_go_directly_in_use() {
        let mut b = sample_battery();
        b.transition(BatteryStatus::Reserved).unwrap();
        let err = b.transition(BatteryStatus::InUse).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        // Status untouched after a rejected transition
        assert_eq!(b.status, BatteryStatus::Reserved);
    }

    #[test]
    fn staff_swap_staging_transitions() {
        let mut outgoing = sample_battery();
        outgoing.transition(BatteryStatus::InUse).unwrap();
        outgoing.transition(BatteryStatus::PendingOut).unwrap();
        // Confirm path
        outgoing.transition(BatteryStatus::Available).unwrap();

        let mut incoming = sample_battery();
        incoming.transition(BatteryStatus::PendingIn).unwrap();
        incoming.transition(BatteryStatus::InUse).unwrap();
    }

    #[test]
    fn rejection_restores_pre_swap_statuses() {
        let mut outgoing = sample_battery();
        outgoing.transition(BatteryStatus::InUse).unwrap();
        outgoing.transition(BatteryStatus::PendingOut).unwrap();
        outgoing.transition(BatteryStatus::InUse).unwrap();

        let mut incoming = sample_battery();
        incoming.transition(BatteryStatus::PendingIn).unwrap();
        incoming.transition(BatteryStatus::Available).unwrap();

        // A reservation-held battery goes back to its hold, not to
        // open inventory.
        let mut held = sample_battery();
        held.transition(BatteryStatus::Reserved).unwrap();
        held.transition(BatteryStatus::PendingIn).unwrap();
        held.transition(BatteryStatus::Reserved).unwrap();
    }

    #[test]
    fn maintenance_is_not_reachable_from_reserved() {
        let mut b = sample_battery();
        b.transition(BatteryStatus::Reserved).unwrap();
        assert!(b.transition(BatteryStatus::Maintenance).is_err());
    }

    #[test]
    fn attach_clears_station_place_clears_vehicle() {
        let mut b = sample_battery();
        b.attach_to_vehicle(7);
        assert_eq!(b.vehicle_id, Some(7));
        assert_eq!(b.station_id, None);
        b.place_at_station(2);
        assert_eq!(b.station_id, Some(2));
        assert_eq!(b.vehicle_id, None);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in &[
            BatteryStatus::Available,
            BatteryStatus::Reserved,
            BatteryStatus::InUse,
            BatteryStatus::PendingOut,
            BatteryStatus::PendingIn,
            BatteryStatus::Damaged,
            BatteryStatus::Maintenance,
        ] {
            assert_eq!(&BatteryStatus::from_str(status.as_str()), status);
        }
    }
}
