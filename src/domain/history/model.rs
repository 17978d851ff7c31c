//! Append-only battery event log.

use chrono::{DateTime, Utc};

/// What happened to a battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryEventType {
    Provisioned,
    Reserved,
    Released,
    Swapped,
    Transferred,
    SohAdjusted,
    ChargeUpdated,
    MaintenanceIn,
    MaintenanceOut,
    Retired,
}

impl BatteryEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioned => "Provisioned",
            Self::Reserved => "Reserved",
            Self::Released => "Released",
            Self::Swapped => "Swapped",
            Self::Transferred => "Transferred",
            Self::SohAdjusted => "SohAdjusted",
            Self::ChargeUpdated => "ChargeUpdated",
            Self::MaintenanceIn => "MaintenanceIn",
            Self::MaintenanceOut => "MaintenanceOut",
            Self::Retired => "Retired",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Provisioned" => Self::Provisioned,
            "Reserved" => Self::Reserved,
            "Released" => Self::Released,
            "Swapped" => Self::Swapped,
            "Transferred" => Self::Transferred,
            "SohAdjusted" => Self::SohAdjusted,
            "ChargeUpdated" => Self::ChargeUpdated,
            "MaintenanceIn" => Self::MaintenanceIn,
            "MaintenanceOut" => Self::MaintenanceOut,
            _ => Self::Retired,
        }
    }
}

impl std::fmt::Display for BatteryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit entry. Rows are never updated or deleted; they outlive the
/// battery itself.
#[derive(Debug, Clone)]
pub struct BatteryEvent {
    pub id: i64,
    pub battery_id: i64,
    pub event_type: BatteryEventType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub station_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub actor_user_id: Option<i64>,
    pub notes: Option<String>,
    pub soh_snapshot: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl BatteryEvent {
    pub fn new(battery_id: i64, event_type: BatteryEventType) -> Self {
        Self {
            id: 0,
            battery_id,
            event_type,
            old_value: None,
            new_value: None,
            station_id: None,
            vehicle_id: None,
            actor_user_id: None,
            notes: None,
            soh_snapshot: None,
            created_at: Utc::now(),
        }
    }

    pub fn values(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_value = Some(old.into());
        self.new_value = Some(new.into());
        self
    }

    pub fn at_station(mut self, station_id: i64) -> Self {
        self.station_id = Some(station_id);
        self
    }

    pub fn on_vehicle(mut self, vehicle_id: i64) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    pub fn by(mut self, user_id: i64) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn soh(mut self, soh: f64) -> Self {
        self.soh_snapshot = Some(soh);
        self
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_optional_fields() {
        let e = BatteryEvent::new(5, BatteryEventType::Transferred)
            .values("1", "2")
            .at_station(2)
            .by(99)
            .with_notes("rebalancing")
            .soh(91.5);
        assert_eq!(e.battery_id, 5);
        assert_eq!(e.old_value.as_deref(), Some("1"));
        assert_eq!(e.new_value.as_deref(), Some("2"));
        assert_eq!(e.station_id, Some(2));
        assert_eq!(e.actor_user_id, Some(99));
        assert_eq!(e.soh_snapshot, Some(91.5));
    }

    #[test]
    fn event_type_string_roundtrip() {
        for t in &[
            BatteryEventType::Provisioned,
            BatteryEventType::Reserved,
            BatteryEventType::Released,
            BatteryEventType::Swapped,
            BatteryEventType::Transferred,
            BatteryEventType::SohAdjusted,
            BatteryEventType::ChargeUpdated,
            BatteryEventType::MaintenanceIn,
            BatteryEventType::MaintenanceOut,
            BatteryEventType::Retired,
        ] {
            assert_eq!(&BatteryEventType::from_str(t.as_str()), t);
        }
    }
}
