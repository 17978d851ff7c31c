//! Reservation domain entity

use chrono::{DateTime, Duration, Utc};

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Holding batteries, waiting to be used at the station
    Active,
    /// Fulfilled by a swap transaction
    Used,
    /// Auto-expired by the background sweep
    Expired,
    /// Cancelled by the user
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Used => "Used",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Active" => Self::Active,
            "Used" => Self::Used,
            "Expired" => Self::Expired,
            _ => Self::Cancelled,
        }
    }

    /// Used, Expired and Cancelled are final.
    pub fn is_terminal(&self) -> bool {
        *self != Self::Active
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time-bounded hold on a set of batteries at one station.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    /// At most one Active reservation exists per vehicle.
    pub vehicle_id: i64,
    pub station_id: i64,
    /// Subscription used for quota validation at creation time.
    pub subscription_id: i64,
    pub status: ReservationStatus,
    pub quantity: u32,
    pub reserved_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    /// Set when the reservation is consumed by a swap.
    pub swap_transaction_id: Option<i64>,
}

impl Reservation {
    pub fn new(
        user_id: i64,
        vehicle_id: i64,
        station_id: i64,
        subscription_id: i64,
        quantity: u32,
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            vehicle_id,
            station_id,
            subscription_id,
            status: ReservationStatus::Active,
            quantity,
            reserved_at: now,
            expire_at: now + Duration::minutes(ttl_minutes),
            used_at: None,
            cancelled_at: None,
            cancel_reason: None,
            swap_transaction_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expire_at < now
    }

    /// Countdown shown to the user, floored at zero.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.expire_at - now).num_minutes().max(0)
    }
}

/// Join row holding one physical battery for one reservation.
#[derive(Debug, Clone)]
pub struct ReservationItem {
    pub id: i64,
    pub reservation_id: i64,
    pub battery_id: i64,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reservation() -> Reservation {
        Reservation::new(1, 10, 100, 1000, 2, 60)
    }

    #[test]
    fn new_reservation_is_active_for_one_hour() {
        let r = sample_reservation();
        assert!(r.is_active());
        assert_eq!(r.expire_at - r.reserved_at, Duration::minutes(60));
        assert_eq!(r.quantity, 2);
    }

    #[test]
    fn overdue_only_when_active_and_past_expiry() {
        let mut r = sample_reservation();
        let past = r.expire_at + Duration::seconds(1);
        assert!(r.is_overdue(past));
        assert!(!r.is_overdue(r.reserved_at));

        r.status = ReservationStatus::Cancelled;
        assert!(!r.is_overdue(past));
    }

    #[test]
    fn remaining_minutes_floors_at_zero() {
        let r = sample_reservation();
        assert_eq!(r.remaining_minutes(r.reserved_at), 60);
        assert_eq!(r.remaining_minutes(r.expire_at + Duration::hours(2)), 0);
    }

    #[test]
    fn terminal_statuses_are_final() {
        assert!(!ReservationStatus::Active.is_terminal());
        assert!(ReservationStatus::Used.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in &[
            ReservationStatus::Active,
            ReservationStatus::Used,
            ReservationStatus::Expired,
            ReservationStatus::Cancelled,
        ] {
            assert_eq!(&ReservationStatus::from_str(status.as_str()), status);
        }
    }
}
