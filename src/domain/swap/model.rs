//! Swap transaction entity and the battery wear model.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::shared::errors::DomainError;

/// Equivalent-full-cycle wear applied per full discharge.
pub const WEAR_FACTOR: f64 = 0.75;

/// Batteries dropping below this SoH go straight to maintenance.
pub const MAINTENANCE_SOH_FLOOR: f64 = 80.0;

/// Swap transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStatus {
    /// Waiting for station staff to confirm the physical exchange
    PendingConfirm,
    /// Exchange confirmed, batteries re-homed
    Completed,
    /// Exchange rejected, batteries restored
    Rejected,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingConfirm => "PendingConfirm",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PendingConfirm" => Self::PendingConfirm,
            "Completed" => Self::Completed,
            _ => Self::Rejected,
        }
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One physical battery exchange at a station.
#[derive(Debug, Clone)]
pub struct SwapTransaction {
    pub id: i64,
    /// External reference handed to the user
    pub reference: Uuid,
    pub user_id: i64,
    pub vehicle_id: i64,
    pub station_id: i64,
    /// Battery coming off the vehicle
    pub old_battery_id: i64,
    /// Battery staged for hand-out (set when staging succeeded)
    pub new_battery_id: Option<i64>,
    /// Reservation consumed by this swap, if any
    pub reservation_id: Option<i64>,
    pub status: SwapStatus,
    /// Old battery charge at hand-out
    pub start_percent: f64,
    /// Old battery charge at return
    pub end_percent: f64,
    pub energy_kwh: f64,
    pub cost: Decimal,
    pub confirmed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl SwapTransaction {
    pub fn is_pending(&self) -> bool {
        self.status == SwapStatus::PendingConfirm
    }
}

/// Outcome of running the wear model over one discharge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degradation {
    /// Percent points discharged
    pub depth: f64,
    /// Fraction of an equivalent full cycle
    pub cycle_fraction: f64,
    /// SoH points lost
    pub soh_loss: f64,
    pub new_soh: f64,
    /// Whether the battery must go to maintenance instead of Available
    pub needs_maintenance: bool,
}

/// Compute wear for a discharge from `start_percent` down to
/// `end_percent` on a battery currently at `old_soh`.
pub fn compute_degradation(
    start_percent: f64,
    end_percent: f64,
    old_soh: f64,
) -> Result<Degradation, DomainError> {
    if !(0.0..=100.0).contains(&start_percent) || !(0.0..=100.0).contains(&end_percent) {
        return Err(DomainError::InvalidInput(format!(
            "charge percents must be within 0..=100, got start {start_percent} end {end_percent}"
        )));
    }
    if end_percent >= start_percent {
        return Err(DomainError::InvalidInput(format!(
            "end percent {end_percent} must be below start percent {start_percent}"
        )));
    }

    let depth = start_percent - end_percent;
    let cycle_fraction = depth / 100.0;
    let soh_loss = cycle_fraction * WEAR_FACTOR;
    let new_soh = (old_soh - soh_loss).max(0.0);

    Ok(Degradation {
        depth,
        cycle_fraction,
        soh_loss,
        new_soh,
        needs_maintenance: new_soh < MAINTENANCE_SOH_FLOOR,
    })
}

/// Energy drawn from the battery over the discharge, in kWh.
pub fn energy_used_kwh(depth_percent: f64, design_capacity_wh: f64) -> f64 {
    depth_percent / 100.0 * design_capacity_wh / 1000.0
}

/// Monetary cost of the energy at the configured price per kWh.
pub fn energy_cost(energy_kwh: f64, price_per_kwh: Decimal) -> Decimal {
    Decimal::from_f64(energy_kwh).unwrap_or_default() * price_per_kwh
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sixty_percent_discharge_on_healthy_battery() {
        let d = compute_degradation(100.0, 40.0, 90.0).unwrap();
        assert!(close(d.depth, 60.0));
        assert!(close(d.cycle_fraction, 0.6));
        assert!(close(d.soh_loss, 0.45));
        assert!(close(d.new_soh, 89.55));
        assert!(!d.needs_maintenance);
    }

    #[test]
    fn full_discharge_pushes_marginal_battery_into_maintenance() {
        let d = compute_degradation(100.0, 0.0, 80.5).unwrap();
        assert!(close(d.soh_loss, 0.75));
        assert!(close(d.new_soh, 79.75));
        assert!(d.needs_maintenance);
    }

    #[test]
    fn end_at_or_above_start_is_invalid() {
        assert!(matches!(
            compute_degradation(40.0, 40.0, 90.0),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(compute_degradation(40.0, 70.0, 90.0).is_err());
    }

    #[test]
    fn out_of_range_percents_are_invalid() {
        assert!(matches!(
            compute_degradation(100.0, -20.0, 90.0),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(compute_degradation(120.0, 40.0, 90.0).is_err());
        assert!(compute_degradation(-5.0, -10.0, 90.0).is_err());
    }

    #[test]
    fn soh_floors_at_zero() {
        let d = compute_degradation(100.0, 0.0, 0.3).unwrap();
        assert!(close(d.new_soh, 0.0));
        assert!(d.needs_maintenance);
    }

    #[test]
    fn energy_and_cost_follow_depth_and_capacity() {
        // 60% of a 2 kWh pack is 1.2 kWh
        let kwh = energy_used_kwh(60.0, 2000.0);
        assert!(close(kwh, 1.2));

        let cost = energy_cost(kwh, Decimal::new(3500, 0));
        assert_eq!(cost, Decimal::new(4200, 0));
    }

    #[test]
    fn status_string_roundtrip() {
        for status in &[
            SwapStatus::PendingConfirm,
            SwapStatus::Completed,
            SwapStatus::Rejected,
        ] {
            assert_eq!(&SwapStatus::from_str(status.as_str()), status);
        }
    }
}
