//! Monthly trust score derived from reservation outcomes.
//!
//! The score is recomputed from history on every read instead of being
//! kept as a stored counter, so it can never drift from the underlying
//! events and naturally resets at the month boundary.

use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tracing::debug;

use crate::domain::{DomainResult, RepositoryProvider, ReservationStatus};
use crate::shared::errors::DomainError;

/// Every user starts each month with this many points.
pub const MONTHLY_SCORE_MAX: u32 = 6;

/// Points lost per cancelled reservation in the month.
pub const CANCEL_PENALTY: u32 = 1;

/// Points lost per expired reservation in the month.
pub const EXPIRE_PENALTY: u32 = 2;

/// Score plus the counts it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationBreakdown {
    pub score: u32,
    pub cancelled: u32,
    pub expired: u32,
    pub can_reserve: bool,
}

/// Derives per-user trust scores; gates reservation creation.
pub struct ReputationTracker {
    repos: Arc<dyn RepositoryProvider>,
}

impl ReputationTracker {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Score for the calendar month containing `now`.
    pub async fn evaluate_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<ReputationBreakdown> {
        let (from, to) = month_window(now);
        let reservations = self
            .repos
            .reservations()
            .find_for_user_in_range(user_id, from, to)
            .await?;

        let cancelled = reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Cancelled)
            .count() as u32;
        let expired = reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Expired)
            .count() as u32;

        let penalty = cancelled * CANCEL_PENALTY + expired * EXPIRE_PENALTY;
        let score = MONTHLY_SCORE_MAX.saturating_sub(penalty);

        debug!(user_id, cancelled, expired, score, "Reputation evaluated");

        Ok(ReputationBreakdown {
            score,
            cancelled,
            expired,
            can_reserve: score > 0,
        })
    }

    pub async fn evaluate(&self, user_id: i64) -> DomainResult<ReputationBreakdown> {
        self.evaluate_at(user_id, Utc::now()).await
    }

    /// Fails with ReputationExhausted when the score is spent; no side
    /// effects either way.
    pub async fn gate(&self, user_id: i64) -> DomainResult<ReputationBreakdown> {
        let breakdown = self.evaluate(user_id).await?;
        if !breakdown.can_reserve {
            return Err(DomainError::ReputationExhausted {
                score: breakdown.score,
            });
        }
        Ok(breakdown)
    }
}

/// [start of month, start of next month) in UTC.
fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .unwrap();
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let to = Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0).unwrap();
    (from, to)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reservation;
    use crate::infrastructure::storage::memory::InMemoryRepositoryProvider;

    async fn seed_reservation(
        repos: &InMemoryRepositoryProvider,
        user_id: i64,
        vehicle_id: i64,
        status: ReservationStatus,
    ) {
        let r = Reservation::new(user_id, vehicle_id, 1, 1, 1, 60);
        let stored = repos.reservations().insert_with_items(r, &[]).await.unwrap();
        if status != ReservationStatus::Active {
            repos
                .reservations()
                .finish(stored.id, status, Utc::now(), None)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn clean_month_scores_maximum() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let tracker = ReputationTracker::new(repos.clone());
        let b = tracker.evaluate(1).await.unwrap();
        assert_eq!(b.score, 6);
        assert!(b.can_reserve);
    }

    #[tokio::test]
    async fn penalties_weight_expired_double() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        for v in 0..2 {
            seed_reservation(&repos, 1, v, ReservationStatus::Cancelled).await;
        }
        seed_reservation(&repos, 1, 2, ReservationStatus::Expired).await;

        let tracker = ReputationTracker::new(repos.clone());
        let b = tracker.evaluate(1).await.unwrap();
        assert_eq!(b.cancelled, 2);
        assert_eq!(b.expired, 1);
        assert_eq!(b.score, 2); // 6 - 2*1 - 1*2
        assert!(b.can_reserve);
    }

    #[tokio::test]
    async fn score_floors_at_zero_and_blocks() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        for v in 0..3 {
            seed_reservation(&repos, 1, v, ReservationStatus::Cancelled).await;
        }
        for v in 3..5 {
            seed_reservation(&repos, 1, v, ReservationStatus::Expired).await;
        }

        let tracker = ReputationTracker::new(repos.clone());
        let b = tracker.evaluate(1).await.unwrap();
        assert_eq!(b.score, 0); // max(0, 6 - 3 - 4)
        assert!(!b.can_reserve);

        let err = tracker.gate(1).await.unwrap_err();
        assert!(matches!(err, DomainError::ReputationExhausted { score: 0 }));
    }

    #[tokio::test]
    async fn active_and_used_reservations_cost_nothing() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        seed_reservation(&repos, 1, 0, ReservationStatus::Active).await;
        seed_reservation(&repos, 1, 1, ReservationStatus::Used).await;

        let tracker = ReputationTracker::new(repos.clone());
        assert_eq!(tracker.evaluate(1).await.unwrap().score, 6);
    }

    #[tokio::test]
    async fn other_users_history_does_not_leak() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        for v in 0..5 {
            seed_reservation(&repos, 2, v, ReservationStatus::Expired).await;
        }
        let tracker = ReputationTracker::new(repos.clone());
        assert_eq!(tracker.evaluate(1).await.unwrap().score, 6);
    }

    #[test]
    fn month_window_covers_the_calendar_month() {
        let now = Utc.with_ymd_and_hms(2026, 12, 15, 10, 30, 0).unwrap();
        let (from, to) = month_window(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }
}
