//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Reservation, ReservationItem, ReservationStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert the reservation and one item row per battery id, as one
    /// atomic write. Returns the stored reservation with its id.
    async fn insert_with_items(
        &self,
        reservation: Reservation,
        battery_ids: &[i64],
    ) -> DomainResult<Reservation>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>>;

    /// The single Active reservation for a vehicle, if any.
    async fn find_active_for_vehicle(&self, vehicle_id: i64) -> DomainResult<Option<Reservation>>;

    /// All reservations for a user, most recent `reserved_at` first.
    async fn list_for_user(&self, user_id: i64) -> DomainResult<Vec<Reservation>>;

    /// Reservations for a user with `reserved_at` in [from, to).
    async fn find_for_user_in_range(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>>;

    /// Active reservations with `expire_at < now`.
    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// Conditional terminal transition: move to `next` only if the
    /// stored status is still Active. Returns false when another writer
    /// already closed the reservation — the caller lost the race and
    /// must not release any batteries.
    async fn finish(
        &self,
        id: i64,
        next: ReservationStatus,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DomainResult<bool>;

    /// Conditional Active -> Used transition linking the fulfilling swap.
    async fn mark_used(
        &self,
        id: i64,
        swap_transaction_id: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;

    async fn items_for(&self, reservation_id: i64) -> DomainResult<Vec<ReservationItem>>;

    /// Whether any Active reservation currently holds this battery.
    async fn battery_is_held(&self, battery_id: i64) -> DomainResult<bool>;
}
