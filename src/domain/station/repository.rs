//! Station repository interface

use async_trait::async_trait;

use super::model::Station;
use crate::domain::DomainResult;

#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn insert(&self, station: Station) -> DomainResult<Station>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Station>>;

    async fn find_all(&self) -> DomainResult<Vec<Station>>;
}
