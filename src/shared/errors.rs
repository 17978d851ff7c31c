use thiserror::Error;

/// Business-rule failures surfaced to callers.
///
/// Storage failures are kept apart from business failures so clients can
/// distinguish "your request is invalid" from "try again".
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Quota exceeded: requested {requested} batteries, plan allows {limit}")]
    QuotaExceeded { requested: u32, limit: u32 },

    #[error("Insufficient inventory: station {station_id} has {available} batteries ready, {requested} requested")]
    InsufficientInventory {
        station_id: i64,
        requested: u32,
        available: u32,
    },

    #[error("Reputation exhausted: score {score} this month, reservations are blocked")]
    ReputationExhausted { score: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Mismatch: {0}")]
    Mismatch(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Whether this error is likely transient and the operation may
    /// succeed if retried by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DomainError::Storage(_) | DomainError::Conflict(_) | DomainError::InsufficientInventory { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_field() {
        let e = DomainError::not_found("Battery", "id", 42);
        assert_eq!(e.to_string(), "Not found: Battery with id=42");
    }

    #[test]
    fn lock_race_losers_are_retryable() {
        assert!(DomainError::Conflict("battery lock lost".into()).is_transient());
        assert!(DomainError::Storage("connection reset".into()).is_transient());
        assert!(!DomainError::InvalidInput("bad percent".into()).is_transient());
        assert!(!DomainError::ReputationExhausted { score: 0 }.is_transient());
    }
}
