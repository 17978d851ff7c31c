//! Swap station entity

use chrono::{DateTime, Utc};

/// A physical swap station holding battery inventory.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Station {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            address: address.into(),
            created_at: Utc::now(),
        }
    }
}
