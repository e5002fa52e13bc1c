use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// An account owner. Authentication lives outside this crate; a user here is
/// only the registry entry that accounts reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(full_name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name,
            email,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
