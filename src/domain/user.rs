use crate::domain::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of an ordered set of lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, email: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            activated: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn activate(&mut self) {
        self.activated = true;
        self.updated_at = Utc::now();
    }
}
