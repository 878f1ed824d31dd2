use crate::domain::{
    container::{ContainerKey, ItemRef, Slot},
    ids::{ListId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A list on a user's board; `index` is dense among the owner's lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub user_id: UserId,
    pub title: String,
    pub index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl List {
    pub fn new(id: ListId, user_id: UserId, title: String, index: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            title,
            index,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef::List(self.id)
    }

    pub fn slot(&self) -> Slot {
        Slot::new(ContainerKey::User(self.user_id), self.index)
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
        self.updated_at = Utc::now();
    }

    /// Moves the list into `slot`, which must be a user container
    pub(crate) fn place(&mut self, slot: Slot) -> bool {
        match slot.container {
            ContainerKey::User(user_id) => {
                self.user_id = user_id;
                self.index = slot.index;
                self.updated_at = Utc::now();
                true
            }
            ContainerKey::List(_) => false,
        }
    }
}
