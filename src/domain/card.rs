use crate::domain::{
    container::{ContainerKey, ItemRef, Slot},
    ids::{CardId, ListId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A card inside a list; `index` is dense among the list's cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub title: String,
    pub index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(id: CardId, list_id: ListId, title: String, index: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            list_id,
            title,
            index,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef::Card(self.id)
    }

    pub fn slot(&self) -> Slot {
        Slot::new(ContainerKey::List(self.list_id), self.index)
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
        self.updated_at = Utc::now();
    }

    pub(crate) fn place(&mut self, slot: Slot) -> bool {
        match slot.container {
            ContainerKey::List(list_id) => {
                self.list_id = list_id;
                self.index = slot.index;
                self.updated_at = Utc::now();
                true
            }
            ContainerKey::User(_) => false,
        }
    }
}
