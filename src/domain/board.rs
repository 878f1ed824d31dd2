use crate::domain::{
    card::Card,
    container::is_dense,
    ids::{CardId, ListId, UserId},
    list::List,
};
use serde::{Deserialize, Serialize};

/// A list together with its cards, both ordered by index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardList {
    #[serde(flatten)]
    pub list: List,
    pub cards: Vec<Card>,
}

/// Materialized board of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub user_id: UserId,
    pub lists: Vec<BoardList>,
}

impl Board {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            lists: Vec::new(),
        }
    }

    pub fn list_ids(&self) -> Vec<ListId> {
        self.lists.iter().map(|entry| entry.list.id).collect()
    }

    pub fn card_count(&self) -> usize {
        self.lists.iter().map(|entry| entry.cards.len()).sum()
    }

    /// Finds a list on the board
    pub fn get_list(&self, id: ListId) -> Option<&BoardList> {
        self.lists.iter().find(|entry| entry.list.id == id)
    }

    /// Finds a card anywhere on the board
    pub fn get_card(&self, id: CardId) -> Option<&Card> {
        self.lists
            .iter()
            .flat_map(|entry| entry.cards.iter())
            .find(|card| card.id == id)
    }

    /// Checks the dense-index invariant for the lists and every card set
    pub fn is_dense(&self) -> bool {
        is_dense(self.lists.iter().map(|entry| entry.list.index))
            && self
                .lists
                .iter()
                .all(|entry| is_dense(entry.cards.iter().map(|card| card.index)))
    }
}
