//! Ownership checks: a user owns their lists, a list owns its cards.
//!
//! Lookups are read-only. A missing item is `NotFound`; an item owned by
//! someone else is `Forbidden`. The two never overlap.

use crate::{
    domain::{Card, CardId, EntityKind, ItemRef, List, ListId, UserId},
    error::{BoardError, Result},
    storage::{self, Storage},
};
use std::sync::Arc;
use tracing::warn;

/// An item that passed an ownership check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorized {
    List(List),
    Card(Card),
}

pub struct Authorizer<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> Authorizer<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Returns the list if `owner` owns it
    pub async fn authorize_list(&self, id: ListId, owner: UserId) -> Result<List> {
        let list = storage::read(self.storage.as_ref(), move |tx| tx.list(id))
            .await?
            .ok_or_else(|| BoardError::not_found(EntityKind::List, id))?;

        if list.user_id != owner {
            return Err(forbidden(EntityKind::List, id.get(), owner));
        }
        Ok(list)
    }

    /// Returns the card if `owner` owns the list holding it
    pub async fn authorize_card(&self, id: CardId, owner: UserId) -> Result<Card> {
        let (card, list) = storage::read(self.storage.as_ref(), move |tx| {
            let Some(card) = tx.card(id)? else {
                return Ok((None, None));
            };
            let list = tx.list(card.list_id)?;
            Ok((Some(card), list))
        })
        .await?;

        let card = card.ok_or_else(|| BoardError::not_found(EntityKind::Card, id))?;
        let list = list.ok_or_else(|| BoardError::not_found(EntityKind::List, card.list_id))?;

        if list.user_id != owner {
            return Err(forbidden(EntityKind::Card, id.get(), owner));
        }
        Ok(card)
    }

    /// Returns the card if it sits in `list`
    pub async fn authorize_card_in_list(&self, id: CardId, list: ListId) -> Result<Card> {
        let card = storage::read(self.storage.as_ref(), move |tx| tx.card(id))
            .await?
            .ok_or_else(|| BoardError::not_found(EntityKind::Card, id))?;

        if card.list_id != list {
            warn!(card = %id, list = %list, "card is not in list");
            return Err(BoardError::Forbidden {
                kind: EntityKind::Card,
                id: id.get(),
                owner_kind: EntityKind::List,
                owner: list.get(),
            });
        }
        Ok(card)
    }

    /// Checks any positioned item against its owning user
    pub async fn authorize(&self, item: ItemRef, owner: UserId) -> Result<Authorized> {
        match item {
            ItemRef::List(id) => {
                self.authorize_list(id, owner).await.map(Authorized::List)
            }
            ItemRef::Card(id) => {
                self.authorize_card(id, owner).await.map(Authorized::Card)
            }
        }
    }
}

fn forbidden(kind: EntityKind, id: i64, owner: UserId) -> BoardError {
    warn!(%kind, id, owner = %owner, "ownership check failed");
    BoardError::Forbidden {
        kind,
        id,
        owner_kind: EntityKind::User,
        owner: owner.get(),
    }
}
