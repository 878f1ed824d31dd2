//! Board service: the operations a request layer calls on behalf of the
//! current user.
//!
//! Every list and card operation authorizes first, then hands over to the
//! position manager. Nothing here keeps state between calls.

use crate::{
    authorization::Authorizer,
    cascade::{CascadeReport, CascadingDestroyer},
    config::OrderingConfig,
    domain::{
        Board, BoardList, Card, CardId, ContainerKey, EntityKind, ItemRef, List, ListId, Slot,
        User, UserId,
    },
    error::{BoardError, Result},
    position::PositionManager,
    storage::{self, Storage},
};
use std::sync::Arc;

pub struct BoardService<S: Storage> {
    storage: Arc<S>,
    positions: PositionManager<S>,
    authorizer: Authorizer<S>,
    destroyer: CascadingDestroyer<S>,
}

impl<S: Storage> Clone for BoardService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            positions: self.positions.clone(),
            authorizer: self.authorizer.clone(),
            destroyer: self.destroyer.clone(),
        }
    }
}

impl<S: Storage> BoardService<S> {
    pub fn new(storage: Arc<S>, ordering: OrderingConfig) -> Self {
        Self {
            positions: PositionManager::new(Arc::clone(&storage), ordering),
            authorizer: Authorizer::new(Arc::clone(&storage)),
            destroyer: CascadingDestroyer::new(Arc::clone(&storage)),
            storage,
        }
    }

    pub fn authorizer(&self) -> &Authorizer<S> {
        &self.authorizer
    }

    pub fn positions(&self) -> &PositionManager<S> {
        &self.positions
    }

    // Users

    /// Registers a user; emails are unique
    pub async fn register_user(&self, email: &str) -> Result<User> {
        let email = email.trim().to_string();
        storage::write(self.storage.as_ref(), move |tx| {
            if tx.user_by_email(&email)?.is_some() {
                return Err(BoardError::UserAlreadyExists(email));
            }
            tx.insert_user(&email)
        })
        .await
    }

    pub async fn activate_user(&self, user: UserId) -> Result<User> {
        storage::write(self.storage.as_ref(), move |tx| {
            tx.activate_user(user)?;
            tx.user(user)?
                .ok_or_else(|| BoardError::not_found(EntityKind::User, user))
        })
        .await
    }

    pub async fn find_user(&self, user: UserId) -> Result<User> {
        storage::read(self.storage.as_ref(), move |tx| tx.user(user))
            .await?
            .ok_or_else(|| BoardError::not_found(EntityKind::User, user))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_string();
        storage::read(self.storage.as_ref(), move |tx| tx.user_by_email(&email)).await
    }

    /// Deletes the user with all of their lists and cards
    pub async fn delete_user(&self, user: UserId) -> Result<CascadeReport> {
        self.destroyer.destroy_user(user).await
    }

    // Lists

    pub async fn create_list(
        &self,
        current_user: UserId,
        title: String,
        index: Option<i64>,
    ) -> Result<List> {
        self.positions.insert_list(current_user, title, index).await
    }

    pub async fn rename_list(&self, current_user: UserId, list: ListId, title: String) -> Result<List> {
        let mut found = self.authorizer.authorize_list(list, current_user).await?;
        let new_title = title.clone();
        storage::write(self.storage.as_ref(), move |tx| {
            tx.set_title(ItemRef::List(list), &new_title)
        })
        .await?;
        found.set_title(title);
        Ok(found)
    }

    pub async fn move_list(&self, current_user: UserId, list: ListId, to_index: i64) -> Result<Slot> {
        self.authorizer.authorize_list(list, current_user).await?;
        self.positions.move_list(list, current_user, to_index).await
    }

    pub async fn delete_list(&self, current_user: UserId, list: ListId) -> Result<()> {
        self.authorizer.authorize_list(list, current_user).await?;
        self.positions.delete_item(ItemRef::List(list)).await
    }

    /// The user's lists, ascending by index
    pub async fn lists(&self, current_user: UserId) -> Result<Vec<List>> {
        storage::read(self.storage.as_ref(), move |tx| tx.lists_of(current_user)).await
    }

    // Cards

    pub async fn create_card(
        &self,
        current_user: UserId,
        list: ListId,
        title: String,
        index: Option<i64>,
    ) -> Result<Card> {
        self.authorizer.authorize_list(list, current_user).await?;
        self.positions.insert_card(list, title, index).await
    }

    pub async fn rename_card(&self, current_user: UserId, card: CardId, title: String) -> Result<Card> {
        let mut found = self.authorizer.authorize_card(card, current_user).await?;
        let new_title = title.clone();
        storage::write(self.storage.as_ref(), move |tx| {
            tx.set_title(ItemRef::Card(card), &new_title)
        })
        .await?;
        found.set_title(title);
        Ok(found)
    }

    /// Moves a card within its list or into another list of the same user
    pub async fn move_card(
        &self,
        current_user: UserId,
        card: CardId,
        to_list: ListId,
        to_index: i64,
    ) -> Result<Slot> {
        self.authorizer.authorize_card(card, current_user).await?;
        self.authorizer.authorize_list(to_list, current_user).await?;
        self.positions
            .move_item(ItemRef::Card(card), ContainerKey::List(to_list), to_index)
            .await
    }

    pub async fn delete_card(&self, current_user: UserId, card: CardId) -> Result<()> {
        self.authorizer.authorize_card(card, current_user).await?;
        self.positions.delete_item(ItemRef::Card(card)).await
    }

    /// Cards of one of the user's lists, ascending by index
    pub async fn cards(&self, current_user: UserId, list: ListId) -> Result<Vec<Card>> {
        self.authorizer.authorize_list(list, current_user).await?;
        storage::read(self.storage.as_ref(), move |tx| tx.cards_of(list)).await
    }

    /// The user's lists with their cards, in one consistent read
    pub async fn board(&self, current_user: UserId) -> Result<Board> {
        storage::read(self.storage.as_ref(), move |tx| {
            if tx.user(current_user)?.is_none() {
                return Err(BoardError::not_found(EntityKind::User, current_user));
            }
            let mut board = Board::new(current_user);
            for list in tx.lists_of(current_user)? {
                let cards = tx.cards_of(list.id)?;
                board.lists.push(BoardList { list, cards });
            }
            Ok(board)
        })
        .await
    }
}
