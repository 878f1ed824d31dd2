//! Cascading destroyer for users.
//!
//! The user's whole container of lists disappears, so nothing needs
//! compacting; other users' containers are never touched.

use crate::{
    domain::{EntityKind, UserId},
    error::{BoardError, Result},
    storage::{self, Storage},
};
use std::sync::Arc;
use tracing::info;

/// What a cascade removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub lists: usize,
    pub cards: usize,
}

pub struct CascadingDestroyer<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for CascadingDestroyer<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> CascadingDestroyer<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Deletes every card, every list and then the user, in one transaction
    pub async fn destroy_user(&self, user: UserId) -> Result<CascadeReport> {
        let report = storage::write(self.storage.as_ref(), move |tx| {
            if tx.user(user)?.is_none() {
                return Err(BoardError::not_found(EntityKind::User, user));
            }

            let lists = tx.lists_of(user)?;
            let mut report = CascadeReport {
                lists: lists.len(),
                cards: 0,
            };
            for list in &lists {
                report.cards += tx.cards_of(list.id)?.len();
            }

            let ids: Vec<_> = lists.iter().map(|list| list.id).collect();
            tx.destroy_lists(&ids)?;
            tx.delete_user(user)?;
            Ok(report)
        })
        .await?;

        info!(
            user = %user,
            lists = report.lists,
            cards = report.cards,
            "destroyed user and board"
        );
        Ok(report)
    }
}
