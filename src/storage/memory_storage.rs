use crate::{
    domain::{
        Card, CardId, ContainerKey, EntityKind, IndexRange, ItemRef, List, ListId, Slot, User,
        UserId,
    },
    error::{BoardError, Result},
    storage::{Storage, StorageTx, TxMode, TxWork},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    lists: BTreeMap<ListId, List>,
    cards: BTreeMap<CardId, Card>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    // Successful writes left before an injected failure
    write_budget: Option<usize>,
}

/// In-memory storage backend
///
/// Write transactions run against a copy of the tables that only replaces
/// the live tables once the work succeeds.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the write primitive after the next `writes` successful ones fail
    /// with a storage error. The failure fires once.
    pub async fn fail_after_writes(&self, writes: usize) {
        self.inner.lock().await.write_budget = Some(writes);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn transaction<'a>(&'a self, mode: TxMode, work: TxWork<'a>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Inner {
            tables,
            write_budget,
        } = &mut *inner;

        let mut working = tables.clone();
        let mut tx = MemoryTx {
            tables: &mut working,
            write_budget,
            mode,
        };
        work(&mut tx)?;

        if mode == TxMode::ReadWrite {
            *tables = working;
        }
        Ok(())
    }
}

struct MemoryTx<'a> {
    tables: &'a mut Tables,
    write_budget: &'a mut Option<usize>,
    mode: TxMode,
}

impl MemoryTx<'_> {
    fn charge_write(&mut self) -> Result<()> {
        if self.mode == TxMode::ReadOnly {
            return Err(BoardError::StorageError(
                "write attempted in a read-only transaction".to_string(),
            ));
        }
        match *self.write_budget {
            Some(0) => {
                *self.write_budget = None;
                Err(BoardError::StorageError("injected write failure".to_string()))
            }
            Some(left) => {
                *self.write_budget = Some(left - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn ordered<T>(mut items: Vec<T>, index: impl Fn(&T) -> (i64, i64)) -> Vec<T> {
    items.sort_by_key(|item| index(item));
    items
}

impl StorageTx for MemoryTx<'_> {
    fn insert_user(&mut self, email: &str) -> Result<User> {
        self.charge_write()?;
        let id = UserId::new(self.tables.next_id());
        let user = User::new(id, email.to_string());
        self.tables.users.insert(id, user.clone());
        Ok(user)
    }

    fn user(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.users.get(&id).cloned())
    }

    fn user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    fn activate_user(&mut self, id: UserId) -> Result<()> {
        self.charge_write()?;
        let user = self
            .tables
            .users
            .get_mut(&id)
            .ok_or_else(|| BoardError::not_found(EntityKind::User, id))?;
        user.activate();
        Ok(())
    }

    fn delete_user(&mut self, id: UserId) -> Result<()> {
        self.charge_write()?;
        if self.tables.lists.values().any(|list| list.user_id == id) {
            return Err(BoardError::StorageError(format!(
                "user {} still owns lists",
                id
            )));
        }
        self.tables
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BoardError::not_found(EntityKind::User, id))
    }

    fn insert_list(&mut self, user: UserId, title: &str, index: i64) -> Result<List> {
        self.charge_write()?;
        if !self.tables.users.contains_key(&user) {
            return Err(BoardError::not_found(EntityKind::User, user));
        }
        let id = ListId::new(self.tables.next_id());
        let list = List::new(id, user, title.to_string(), index);
        self.tables.lists.insert(id, list.clone());
        Ok(list)
    }

    fn insert_card(&mut self, list: ListId, title: &str, index: i64) -> Result<Card> {
        self.charge_write()?;
        if !self.tables.lists.contains_key(&list) {
            return Err(BoardError::not_found(EntityKind::List, list));
        }
        let id = CardId::new(self.tables.next_id());
        let card = Card::new(id, list, title.to_string(), index);
        self.tables.cards.insert(id, card.clone());
        Ok(card)
    }

    fn list(&mut self, id: ListId) -> Result<Option<List>> {
        Ok(self.tables.lists.get(&id).cloned())
    }

    fn card(&mut self, id: CardId) -> Result<Option<Card>> {
        Ok(self.tables.cards.get(&id).cloned())
    }

    fn lists_of(&mut self, user: UserId) -> Result<Vec<List>> {
        let lists: Vec<List> = self
            .tables
            .lists
            .values()
            .filter(|list| list.user_id == user)
            .cloned()
            .collect();
        Ok(ordered(lists, |list| (list.index, list.id.get())))
    }

    fn cards_of(&mut self, list: ListId) -> Result<Vec<Card>> {
        let cards: Vec<Card> = self
            .tables
            .cards
            .values()
            .filter(|card| card.list_id == list)
            .cloned()
            .collect();
        Ok(ordered(cards, |card| (card.index, card.id.get())))
    }

    fn set_title(&mut self, item: ItemRef, title: &str) -> Result<()> {
        self.charge_write()?;
        let renamed = match item {
            ItemRef::List(id) => self
                .tables
                .lists
                .get_mut(&id)
                .map(|list| list.set_title(title.to_string())),
            ItemRef::Card(id) => self
                .tables
                .cards
                .get_mut(&id)
                .map(|card| card.set_title(title.to_string())),
        };
        renamed.ok_or_else(|| BoardError::not_found(item.kind(), item.id()))
    }

    fn count(&mut self, container: ContainerKey) -> Result<i64> {
        let count = match container {
            ContainerKey::User(user) => self
                .tables
                .lists
                .values()
                .filter(|list| list.user_id == user)
                .count(),
            ContainerKey::List(list) => self
                .tables
                .cards
                .values()
                .filter(|card| card.list_id == list)
                .count(),
        };
        Ok(count as i64)
    }

    fn shift_range(
        &mut self,
        container: ContainerKey,
        range: IndexRange,
        delta: i64,
    ) -> Result<usize> {
        self.charge_write()?;
        let mut shifted = 0;
        match container {
            ContainerKey::User(user) => {
                for list in self.tables.lists.values_mut() {
                    if list.user_id == user && range.contains(list.index) {
                        list.index += delta;
                        shifted += 1;
                    }
                }
            }
            ContainerKey::List(list_id) => {
                for card in self.tables.cards.values_mut() {
                    if card.list_id == list_id && range.contains(card.index) {
                        card.index += delta;
                        shifted += 1;
                    }
                }
            }
        }
        Ok(shifted)
    }

    fn place(&mut self, item: ItemRef, slot: Slot) -> Result<()> {
        self.charge_write()?;
        let placed = match item {
            ItemRef::List(id) => self.tables.lists.get_mut(&id).map(|list| list.place(slot)),
            ItemRef::Card(id) => self.tables.cards.get_mut(&id).map(|card| card.place(slot)),
        };
        match placed {
            Some(true) => Ok(()),
            Some(false) => Err(BoardError::InvalidArgument(format!(
                "{} cannot be placed in {}",
                item, slot.container
            ))),
            None => Err(BoardError::not_found(item.kind(), item.id())),
        }
    }

    fn destroy(&mut self, item: ItemRef) -> Result<()> {
        self.charge_write()?;
        let removed = match item {
            ItemRef::List(id) => {
                self.tables.cards.retain(|_, card| card.list_id != id);
                self.tables.lists.remove(&id).map(|_| ())
            }
            ItemRef::Card(id) => self.tables.cards.remove(&id).map(|_| ()),
        };
        removed.ok_or_else(|| BoardError::not_found(item.kind(), item.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{read, write};

    #[tokio::test]
    async fn test_failed_write_transaction_is_discarded() {
        let storage = MemoryStorage::new();
        let user = write(&storage, |tx| tx.insert_user("ada@example.com"))
            .await
            .unwrap();

        let result = write(&storage, move |tx| {
            tx.insert_list(user.id, "Todo", 0)?;
            Err::<(), _>(BoardError::StorageError("boom".to_string()))
        })
        .await;
        assert!(result.is_err());

        let lists = read(&storage, move |tx| tx.lists_of(user.id)).await.unwrap();
        assert!(lists.is_empty());
    }

    #[tokio::test]
    async fn test_read_only_transaction_rejects_writes() {
        let storage = MemoryStorage::new();
        let result = read(&storage, |tx| tx.insert_user("ada@example.com")).await;
        assert!(matches!(result, Err(BoardError::StorageError(_))));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let storage = MemoryStorage::new();
        storage.fail_after_writes(1).await;

        let result = write(&storage, |tx| {
            tx.insert_user("a@example.com")?;
            tx.insert_user("b@example.com")
        })
        .await;
        assert!(matches!(result, Err(BoardError::StorageError(_))));

        let user = write(&storage, |tx| tx.insert_user("c@example.com")).await;
        assert!(user.is_ok());
    }

    #[tokio::test]
    async fn test_shift_range_only_touches_container() {
        let storage = MemoryStorage::new();
        let (first, second) = write(&storage, |tx| {
            let user = tx.insert_user("ada@example.com")?;
            let first = tx.insert_list(user.id, "First", 0)?;
            let second = tx.insert_list(user.id, "Second", 1)?;
            for (i, title) in ["a", "b", "c"].iter().enumerate() {
                tx.insert_card(first.id, title, i as i64)?;
                tx.insert_card(second.id, title, i as i64)?;
            }
            Ok((first.id, second.id))
        })
        .await
        .unwrap();

        let shifted = write(&storage, move |tx| {
            tx.shift_range(ContainerKey::List(first), IndexRange::above(0), 5)
        })
        .await
        .unwrap();
        assert_eq!(shifted, 2);

        let (a, b) = read(&storage, move |tx| Ok((tx.cards_of(first)?, tx.cards_of(second)?)))
            .await
            .unwrap();
        assert_eq!(a.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 6, 7]);
        assert_eq!(b.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
