use crate::{
    domain::{Card, CardId, ContainerKey, IndexRange, ItemRef, List, ListId, Slot, User, UserId},
    error::{BoardError, Result},
};
use async_trait::async_trait;

pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use memory_storage::MemoryStorage;
#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// Whether a transaction may write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Unit of work executed inside one transaction
pub type TxWork<'a> = Box<dyn FnOnce(&mut dyn StorageTx) -> Result<()> + Send + 'a>;

/// Transactional store for users, lists and cards
///
/// Everything beyond setup goes through [`Storage::transaction`]: the
/// work either completes and commits, or fails and leaves no trace.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Creates the schema if needed
    async fn initialize(&self) -> Result<()>;

    /// Runs `work` in a single transaction
    async fn transaction<'a>(&'a self, mode: TxMode, work: TxWork<'a>) -> Result<()>;
}

/// Row-level primitives available inside a transaction
pub trait StorageTx {
    fn insert_user(&mut self, email: &str) -> Result<User>;

    fn user(&mut self, id: UserId) -> Result<Option<User>>;

    fn user_by_email(&mut self, email: &str) -> Result<Option<User>>;

    fn activate_user(&mut self, id: UserId) -> Result<()>;

    /// Deletes the user row only; its lists must already be gone
    fn delete_user(&mut self, id: UserId) -> Result<()>;

    /// Appends a list row with the given index; no other row is touched
    fn insert_list(&mut self, user: UserId, title: &str, index: i64) -> Result<List>;

    /// Appends a card row with the given index; no other row is touched
    fn insert_card(&mut self, list: ListId, title: &str, index: i64) -> Result<Card>;

    fn list(&mut self, id: ListId) -> Result<Option<List>>;

    fn card(&mut self, id: CardId) -> Result<Option<Card>>;

    /// Lists of a user, ascending by index
    fn lists_of(&mut self, user: UserId) -> Result<Vec<List>>;

    /// Cards of a list, ascending by index
    fn cards_of(&mut self, list: ListId) -> Result<Vec<Card>>;

    fn set_title(&mut self, item: ItemRef, title: &str) -> Result<()>;

    /// Number of items in the container
    fn count(&mut self, container: ContainerKey) -> Result<i64>;

    /// `index = index + delta` for every item of `container` inside `range`.
    /// Returns the number of shifted rows.
    fn shift_range(&mut self, container: ContainerKey, range: IndexRange, delta: i64)
        -> Result<usize>;

    /// Assigns the item to `slot`, possibly in another container
    fn place(&mut self, item: ItemRef, slot: Slot) -> Result<()>;

    /// Deletes one item; for a list its cards are deleted first
    fn destroy(&mut self, item: ItemRef) -> Result<()>;

    /// Deletes a batch of lists with all their cards
    fn destroy_lists(&mut self, lists: &[ListId]) -> Result<()> {
        for &list in lists {
            self.destroy(ItemRef::List(list))?;
        }
        Ok(())
    }

    /// Current slot of an item, if it exists
    fn locate(&mut self, item: ItemRef) -> Result<Option<Slot>> {
        Ok(match item {
            ItemRef::List(id) => self.list(id)?.map(|list| list.slot()),
            ItemRef::Card(id) => self.card(id)?.map(|card| card.slot()),
        })
    }

    fn container_exists(&mut self, container: ContainerKey) -> Result<bool> {
        Ok(match container {
            ContainerKey::User(id) => self.user(id)?.is_some(),
            ContainerKey::List(id) => self.list(id)?.is_some(),
        })
    }
}

/// Runs a read-only transaction and returns what `work` produced
pub async fn read<S, T, F>(storage: &S, work: F) -> Result<T>
where
    S: Storage + ?Sized,
    T: Send,
    F: FnOnce(&mut dyn StorageTx) -> Result<T> + Send,
{
    run(storage, TxMode::ReadOnly, work).await
}

/// Runs a read-write transaction and returns what `work` produced
pub async fn write<S, T, F>(storage: &S, work: F) -> Result<T>
where
    S: Storage + ?Sized,
    T: Send,
    F: FnOnce(&mut dyn StorageTx) -> Result<T> + Send,
{
    run(storage, TxMode::ReadWrite, work).await
}

async fn run<S, T, F>(storage: &S, mode: TxMode, work: F) -> Result<T>
where
    S: Storage + ?Sized,
    T: Send,
    F: FnOnce(&mut dyn StorageTx) -> Result<T> + Send,
{
    let mut output = None;
    storage
        .transaction(
            mode,
            Box::new(|tx: &mut dyn StorageTx| {
                output = Some(work(tx)?);
                Ok(())
            }),
        )
        .await?;

    output.ok_or_else(|| {
        BoardError::StorageError("transaction committed without a result".to_string())
    })
}
