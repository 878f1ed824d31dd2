//! Position manager: keeps every container's indices dense.
//!
//! All operations run as one write transaction. The moving item's current
//! slot is read inside that transaction, and shifts always run before the
//! final placement, so no committed state ever holds a duplicate index.

use crate::{
    config::{OrderingConfig, OutOfRange},
    domain::{Card, ContainerKey, ItemRef, List, ListId, MovePlan, Shift, Slot, UserId},
    error::{BoardError, Result},
    storage::{self, Storage, StorageTx},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PositionManager<S: Storage> {
    storage: Arc<S>,
    config: OrderingConfig,
}

impl<S: Storage> Clone for PositionManager<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config,
        }
    }
}

impl<S: Storage> PositionManager<S> {
    pub fn new(storage: Arc<S>, config: OrderingConfig) -> Self {
        Self { storage, config }
    }

    /// Relocates `item` to `to_index` inside `to`.
    ///
    /// Ownership of `to` must already be checked by the caller. A target in
    /// the item's own container accepts `0..=n-1`; another container accepts
    /// `0..=n`. Anything past that is rejected or clamped per
    /// [`OrderingConfig::out_of_range`]. Returns the slot the item ends in.
    pub async fn move_item(&self, item: ItemRef, to: ContainerKey, to_index: i64) -> Result<Slot> {
        ensure_non_negative(to_index)?;
        if !item.fits(&to) {
            return Err(BoardError::InvalidArgument(format!(
                "{} cannot be moved into {}",
                item, to
            )));
        }

        let policy = self.config.out_of_range;
        storage::write(self.storage.as_ref(), move |tx| {
            let from = tx
                .locate(item)?
                .ok_or_else(|| BoardError::not_found(item.kind(), item.id()))?;
            if !tx.container_exists(to)? {
                return Err(BoardError::not_found(to.owner_kind(), to.owner_id()));
            }

            let size = tx.count(to)?;
            let last = if from.container == to { size - 1 } else { size };
            let to_index = resolve_index(to_index, last, policy)?;

            let plan = MovePlan::new(from, Slot::new(to, to_index));
            if plan.is_stay() {
                debug!(%item, index = to_index, "item already in place");
                return Ok(plan.target());
            }

            run_shifts(tx, &plan.shifts())?;
            tx.place(item, plan.target())?;
            debug!(%item, ?plan, "moved item");
            Ok(plan.target())
        })
        .await
    }

    /// Moves a list within its owner's board
    pub async fn move_list(&self, list: ListId, owner: UserId, to_index: i64) -> Result<Slot> {
        self.move_item(ItemRef::List(list), ContainerKey::User(owner), to_index)
            .await
    }

    /// Deletes `item` (with its cards, for a list) and closes the gap it leaves
    pub async fn delete_item(&self, item: ItemRef) -> Result<()> {
        storage::write(self.storage.as_ref(), move |tx| {
            let slot = tx
                .locate(item)?
                .ok_or_else(|| BoardError::not_found(item.kind(), item.id()))?;

            tx.destroy(item)?;
            run_shifts(tx, &[Shift::close_gap(slot.container, slot.index)])?;
            info!(%item, container = %slot.container, index = slot.index, "deleted item");
            Ok(())
        })
        .await
    }

    /// Creates a list; without `index` it is appended after the last one
    pub async fn insert_list(
        &self,
        owner: UserId,
        title: String,
        index: Option<i64>,
    ) -> Result<List> {
        let policy = self.config.out_of_range;
        storage::write(self.storage.as_ref(), move |tx| {
            let container = ContainerKey::User(owner);
            let index = open_slot(tx, container, index, policy)?;
            tx.insert_list(owner, &title, index)
        })
        .await
    }

    /// Creates a card; without `index` it is appended after the last one
    pub async fn insert_card(
        &self,
        list: ListId,
        title: String,
        index: Option<i64>,
    ) -> Result<Card> {
        let policy = self.config.out_of_range;
        storage::write(self.storage.as_ref(), move |tx| {
            let container = ContainerKey::List(list);
            let index = open_slot(tx, container, index, policy)?;
            tx.insert_card(list, &title, index)
        })
        .await
    }
}

fn ensure_non_negative(index: i64) -> Result<()> {
    if index < 0 {
        return Err(BoardError::InvalidArgument(format!(
            "index must not be negative, got {}",
            index
        )));
    }
    Ok(())
}

fn resolve_index(index: i64, last: i64, policy: OutOfRange) -> Result<i64> {
    if index <= last {
        return Ok(index);
    }
    match policy {
        OutOfRange::Clamp if last >= 0 => Ok(last),
        _ => {
            warn!(index, last, %policy, "rejected out-of-range index");
            Err(BoardError::InvalidArgument(format!(
                "index {} is out of range (last valid index is {})",
                index, last
            )))
        }
    }
}

/// Checks the container, then frees the requested slot (or the end slot)
fn open_slot(
    tx: &mut dyn StorageTx,
    container: ContainerKey,
    index: Option<i64>,
    policy: OutOfRange,
) -> Result<i64> {
    if !tx.container_exists(container)? {
        return Err(BoardError::not_found(
            container.owner_kind(),
            container.owner_id(),
        ));
    }

    let size = tx.count(container)?;
    let index = match index {
        Some(index) => {
            ensure_non_negative(index)?;
            resolve_index(index, size, policy)?
        }
        None => size,
    };

    if index < size {
        run_shifts(tx, &[Shift::open_slot(container, index)])?;
    }
    Ok(index)
}

fn run_shifts(tx: &mut dyn StorageTx, shifts: &[Shift]) -> Result<()> {
    for shift in shifts {
        if shift.range.is_empty() {
            continue;
        }
        tx.shift_range(shift.container, shift.range, shift.delta)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{is_dense, CardId},
        storage::{read, MemoryStorage},
    };

    struct Fixture {
        manager: PositionManager<MemoryStorage>,
        storage: Arc<MemoryStorage>,
        user: UserId,
    }

    async fn fixture(out_of_range: OutOfRange) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let user = storage::write(storage.as_ref(), |tx| tx.insert_user("ada@example.com"))
            .await
            .unwrap()
            .id;
        Fixture {
            manager: PositionManager::new(Arc::clone(&storage), OrderingConfig { out_of_range }),
            storage,
            user,
        }
    }

    impl Fixture {
        async fn list_with(&self, title: &str, cards: &[&str]) -> (ListId, Vec<CardId>) {
            let list = self
                .manager
                .insert_list(self.user, title.to_string(), None)
                .await
                .unwrap();
            let mut ids = Vec::new();
            for card in cards {
                let card = self
                    .manager
                    .insert_card(list.id, card.to_string(), None)
                    .await
                    .unwrap();
                ids.push(card.id);
            }
            (list.id, ids)
        }

        async fn titles(&self, list: ListId) -> Vec<String> {
            let cards = read(self.storage.as_ref(), move |tx| tx.cards_of(list))
                .await
                .unwrap();
            assert!(is_dense(cards.iter().map(|card| card.index)));
            cards
                .into_iter()
                .map(|card| format!("{}:{}", card.title, card.index))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_move_increase() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C", "D", "E"]).await;

        let slot = f
            .manager
            .move_item(ItemRef::Card(cards[1]), ContainerKey::List(list), 3)
            .await
            .unwrap();

        assert_eq!(slot, Slot::new(ContainerKey::List(list), 3));
        assert_eq!(f.titles(list).await, ["A:0", "C:1", "D:2", "B:3", "E:4"]);
    }

    #[tokio::test]
    async fn test_move_decrease() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C", "D", "E"]).await;

        f.manager
            .move_item(ItemRef::Card(cards[3]), ContainerKey::List(list), 1)
            .await
            .unwrap();

        assert_eq!(f.titles(list).await, ["A:0", "D:1", "B:2", "C:3", "E:4"]);
    }

    #[tokio::test]
    async fn test_move_across_lists() {
        let f = fixture(OutOfRange::Reject).await;
        let (source, a) = f.list_with("S", &["a0", "a1", "a2"]).await;
        let (dest, _) = f.list_with("D", &["b0", "b1", "b2"]).await;

        f.manager
            .move_item(ItemRef::Card(a[1]), ContainerKey::List(dest), 2)
            .await
            .unwrap();

        assert_eq!(f.titles(source).await, ["a0:0", "a2:1"]);
        assert_eq!(f.titles(dest).await, ["b0:0", "b1:1", "a1:2", "b2:3"]);
    }

    #[tokio::test]
    async fn test_move_to_end_of_other_list_and_into_empty_list() {
        let f = fixture(OutOfRange::Reject).await;
        let (source, a) = f.list_with("S", &["a0", "a1"]).await;
        let (dest, _) = f.list_with("D", &["b0"]).await;
        let (empty, _) = f.list_with("E", &[]).await;

        f.manager
            .move_item(ItemRef::Card(a[0]), ContainerKey::List(dest), 1)
            .await
            .unwrap();
        f.manager
            .move_item(ItemRef::Card(a[1]), ContainerKey::List(empty), 0)
            .await
            .unwrap();

        assert!(f.titles(source).await.is_empty());
        assert_eq!(f.titles(dest).await, ["b0:0", "a0:1"]);
        assert_eq!(f.titles(empty).await, ["a1:0"]);
    }

    #[tokio::test]
    async fn test_move_to_own_index_changes_nothing() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C"]).await;

        f.manager
            .move_item(ItemRef::Card(cards[1]), ContainerKey::List(list), 1)
            .await
            .unwrap();

        assert_eq!(f.titles(list).await, ["A:0", "B:1", "C:2"]);
    }

    #[tokio::test]
    async fn test_round_trip_move_restores_order() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C", "D", "E"]).await;
        let before = f.titles(list).await;

        for (i, j) in [(0, 4), (3, 1), (2, 0)] {
            let item = ItemRef::Card(cards[i]);
            f.manager
                .move_item(item, ContainerKey::List(list), j as i64)
                .await
                .unwrap();
            f.manager
                .move_item(item, ContainerKey::List(list), i as i64)
                .await
                .unwrap();
            assert_eq!(f.titles(list).await, before);
        }
    }

    #[tokio::test]
    async fn test_move_rejects_negative_and_out_of_range() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C"]).await;
        let (other, _) = f.list_with("O", &["x"]).await;
        let card = ItemRef::Card(cards[0]);

        let result = f.manager.move_item(card, ContainerKey::List(list), -1).await;
        assert!(matches!(result, Err(BoardError::InvalidArgument(_))));

        // n-1 is the last slot within the same list
        let result = f.manager.move_item(card, ContainerKey::List(list), 3).await;
        assert!(matches!(result, Err(BoardError::InvalidArgument(_))));

        // n is still valid when entering another list, n+1 is not
        let result = f.manager.move_item(card, ContainerKey::List(other), 2).await;
        assert!(matches!(result, Err(BoardError::InvalidArgument(_))));

        assert_eq!(f.titles(list).await, ["A:0", "B:1", "C:2"]);
        assert_eq!(f.titles(other).await, ["x:0"]);
    }

    #[tokio::test]
    async fn test_move_clamps_when_configured() {
        let f = fixture(OutOfRange::Clamp).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C"]).await;

        let slot = f
            .manager
            .move_item(ItemRef::Card(cards[0]), ContainerKey::List(list), 10)
            .await
            .unwrap();

        assert_eq!(slot.index, 2);
        assert_eq!(f.titles(list).await, ["B:0", "C:1", "A:2"]);
    }

    #[tokio::test]
    async fn test_move_missing_item_or_container() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A"]).await;

        let result = f
            .manager
            .move_item(ItemRef::Card(CardId::new(999)), ContainerKey::List(list), 0)
            .await;
        assert!(matches!(result, Err(BoardError::NotFound { .. })));

        let result = f
            .manager
            .move_item(
                ItemRef::Card(cards[0]),
                ContainerKey::List(ListId::new(999)),
                0,
            )
            .await;
        assert!(matches!(result, Err(BoardError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_move_rejects_container_of_wrong_kind() {
        let f = fixture(OutOfRange::Reject).await;
        let (_, cards) = f.list_with("L", &["A"]).await;

        let result = f
            .manager
            .move_item(ItemRef::Card(cards[0]), ContainerKey::User(f.user), 0)
            .await;
        assert!(matches!(result, Err(BoardError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_indices_unchanged() {
        let f = fixture(OutOfRange::Reject).await;
        let (source, a) = f.list_with("S", &["a0", "a1", "a2"]).await;
        let (dest, _) = f.list_with("D", &["b0", "b1"]).await;

        // Both shifts succeed, the final placement fails
        f.storage.fail_after_writes(2).await;
        let result = f
            .manager
            .move_item(ItemRef::Card(a[0]), ContainerKey::List(dest), 0)
            .await;
        assert!(matches!(result, Err(BoardError::StorageError(_))));

        assert_eq!(f.titles(source).await, ["a0:0", "a1:1", "a2:2"]);
        assert_eq!(f.titles(dest).await, ["b0:0", "b1:1"]);
    }

    #[tokio::test]
    async fn test_delete_compacts() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, cards) = f.list_with("L", &["A", "B", "C", "D"]).await;

        f.manager.delete_item(ItemRef::Card(cards[2])).await.unwrap();

        assert_eq!(f.titles(list).await, ["A:0", "B:1", "D:2"]);
    }

    #[tokio::test]
    async fn test_delete_list_removes_cards_and_compacts_lists() {
        let f = fixture(OutOfRange::Reject).await;
        let (first, _) = f.list_with("First", &["a"]).await;
        let (second, cards) = f.list_with("Second", &["b", "c"]).await;
        let (third, _) = f.list_with("Third", &[]).await;

        f.manager.delete_item(ItemRef::List(second)).await.unwrap();

        let user = f.user;
        let (lists, orphan) = read(f.storage.as_ref(), move |tx| {
            Ok((tx.lists_of(user)?, tx.card(cards[0])?))
        })
        .await
        .unwrap();
        assert_eq!(
            lists.iter().map(|l| (l.id, l.index)).collect::<Vec<_>>(),
            vec![(first, 0), (third, 1)]
        );
        assert!(orphan.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_item() {
        let f = fixture(OutOfRange::Reject).await;
        let result = f.manager.delete_item(ItemRef::Card(CardId::new(5))).await;
        assert!(matches!(result, Err(BoardError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_insert_at_explicit_index_opens_slot() {
        let f = fixture(OutOfRange::Reject).await;
        let (list, _) = f.list_with("L", &["A", "B"]).await;

        f.manager
            .insert_card(list, "X".to_string(), Some(1))
            .await
            .unwrap();
        f.manager
            .insert_card(list, "Y".to_string(), Some(3))
            .await
            .unwrap();

        assert_eq!(f.titles(list).await, ["A:0", "X:1", "B:2", "Y:3"]);

        let result = f.manager.insert_card(list, "Z".to_string(), Some(9)).await;
        assert!(matches!(result, Err(BoardError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_move_list_within_board() {
        let f = fixture(OutOfRange::Reject).await;
        let (a, _) = f.list_with("A", &[]).await;
        let (b, _) = f.list_with("B", &[]).await;
        let (c, _) = f.list_with("C", &[]).await;

        f.manager.move_list(c, f.user, 0).await.unwrap();

        let user = f.user;
        let lists = read(f.storage.as_ref(), move |tx| tx.lists_of(user))
            .await
            .unwrap();
        assert_eq!(
            lists.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![c, a, b]
        );
        assert!(is_dense(lists.iter().map(|l| l.index)));
    }

    #[tokio::test]
    async fn test_random_walk_keeps_density() {
        let f = fixture(OutOfRange::Clamp).await;
        let (first, mut cards) = f.list_with("First", &["a", "b", "c", "d"]).await;
        let (second, more) = f.list_with("Second", &["e", "f", "g"]).await;
        cards.extend(more);
        let lists = [first, second];

        // Deterministic pseudo-random sequence
        let mut seed: u64 = 0x5eed;
        let mut next = move |bound: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % bound
        };

        for _ in 0..60 {
            let card = cards[next(cards.len() as u64) as usize];
            let to = lists[next(2) as usize];
            let index = next(6) as i64;
            f.manager
                .move_item(ItemRef::Card(card), ContainerKey::List(to), index)
                .await
                .unwrap();
        }

        let (a, b) = (f.titles(first).await, f.titles(second).await);
        assert_eq!(a.len() + b.len(), 7);
    }
}
