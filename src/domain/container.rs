use crate::domain::ids::{CardId, EntityKind, ListId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of an ordered collection: a user's lists or a list's cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ContainerKey {
    User(UserId),
    List(ListId),
}

impl ContainerKey {
    /// Kind of the entity that owns the container
    pub fn owner_kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::List(_) => EntityKind::List,
        }
    }

    pub fn owner_id(&self) -> i64 {
        match self {
            Self::User(id) => id.get(),
            Self::List(id) => id.get(),
        }
    }

    /// Kind of the items the container holds
    pub fn item_kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::List,
            Self::List(_) => EntityKind::Card,
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_kind(), self.owner_id())
    }
}

/// Reference to a positioned item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ItemRef {
    List(ListId),
    Card(CardId),
}

impl ItemRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::List(_) => EntityKind::List,
            Self::Card(_) => EntityKind::Card,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::List(id) => id.get(),
            Self::Card(id) => id.get(),
        }
    }

    /// Whether `container` holds items of this kind
    pub fn fits(&self, container: &ContainerKey) -> bool {
        self.kind() == container.item_kind()
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Container plus index: where an item sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub container: ContainerKey,
    pub index: i64,
}

impl Slot {
    pub fn new(container: ContainerKey, index: i64) -> Self {
        Self { container, index }
    }
}

/// Closed range of indices, both ends inclusive
///
/// Open-ended ranges use `i64::MAX` as the upper end, so the bounds can be
/// bound directly as SQL parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    start: i64,
    end: i64,
}

impl IndexRange {
    pub fn between(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Every index `>= start`
    pub fn starting_at(start: i64) -> Self {
        Self {
            start,
            end: i64::MAX,
        }
    }

    /// Every index `> index`
    pub fn above(index: i64) -> Self {
        Self::starting_at(index.saturating_add(1))
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn contains(&self, index: i64) -> bool {
        self.start <= index && index <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end == i64::MAX {
            write!(f, "[{}, ..)", self.start)
        } else {
            write!(f, "[{}, {}]", self.start, self.end)
        }
    }
}

/// Checks that `indices` is exactly `{0, 1, ..., n-1}`
pub fn is_dense(indices: impl IntoIterator<Item = i64>) -> bool {
    let mut sorted: Vec<i64> = indices.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(expected, &index)| index == expected as i64)
}
