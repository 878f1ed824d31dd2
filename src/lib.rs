//! # Listboard Core
//!
//! Ordering engine for kanban-style boards: users own an ordered sequence
//! of lists, lists own an ordered sequence of cards.
//!
//! Every container (a user's lists, a list's cards) keeps its indices dense,
//! `0..n`, through creates, moves within and across containers, deletes and
//! cascading user deletion. Each of those runs as one storage transaction.
//!
//! Storage backends implement [`Storage`]: [`MemoryStorage`] for tests and
//! embedding, [`SqliteStorage`] (feature `sqlite-storage`) for persistence.

pub mod authorization;
pub mod cascade;
pub mod config;
pub mod domain;
pub mod error;
pub mod position;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use authorization::{Authorized, Authorizer};
pub use cascade::{CascadeReport, CascadingDestroyer};
pub use config::{Config, DatabaseConfig, OrderingConfig, OutOfRange};
pub use domain::{
    board::{Board, BoardList},
    card::Card,
    container::{ContainerKey, IndexRange, ItemRef, Slot},
    ids::{CardId, EntityKind, ListId, UserId},
    list::List,
    user::User,
};
pub use error::{BoardError, Result};
pub use position::PositionManager;
pub use service::BoardService;
pub use storage::{MemoryStorage, Storage, StorageTx, TxMode};

#[cfg(feature = "sqlite-storage")]
pub use storage::SqliteStorage;
