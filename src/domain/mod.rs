pub mod board;
pub mod card;
pub mod container;
pub mod ids;
pub mod list;
pub mod plan;
pub mod user;

pub use board::{Board, BoardList};
pub use card::Card;
pub use container::{is_dense, ContainerKey, IndexRange, ItemRef, Slot};
pub use ids::{CardId, EntityKind, ListId, UserId};
pub use list::List;
pub use plan::{MovePlan, Shift};
pub use user::User;
