use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The three entity kinds stored by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    List,
    Card,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::List => write!(f, "list"),
            Self::Card => write!(f, "card"),
        }
    }
}

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const KIND: EntityKind = $kind;

            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::error::BoardError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self).map_err(|_| {
                    crate::error::BoardError::InvalidArgument(format!(
                        "invalid {} id: {}",
                        $kind, s
                    ))
                })
            }
        }
    };
}

surrogate_id!(
    /// Surrogate key of a user row
    UserId,
    EntityKind::User
);
surrogate_id!(
    /// Surrogate key of a list row
    ListId,
    EntityKind::List
);
surrogate_id!(
    /// Surrogate key of a card row
    CardId,
    EntityKind::Card
);
