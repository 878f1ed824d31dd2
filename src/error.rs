use crate::domain::EntityKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("{kind} {id} does not belong to {owner_kind} {owner}")]
    Forbidden {
        kind: EntityKind,
        id: i64,
        owner_kind: EntityKind,
        owner: i64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[cfg(feature = "sqlite-storage")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BoardError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether the error should abort the current request.
    ///
    /// Lookups that miss, ownership denials and rejected arguments are
    /// ordinary outcomes the request layer maps to a response. Anything
    /// raised by the store itself is not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NotFound { .. }
            | Self::Forbidden { .. }
            | Self::InvalidArgument(_)
            | Self::UserAlreadyExists(_) => false,
            Self::StorageError(_) | Self::ConfigError(_) | Self::IoError(_) => true,
            #[cfg(feature = "sqlite-storage")]
            Self::Database(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_outcomes_are_not_fatal() {
        assert!(!BoardError::not_found(EntityKind::Card, 3).is_fatal());
        assert!(!BoardError::Forbidden {
            kind: EntityKind::List,
            id: 1,
            owner_kind: EntityKind::User,
            owner: 2
        }
        .is_fatal());
        assert!(!BoardError::InvalidArgument("negative index".to_string()).is_fatal());
        assert!(BoardError::StorageError("disk full".to_string()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = BoardError::not_found(EntityKind::List, 7);
        assert_eq!(err.to_string(), "list not found: 7");

        let err = BoardError::Forbidden {
            kind: EntityKind::Card,
            id: 4,
            owner_kind: EntityKind::User,
            owner: 9,
        };
        assert_eq!(err.to_string(), "card 4 does not belong to user 9");
    }
}
