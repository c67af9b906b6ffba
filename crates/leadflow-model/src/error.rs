//! Error types for the data model

use crate::ids::{GroupId, UserId};

/// Errors raised while building or reshaping model records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Phone suffix is empty or contains non-digit characters
    #[error("invalid phone number: '{0}'")]
    InvalidPhone(String),

    /// Group not present in the roster
    #[error("unknown group: {0}")]
    UnknownGroup(GroupId),

    /// User not present in the roster
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// User already leads another group
    #[error("user {user} already leads group {group}")]
    AlreadyLeading { user: UserId, group: GroupId },

    /// Tier list is not ascending by threshold
    #[error("badge tiers must be ascending by threshold")]
    UnorderedTiers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display() {
        let err = ModelError::InvalidPhone("12a".to_string());
        assert_eq!(err.to_string(), "invalid phone number: '12a'");

        let err = ModelError::AlreadyLeading {
            user: UserId::from("u1"),
            group: GroupId::from("g1"),
        };
        assert!(err.to_string().contains("already leads"));
    }
}
