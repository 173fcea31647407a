use serde::{Deserialize, Serialize};

use haulboard_core::{DomainError, DomainResult, UserId};

const MAX_USERNAME_LEN: usize = 64;

/// A registered user. Owns posts, tasks, notifications and outgoing follow edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    pub fn new(username: impl Into<String>) -> DomainResult<Self> {
        Self::with_id(UserId::new(), username)
    }

    pub fn with_id(id: UserId, username: impl Into<String>) -> DomainResult<Self> {
        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(DomainError::validation(format!(
                "username must be at most {MAX_USERNAME_LEN} bytes"
            )));
        }
        if username.contains(char::is_whitespace) || username.contains('/') {
            return Err(DomainError::validation(
                "username must not contain whitespace or '/'",
            ));
        }
        Ok(Self { id, username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed() {
        let u = User::new("  susan ").unwrap();
        assert_eq!(u.username, "susan");
    }

    #[test]
    fn blank_or_spaced_usernames_are_rejected() {
        assert!(matches!(User::new("   "), Err(DomainError::Validation(_))));
        assert!(matches!(User::new("two words"), Err(DomainError::Validation(_))));
        assert!(matches!(User::new("a/b"), Err(DomainError::Validation(_))));
    }
}
