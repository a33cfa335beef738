pub mod commands;
pub mod wrapper;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{appointment::UserId, utils::ParseTagError};

pub type UserRoleId = u64;

/// Capabilities a user may hold, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    Student,
    Researcher,
    Member,
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Guest,
        Role::Student,
        Role::Researcher,
        Role::Member,
        Role::Admin,
    ];

    /// Roles allowed to book and operate telescope time.
    pub const OBSERVERS: [Role; 4] = [Role::Student, Role::Researcher, Role::Member, Role::Admin];

    /// Observers whose bookings are scheduled without an admin's approval.
    pub const TRUSTED: [Role; 3] = [Role::Researcher, Role::Member, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::Student => "STUDENT",
            Role::Researcher => "RESEARCHER",
            Role::Member => "MEMBER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseTagError::new("role", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRole {
    pub id: UserRoleId,
    pub user_id: UserId,
    pub role: Role,
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        let mut sorted = Role::ALL;
        sorted.sort();
        assert_eq!(sorted, Role::ALL);
        assert!(Role::Guest < Role::Admin);
    }

    #[test]
    fn parses_stored_text() {
        for role in Role::ALL.iter().copied() {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("ROOT".parse::<Role>().is_err());
    }
}
