//! User roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a user account.
///
/// Roles double as the authorization attributes attached to an authenticated
/// identity; [`Role::authority`] yields the conventional string form used in
/// policy rules and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular chat user
    User,
    /// Operator with administrative endpoints enabled
    Admin,
}

impl Role {
    /// Conventional authority string for this role.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::from_str::<Role>("\"admin\"").unwrap(), Role::Admin);
    }

    #[test]
    fn authority_strings() {
        assert_eq!(Role::User.authority(), "ROLE_USER");
        assert_eq!(Role::Admin.authority(), "ROLE_ADMIN");
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }
}
