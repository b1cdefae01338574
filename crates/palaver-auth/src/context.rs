//! Authenticated identity record.

use palaver_commons::{Role, UserId, UserName};

/// A fully resolved authenticated identity.
///
/// Immutable once constructed for a given frame or request; re-deriving an
/// identity always builds a fresh value, it never mutates an existing one.
/// Frame handlers receive a transient clone valid for one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: UserName,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId, username: UserName, role: Role) -> Self {
        Self {
            user_id,
            username,
            role,
        }
    }

    /// Authority string of this identity's role.
    pub fn authority(&self) -> &'static str {
        self.role.authority()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_principal_and_authority() {
        let user = AuthenticatedUser::new(
            UserId::new("u_alice"),
            UserName::new("alice"),
            Role::User,
        );
        assert_eq!(user.username.as_str(), "alice");
        assert_eq!(user.authority(), "ROLE_USER");
        assert!(!user.is_admin());
    }
}
