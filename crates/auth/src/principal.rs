use std::collections::BTreeSet;

use serde::Serialize;

use crate::Role;

/// The verified identity of one request.
///
/// Built fresh from a verified token on every request and passed explicitly
/// down the request path. Never stored in ambient or thread-bound state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    subject: String,
    roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject: subject.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Unique username the token was issued to.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_roles_collapse() {
        let p = Principal::new("alice", [Role::USER, Role::USER, Role::ADMIN]);
        assert_eq!(p.roles().len(), 2);
        assert!(p.is_admin());
    }

    #[test]
    fn lowercase_admin_is_not_admin() {
        let p = Principal::new("bob", [Role::new("admin")]);
        assert!(!p.is_admin());
    }
}
