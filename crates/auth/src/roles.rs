use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name used for role-based access checks.
///
/// Roles are opaque, case-sensitive strings at this layer. The only built-in
/// meaning is [`Role::ADMIN`], which overrides every ownership check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Administrative role.
    pub const ADMIN: Role = Role(Cow::Borrowed("ADMIN"));

    /// Default role granted to every self-registered identity.
    pub const USER: Role = Role(Cow::Borrowed("USER"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate a role name arriving from an untrusted boundary.
    ///
    /// Accepts non-empty names made of ASCII alphanumerics and `_`.
    pub fn parse(name: &str) -> Option<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then(|| Self(Cow::Owned(name.to_string())))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
