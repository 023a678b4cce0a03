use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::Role;
use crate::token::TokenError;

/// Signing algorithm named in every token header.
pub const ALGORITHM: &str = "HS256";

/// First token segment. `typ` is optional on the wire, as in JWS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        }
    }
}

/// Claim set carried in the second token segment.
///
/// Field order is the serialization order, which keeps the encoded claims
/// deterministic for a given input. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (unique username).
    pub sub: String,

    /// Issued-at, epoch milliseconds.
    pub iat: i64,

    /// Expiry, epoch milliseconds.
    pub exp: i64,

    /// Issuer identifier of the minting deployment.
    pub iss: String,

    /// Roles held at issue time, sorted.
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl TokenClaims {
    /// Build the claim set for a token issued at `issued_at` living for `ttl`.
    ///
    /// A negative `ttl` is rejected. A zero `ttl` yields a token that is
    /// already expired at `issued_at`.
    pub fn new(
        subject: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        issuer: impl Into<String>,
    ) -> Result<Self, TokenError> {
        if ttl < Duration::zero() {
            return Err(TokenError::InvalidLifetime);
        }
        let iat = issued_at.timestamp_millis();
        let exp = iat
            .checked_add(ttl.num_milliseconds())
            .ok_or(TokenError::InvalidLifetime)?;

        let mut roles: Vec<Role> = roles.into_iter().collect();
        roles.sort();
        roles.dedup();

        Ok(Self {
            sub: subject.into(),
            iat,
            exp,
            iss: issuer.into(),
            roles,
        })
    }

    /// There is no grace period: the token is dead from `exp` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn expiry_is_exclusive_of_exp_instant() {
        let claims =
            TokenClaims::new("alice", [], at(1_000), Duration::milliseconds(500), "api").unwrap();
        assert_eq!(claims.exp, 1_500);
        assert!(!claims.is_expired_at(at(1_499)));
        assert!(claims.is_expired_at(at(1_500)));
    }

    #[test]
    fn negative_ttl_is_rejected() {
        let err = TokenClaims::new("alice", [], at(0), Duration::milliseconds(-1), "api")
            .unwrap_err();
        assert_eq!(err, TokenError::InvalidLifetime);
    }

    #[test]
    fn roles_are_sorted_and_deduplicated() {
        let claims = TokenClaims::new(
            "alice",
            [Role::USER, Role::ADMIN, Role::USER],
            at(0),
            Duration::seconds(1),
            "api",
        )
        .unwrap();
        assert_eq!(claims.roles, vec![Role::ADMIN, Role::USER]);
    }

    #[test]
    fn serialized_claim_order_is_stable() {
        let claims =
            TokenClaims::new("alice", [], at(1_000), Duration::milliseconds(1), "api").unwrap();
        assert_eq!(
            serde_json::to_string(&claims).unwrap(),
            r#"{"sub":"alice","iat":1000,"exp":1001,"iss":"api","roles":[]}"#
        );
    }
}
