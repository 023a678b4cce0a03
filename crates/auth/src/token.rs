//! Signed bearer tokens.
//!
//! Wire format: `header.claims.signature`, each segment base64url without
//! padding. The signature is HMAC-SHA256 over `header.claims` keyed by the
//! process-wide secret. Verification is a pure function of the token bytes,
//! the secret and the supplied clock reading; nothing is looked up.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use thiserror::Error;

use crate::claims::{ALGORITHM, TokenClaims, TokenHeader};
use crate::{Principal, Role};

type HmacSha256 = Hmac<Sha256>;

/// Segment separator.
pub const SEPARATOR: char = '.';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token subject does not match the expected subject")]
    SubjectMismatch,

    #[error("token lifetime must not be negative")]
    InvalidLifetime,

    #[error("signing secret must not be empty")]
    InvalidSecret,

    #[error("failed to encode token segment: {0}")]
    Encoding(String),
}

/// Issues and verifies tokens for one signing secret and issuer.
///
/// Immutable after construction; share it behind an `Arc` and call it from
/// any number of concurrent requests.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
    issuer: String,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, issuer: impl Into<String>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidSecret)?;
        Ok(Self {
            mac,
            issuer: issuer.into(),
        })
    }

    /// Mint a token for `subject` valid from `issued_at` for `ttl`.
    pub fn issue(
        &self,
        subject: &str,
        roles: impl IntoIterator<Item = Role>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims::new(subject, roles, issued_at, ttl, self.issuer.clone())?;

        let header = encode_segment(&TokenHeader::default())?;
        let payload = encode_segment(&claims)?;
        let signing_input = format!("{header}{SEPARATOR}{payload}");

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        tracing::debug!(subject, exp = claims.exp, "issued token");
        Ok(format!("{signing_input}{SEPARATOR}{signature}"))
    }

    /// Read the subject claim WITHOUT checking the signature.
    ///
    /// Diagnostics only. Never authorize anything from this value.
    pub fn decode_subject(token: &str) -> Result<String, TokenError> {
        #[derive(Deserialize)]
        struct Subject {
            sub: String,
        }

        let (_, claims, _) = split(token)?;
        let subject: Subject = decode_segment(claims)?;
        Ok(subject.sub)
    }

    /// Verify `token` at `now` and turn it into a [`Principal`].
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// segment count, signature, expiry, then the optional expected subject.
    pub fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expected_subject: Option<&str>,
    ) -> Result<Principal, TokenError> {
        let (header, claims, signature) = split(token)?;

        let signing_input = &token[..header.len() + 1 + claims.len()];
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::SignatureInvalid)?;
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::SignatureInvalid)?;

        let header: TokenHeader = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed);
        }
        let claims: TokenClaims = decode_segment(claims)?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        if let Some(expected) = expected_subject {
            if expected != claims.sub {
                return Err(TokenError::SubjectMismatch);
            }
        }

        Ok(Principal::new(claims.sub, claims.roles))
    }
}

fn split(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None) => Ok((header, claims, signature)),
        _ => Err(TokenError::Malformed),
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY_MS: i64 = 86_400_000;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(secret, "api").unwrap()
    }

    #[test]
    fn alice_scenario() {
        let token = codec("s3cr3t")
            .issue("alice", [], at(1_000), Duration::milliseconds(DAY_MS))
            .unwrap();

        let principal = codec("s3cr3t").verify(&token, at(1_000), None).unwrap();
        assert_eq!(principal.subject(), "alice");
        assert!(principal.roles().is_empty());

        assert_eq!(
            codec("s3cr3t").verify(&token, at(86_401_001), None),
            Err(TokenError::Expired)
        );
        assert_eq!(
            codec("wrong").verify(&token, at(1_000), None),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn expires_exactly_at_exp() {
        let c = codec("k");
        let token = c.issue("alice", [], at(1_000), Duration::milliseconds(10)).unwrap();
        assert!(c.verify(&token, at(1_009), None).is_ok());
        assert_eq!(c.verify(&token, at(1_010), None), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let c = codec("k");
        for token in ["", "abc", "a.b", "a.b.c.d", "...."] {
            assert_eq!(c.verify(token, at(0), None), Err(TokenError::Malformed), "{token:?}");
        }
    }

    #[test]
    fn signed_garbage_claims_are_malformed() {
        let c = codec("k");
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(b"not json");
        let input = format!("{header}.{claims}");
        let mut mac = HmacSha256::new_from_slice(b"k").unwrap();
        mac.update(input.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(
            c.verify(&format!("{input}.{sig}"), at(0), None),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn foreign_algorithm_header_is_malformed() {
        let c = codec("k");
        let token = c.issue("alice", [], at(0), Duration::seconds(60)).unwrap();
        let (_, claims, _) = split(&token).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let input = format!("{header}.{claims}");
        let mut mac = HmacSha256::new_from_slice(b"k").unwrap();
        mac.update(input.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(
            c.verify(&format!("{input}.{sig}"), at(0), None),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn header_without_typ_is_accepted() {
        let c = codec("k");
        let token = c.issue("alice", [], at(0), Duration::seconds(60)).unwrap();
        let (_, claims, _) = split(&token).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let input = format!("{header}.{claims}");
        let mut mac = HmacSha256::new_from_slice(b"k").unwrap();
        mac.update(input.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let principal = c.verify(&format!("{input}.{sig}"), at(0), None).unwrap();
        assert_eq!(principal.subject(), "alice");
    }

    #[test]
    fn swapped_claims_fail_signature() {
        let c = codec("k");
        let alice = c.issue("alice", [], at(0), Duration::seconds(60)).unwrap();
        let mallory = c
            .issue("mallory", [Role::ADMIN], at(0), Duration::seconds(60))
            .unwrap();

        let (h, _, sig) = split(&alice).unwrap();
        let (_, admin_claims, _) = split(&mallory).unwrap();
        let forged = format!("{h}.{admin_claims}.{sig}");

        assert_eq!(c.verify(&forged, at(0), None), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn roles_round_trip() {
        let c = codec("k");
        let token = c
            .issue("root", [Role::ADMIN, Role::USER], at(0), Duration::seconds(60))
            .unwrap();
        let principal = c.verify(&token, at(1), Some("root")).unwrap();
        assert!(principal.is_admin());
        assert!(principal.has_role(&Role::USER));
    }

    #[test]
    fn tampering_is_reported_before_subject_mismatch() {
        let c = codec("k");
        let token = c.issue("alice", [], at(0), Duration::seconds(60)).unwrap();
        let tampered = format!("{}x", &token[..token.len() - 1]);
        assert_eq!(
            c.verify(&tampered, at(0), Some("bob")),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn decode_subject_skips_signature() {
        let token = codec("k")
            .issue("alice", [], at(0), Duration::seconds(60))
            .unwrap();
        let (h, c, _) = split(&token).unwrap();
        assert_eq!(
            TokenCodec::decode_subject(&format!("{h}.{c}.bogus")).unwrap(),
            "alice"
        );
        assert_eq!(TokenCodec::decode_subject("nope"), Err(TokenError::Malformed));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(
            TokenCodec::new("", "api").unwrap_err(),
            TokenError::InvalidSecret
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", codec("super-secret-value"));
        assert!(!rendered.contains("super-secret-value"));
    }

    proptest! {
        #[test]
        fn verify_inverts_issue(
            subject in "[a-z0-9_]{1,24}",
            roles in proptest::collection::vec("[A-Z]{1,8}", 0..4),
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            iat in 0i64..4_000_000_000_000,
            ttl in 1i64..DAY_MS,
            elapsed_frac in 0.0f64..1.0,
        ) {
            let c = TokenCodec::new(&secret, "api").unwrap();
            let roles: Vec<Role> = roles.into_iter().map(Role::new).collect();
            let token = c.issue(&subject, roles.clone(), at(iat), Duration::milliseconds(ttl)).unwrap();

            let now = iat + ((ttl as f64 * elapsed_frac) as i64).min(ttl - 1);
            let principal = c.verify(&token, at(now), Some(&subject)).unwrap();
            prop_assert_eq!(principal.subject(), subject.as_str());
            for role in &roles {
                prop_assert!(principal.has_role(role));
            }
        }

        #[test]
        fn any_signature_edit_is_detected(
            subject in "[a-z]{1,12}",
            idx in any::<proptest::sample::Index>(),
            replacement in proptest::sample::select(
                "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_".chars().collect::<Vec<_>>()
            ),
        ) {
            let c = codec("k");
            let token = c.issue(&subject, [], at(0), Duration::seconds(60)).unwrap();
            let sig_start = token.rfind(SEPARATOR).unwrap() + 1;
            let pos = sig_start + idx.index(token.len() - sig_start);
            let original = token.as_bytes()[pos] as char;
            prop_assume!(original != replacement);

            let mut tampered = token.clone();
            tampered.replace_range(pos..pos + 1, &replacement.to_string());
            prop_assert_eq!(c.verify(&tampered, at(0), None), Err(TokenError::SignatureInvalid));
        }

        #[test]
        fn zero_ttl_is_always_expired(iat in 0i64..4_000_000_000_000, later in 0i64..DAY_MS) {
            let c = codec("k");
            let token = c.issue("alice", [], at(iat), Duration::zero()).unwrap();
            prop_assert_eq!(c.verify(&token, at(iat + later), None), Err(TokenError::Expired));
        }

        #[test]
        fn other_expected_subject_is_rejected(subject in "[a-z]{1,12}", other in "[a-z]{1,12}") {
            prop_assume!(subject != other);
            let c = codec("k");
            let token = c.issue(&subject, [], at(0), Duration::seconds(60)).unwrap();
            prop_assert_eq!(TokenCodec::decode_subject(&token).unwrap(), subject);
            prop_assert_eq!(c.verify(&token, at(0), Some(&other)), Err(TokenError::SubjectMismatch));
        }
    }
}
