use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    error::{IssueError, TokenError},
    models::{Identity, Namespace, Role},
};

const BEARER_PREFIX: &str = "Bearer ";

/// Claims
///
/// The signed payload of a bearer token. Field names on the wire follow the JWT
/// registered claim names (`sub`, `iat`, `exp`, `jti`). `ns` names the id space `sub`
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject_id: i64,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: Role,
    #[serde(rename = "ns")]
    pub namespace: Namespace,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.subject_id,
            display_name: self.display_name.clone(),
            role: self.role,
            namespace: self.namespace,
        }
    }
}

/// IssuedToken
///
/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

/// TokenIssuer
///
/// Signs claims with the process-wide HMAC secret. Built once from configuration at startup.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    header: Header,
}

impl TokenIssuer {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
        }
    }

    pub fn issue(
        &self,
        identity: &Identity,
        ttl: Duration,
    ) -> Result<IssuedToken, IssueError> {
        self.issue_at(identity, ttl, Utc::now())
    }

    /// issue_at
    ///
    /// Builds claims with `issued_at = now` and `expires_at = now + ttl` and signs them.
    /// The token carries identity and role only; no secret of the principal.
    pub fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, IssueError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(IssueError::TtlOverflow)?;
        let claims = Claims {
            subject_id: identity.subject_id,
            display_name: identity.display_name.clone(),
            role: identity.role,
            namespace: identity.namespace,
            issued_at: now.timestamp(),
            expires_at: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&self.header, &claims, &self.key)?;

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }
}

/// TokenVerifier
///
/// Verifies inbound bearer tokens. A pure function of the token string and the current
/// time; holds nothing but the read-only decoding key.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_secret(secret: &str) -> Self {
        // Only the signature is checked by the decoder. Expiry and claim presence are
        // checked afterwards, in that order, against an explicit clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// verify_bearer
    ///
    /// Verifies the raw value of an `Authorization` header.
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<Claims, TokenError> {
        self.verify_bearer_at(header, Utc::now())
    }

    /// The prefix is matched exactly: `Bearer` followed by one space. Whatever follows it
    /// is the token, verbatim, so stray whitespace fails as a bad signature.
    pub fn verify_bearer_at(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let token = header
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::MissingToken)?;

        self.verify_at(token, now)
    }

    /// verify_at
    ///
    /// Runs one verification attempt over a bare token string:
    ///
    /// - anything the decoder rejects (bad signature, wrong algorithm, corrupted segments) → `InvalidSignature`
    /// - missing `exp`, or `exp <= now` → `Expired`
    /// - missing `sub`, `name`, `ns`, `iat` or `jti` → `MalformedClaims`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let payload = decode::<Value>(token, &self.key, &self.validation)
            .map_err(|_| TokenError::InvalidSignature)?
            .claims;

        let Value::Object(payload) = payload else {
            return Err(TokenError::MalformedClaims);
        };

        let expires_at = payload
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(TokenError::Expired)?;
        if expires_at <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        claims_from_payload(&payload, expires_at).ok_or(TokenError::MalformedClaims)
    }
}

fn claims_from_payload(payload: &Map<String, Value>, expires_at: i64) -> Option<Claims> {
    let subject_id = payload.get("sub").and_then(Value::as_i64)?;
    let display_name = payload
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())?
        .to_string();
    let namespace = match payload.get("ns").and_then(Value::as_str)? {
        "user" => Namespace::User,
        "admin" => Namespace::Admin,
        _ => return None,
    };
    let issued_at = payload.get("iat").and_then(Value::as_i64)?;
    let jti = payload
        .get("jti")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())?;
    let role = payload
        .get("role")
        .and_then(Value::as_str)
        .map(Role::from_claim)
        .unwrap_or(Role::Unset);

    Some(Claims {
        subject_id,
        display_name,
        role,
        namespace,
        issued_at,
        expires_at,
        jti,
    })
}
