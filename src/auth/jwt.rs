use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub kind: TokenKind,
}

/// Signing and verification keys for both token kinds.
///
/// Access and refresh tokens are signed with different secrets, so a refresh
/// token can never pass access verification even before the kind claim is
/// checked.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl: Duration::from_secs((config.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((config.refresh_ttl_minutes as u64) * 60),
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    /// Verify a token as the expected kind. Expired, malformed, wrong-secret,
    /// and wrong-kind tokens all fail the same way; callers must not leak
    /// which check tripped.
    pub fn verify(&self, token: &str, expected: TokenKind) -> anyhow::Result<Claims> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, key, &validation)?;
        if data.claims.kind != expected {
            anyhow::bail!("unexpected token kind");
        }
        debug!(user_id = %data.claims.sub, kind = ?expected, "jwt verified");
        Ok(data.claims)
    }
}
