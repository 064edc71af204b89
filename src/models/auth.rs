//! Authentication Models
//!
//! JWT claims, token pairs and refresh sessions.
//!
//! Access and refresh tokens are signed with different secrets and carry a
//! `type` claim, so one can never be replayed as the other. Claims hold only
//! identity; roles are looked up per request for the organization being
//! addressed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `iss` claim written into and required from every token
pub const TOKEN_ISSUER: &str = "league-service";

/// Refresh session row; the token itself is only stored hashed
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub user_agent: Option<String>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Returned by signup, login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl AccessTokenClaims {
    pub fn new(user_id: Uuid, expires_at: DateTime<Utc>, issued_at: DateTime<Utc>) -> Self {
        Self {
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4(),
            kind: TokenKind::Access,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub iss: String,
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// `auth_sessions.id` this token unlocks
    pub sid: Uuid,
}

impl RefreshTokenClaims {
    pub fn new(
        user_id: Uuid,
        session_id: Uuid,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4(),
            kind: TokenKind::Refresh,
            sid: session_id,
        }
    }
}

/// The authenticated caller, as read from a validated access token
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl From<&AccessTokenClaims> for UserContext {
    fn from(claims: &AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            token_id: claims.jti,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_serialize_type_tag() {
        let now = Utc::now();
        let claims = RefreshTokenClaims::new(Uuid::new_v4(), Uuid::new_v4(), now, now);
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["type"], "refresh");
        assert_eq!(json["iss"], TOKEN_ISSUER);
        assert_eq!(json["sid"], claims.sid.to_string());
    }

    #[test]
    fn test_access_claims_reject_refresh_payload_shape() {
        let now = Utc::now();
        let access = AccessTokenClaims::new(Uuid::new_v4(), now, now);
        let mut json = serde_json::to_value(&access).unwrap();
        json["type"] = "session".into();

        assert!(serde_json::from_value::<AccessTokenClaims>(json).is_err());
    }

    #[test]
    fn test_user_context_from_claims() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::hours(1);

        let claims = AccessTokenClaims::new(user_id, expires_at, now);
        let context = UserContext::from(&claims);

        assert_eq!(context.user_id, user_id);
        assert_eq!(context.token_id, claims.jti);
        assert_eq!(context.expires_at.timestamp(), expires_at.timestamp());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = AuthSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            refresh_token_hash: String::new(),
            expires_at: now,
            created_at: now - Duration::days(1),
            last_used_at: now - Duration::days(1),
            user_agent: None,
        };

        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
