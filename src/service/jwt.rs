//! JWT Authentication Service
//!
//! Provides JWT token generation, validation, and session management functionality.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::auth::{
    AccessTokenClaims, AuthSession, RefreshTokenClaims, TokenKind, TokenPair, UserContext,
    TOKEN_ISSUER,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::security::hash_sensitive_data;

/// JWT authentication service for token management and validation
#[derive(Clone)]
pub struct JwtService {
    pool: PgPool,
    access_secret: String,
    refresh_secret: String,
    access_token_expires_in: Duration,
    refresh_token_expires_in: Duration,
}

impl JwtService {
    /// Create a new JWT service with the default lifetimes (1 hour / 30 days)
    pub fn new(pool: PgPool, access_secret: String, refresh_secret: String) -> Self {
        Self::with_expiration(
            pool,
            access_secret,
            refresh_secret,
            Duration::hours(1),
            Duration::days(30),
        )
    }

    pub fn from_config(pool: PgPool, config: &JwtConfig) -> Self {
        Self::with_expiration(
            pool,
            config.access_secret.clone(),
            config.refresh_secret.clone(),
            Duration::minutes(config.access_token_expires_minutes),
            Duration::days(config.refresh_token_expires_days),
        )
    }

    pub fn with_expiration(
        pool: PgPool,
        access_secret: String,
        refresh_secret: String,
        access_expires_in: Duration,
        refresh_expires_in: Duration,
    ) -> Self {
        Self {
            pool,
            access_secret,
            refresh_secret,
            access_token_expires_in: access_expires_in,
            refresh_token_expires_in: refresh_expires_in,
        }
    }

    /// Generate a new access and refresh token pair, opening a session
    pub async fn generate_token_pair(
        &self,
        user_id: Uuid,
        user_agent: Option<String>,
    ) -> AppResult<TokenPair> {
        let now = Utc::now();
        let access_expires_at = now + self.access_token_expires_in;
        let refresh_expires_at = now + self.refresh_token_expires_in;

        let access_claims = AccessTokenClaims::new(user_id, access_expires_at, now);
        let access_token = self.encode_access_token(&access_claims)?;

        let session_id = Uuid::new_v4();
        let refresh_claims = RefreshTokenClaims::new(user_id, session_id, refresh_expires_at, now);
        let refresh_token = self.encode_refresh_token(&refresh_claims)?;

        self.create_session(
            session_id,
            user_id,
            &refresh_token,
            refresh_expires_at,
            user_agent,
        )
        .await?;

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            self.access_token_expires_in.num_seconds(),
        ))
    }

    /// Issue a fresh access token for a valid refresh token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let session_id = self.decode_refresh_token(refresh_token)?.sid;

        let session = self.get_session(session_id).await?;
        if session.is_expired(Utc::now()) {
            self.delete_session(session_id).await?;
            return Err(AppError::Authentication("Refresh token expired".into()));
        }

        if session.refresh_token_hash != hash_sensitive_data(refresh_token) {
            return Err(AppError::Authentication("Invalid refresh token".into()));
        }

        let now = Utc::now();
        let access_expires_at = now + self.access_token_expires_in;
        let access_claims = AccessTokenClaims::new(session.user_id, access_expires_at, now);
        let access_token = self.encode_access_token(&access_claims)?;

        self.update_session_last_used(session_id).await?;

        Ok(TokenPair::new(
            access_token,
            refresh_token.to_string(),
            self.access_token_expires_in.num_seconds(),
        ))
    }

    /// Validate an access token and extract user context
    pub fn validate_access_token(&self, token: &str) -> AppResult<UserContext> {
        let claims = self.decode_access_token(token)?;
        Ok(UserContext::from(&claims))
    }

    /// Revoke a refresh token by deleting its session
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> AppResult<()> {
        let claims = self.decode_refresh_token(refresh_token)?;
        self.delete_session(claims.sid).await
    }

    /// Revoke all sessions for a user
    pub async fn revoke_all_user_sessions(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn cleanup_expired_sessions(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    fn encode_access_token(&self, claims: &AccessTokenClaims) -> AppResult<String> {
        let encoding_key = EncodingKey::from_secret(self.access_secret.as_ref());

        encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn encode_refresh_token(&self, claims: &RefreshTokenClaims) -> AppResult<String> {
        let encoding_key = EncodingKey::from_secret(self.refresh_secret.as_ref());

        encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn decode_access_token(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let decoding_key = DecodingKey::from_secret(self.access_secret.as_ref());

        let claims = decode::<AccessTokenClaims>(token, &decoding_key, &token_validation())
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid access token: {}", e)))?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Authentication("Wrong token type".into()));
        }
        Ok(claims)
    }

    fn decode_refresh_token(&self, token: &str) -> AppResult<RefreshTokenClaims> {
        let decoding_key = DecodingKey::from_secret(self.refresh_secret.as_ref());

        let claims = decode::<RefreshTokenClaims>(token, &decoding_key, &token_validation())
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid refresh token: {}", e)))?;

        if claims.kind != TokenKind::Refresh {
            return Err(AppError::Authentication("Wrong token type".into()));
        }
        Ok(claims)
    }

    async fn create_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        user_agent: Option<String>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (id, user_id, refresh_token_hash, expires_at, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_sensitive_data(refresh_token))
        .bind(expires_at)
        .bind(user_agent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> AppResult<AuthSession> {
        sqlx::query_as::<_, AuthSession>(
            r#"
            SELECT id, user_id, refresh_token_hash, expires_at, created_at, last_used_at, user_agent
            FROM auth_sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Authentication("Session not found".into()))
    }

    async fn update_session_last_used(&self, session_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE auth_sessions SET last_used_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn token_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation
}
