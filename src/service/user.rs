//! User Service Implementation
//!
//! Account creation, credential checks and the profile view used by `/auth/me`.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    requests::{LoginRequest, MeResponse, MembershipSummary, SignupRequest, TeamAdminSummary},
    user::{User, UserWithPassword},
};
use crate::utils::{
    error::AppError,
    security::{hash_password_with_cost, verify_password, DEFAULT_BCRYPT_COST},
    validation::{format_validation_errors, normalize_email},
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, is_platform_admin, created_at, updated_at";

#[derive(Error, Debug)]
pub enum UserServiceError {
    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    HashingError(#[from] bcrypt::BcryptError),
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => AppError::NotFound("User not found".to_string()),
            UserServiceError::EmailAlreadyExists => {
                AppError::Conflict("Email already exists".to_string())
            }
            UserServiceError::InvalidCredentials => {
                AppError::Authentication("Invalid credentials".to_string())
            }
            UserServiceError::ValidationError(msg) => AppError::Validation(msg),
            UserServiceError::DatabaseError(e) => AppError::Database(e),
            UserServiceError::HashingError(e) => AppError::HashingError(e),
        }
    }
}

pub type UserServiceResult<T> = Result<T, UserServiceError>;

/// Account management backed by the `users` table
#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,

    /// bcrypt cost factor for password hashing
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self {
            db_pool,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Lower cost for tests and tooling
    pub fn with_bcrypt_cost(db_pool: PgPool, bcrypt_cost: u32) -> Self {
        Self {
            db_pool,
            bcrypt_cost,
        }
    }

    /// Registers a regular (non-admin) account
    pub async fn signup(&self, request: SignupRequest) -> UserServiceResult<User> {
        request
            .validate()
            .map_err(|e| UserServiceError::ValidationError(format_validation_errors(&e)))?;

        self.insert_user(&request.name, &request.email, &request.password, false)
            .await
    }

    /// Creates a platform administrator; used by `league-admin create-admin`
    pub async fn create_platform_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> UserServiceResult<User> {
        let request = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        request
            .validate()
            .map_err(|e| UserServiceError::ValidationError(format_validation_errors(&e)))?;

        self.insert_user(name, email, password, true).await
    }

    async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        is_platform_admin: bool,
    ) -> UserServiceResult<User> {
        let password_hash = hash_password_with_cost(password, self.bcrypt_cost)?;

        let user = sqlx::query_as::<_, UserWithPassword>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, is_platform_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(name.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(is_platform_admin)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_email_key") => {
                UserServiceError::EmailAlreadyExists
            }
            other => UserServiceError::DatabaseError(other),
        })?;

        log::info!("Created user {} (platform admin: {})", user.id, is_platform_admin);
        Ok(user.into())
    }

    /// Checks credentials; unknown email and wrong password are indistinguishable
    pub async fn authenticate(&self, request: &LoginRequest) -> UserServiceResult<User> {
        request
            .validate()
            .map_err(|e| UserServiceError::ValidationError(format_validation_errors(&e)))?;

        let user = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(normalize_email(&request.email))
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::debug!("Failed login for user {}", user.id);
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user.into())
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> UserServiceResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, is_platform_admin, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(UserServiceError::UserNotFound)
    }

    pub async fn get_user_by_email(&self, email: &str) -> UserServiceResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, is_platform_admin, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(UserServiceError::UserNotFound)
    }

    /// The caller's account with every membership and team-admin grant
    pub async fn me(&self, user_id: Uuid) -> UserServiceResult<MeResponse> {
        let user = self.get_user_by_id(user_id).await?;

        let memberships = sqlx::query_as::<_, MembershipSummary>(
            r#"
            SELECT o.id AS organization_id, o.name AS organization_name, m.role
            FROM organization_members m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1
            ORDER BY o.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        let administered_teams = sqlx::query_as::<_, TeamAdminSummary>(
            r#"
            SELECT t.id AS team_id, t.name AS team_name, t.organization_id
            FROM team_admins ta
            JOIN teams t ON t.id = ta.team_id
            WHERE ta.user_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(MeResponse {
            user,
            memberships,
            administered_teams,
        })
    }

    /// Grants or revokes platform administration
    pub async fn set_platform_admin(&self, email: &str, is_admin: bool) -> UserServiceResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_platform_admin = $2, updated_at = NOW()
            WHERE email = $1
            RETURNING id, name, email, is_platform_admin, created_at, updated_at
            "#,
        )
        .bind(normalize_email(email))
        .bind(is_admin)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(UserServiceError::UserNotFound)
    }

    pub async fn health_check(&self) -> UserServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}
