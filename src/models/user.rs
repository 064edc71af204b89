//! User Model
//!
//! Account data structures. Platform administration is a flag on the account;
//! organization and team roles live in their own tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User representation for external API responses
///
/// Never carries the password hash. All timestamps are UTC.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,

    /// User's display name
    pub name: String,

    /// User's email address (unique, normalized)
    pub email: String,

    /// Whether the user administers the whole platform
    pub is_platform_admin: bool,

    /// Timestamp when the user account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the user profile was last modified
    pub updated_at: DateTime<Utc>,
}

/// Internal user representation including password hash
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserWithPassword {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_platform_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserWithPassword> for User {
    /// Strips the password hash so it can never end up in a response
    fn from(user_with_password: UserWithPassword) -> Self {
        User {
            id: user_with_password.id,
            name: user_with_password.name,
            email: user_with_password.email,
            is_platform_admin: user_with_password.is_platform_admin,
            created_at: user_with_password.created_at,
            updated_at: user_with_password.updated_at,
        }
    }
}
