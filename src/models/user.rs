// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::profile::SellerProfile;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    /// Stored lowercase; uniqueness is enforced at the store level.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'buyer', 'seller' or 'admin'.
    pub role: String,

    pub avatar_url: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated account data for the current user, seller profile included
/// when one exists.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub seller: Option<SellerProfile>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 80,
        message = "Name length must be between 1 and 80 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    /// Optional starting role; accounts default to 'buyer'.
    #[validate(custom(function = validate_signup_role))]
    pub role: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for partial account updates.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[validate(custom(function = validate_link_or_path))]
    pub avatar_url: Option<String>,
}

/// DTO for password changes; re-verifies the current password.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub current_password: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub new_password: String,
}

/// Self-service signups may only pick 'buyer' or 'seller'.
fn validate_signup_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        "buyer" | "seller" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_role")),
    }
}

/// Accepts an absolute URL or a server-relative path such as '/uploads/...'.
pub fn validate_link_or_path(value: &str) -> Result<(), validator::ValidationError> {
    if value.len() > 500 {
        return Err(validator::ValidationError::new("url_too_long"));
    }
    if value.starts_with('/') || url::Url::parse(value).is_ok() {
        return Ok(());
    }
    Err(validator::ValidationError::new("invalid_url"))
}
