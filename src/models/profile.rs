// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

/// Represents the 'sellers' table: the public selling identity attached
/// one-to-one to a user account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SellerProfile {
    pub id: i64,

    pub user_id: i64,

    /// Public storefront name; the slug is derived from it.
    pub display_name: String,

    /// URL-safe unique identifier, regenerated whenever the display
    /// name changes.
    pub slug: String,

    pub bio: Option<String>,

    /// Stored as JSON arrays in the database.
    /// `sqlx::types::Json` handles automatic serialization/deserialization.
    pub skills: Json<Vec<String>>,
    pub languages: Json<Vec<String>>,

    pub hourly_rate: Option<f64>,

    /// External links (portfolio, social).
    pub links: Json<Vec<String>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a seller profile.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(
        min = 2,
        max = 80,
        message = "Display name length must be between 2 and 80 characters."
    ))]
    pub display_name: String,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    #[validate(custom(function = validate_tags))]
    pub skills: Option<Vec<String>>,
    #[validate(custom(function = validate_tags))]
    pub languages: Option<Vec<String>>,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub hourly_rate: Option<f64>,
    #[validate(custom(function = validate_links))]
    pub links: Option<Vec<String>>,
}

/// DTO for partial profile updates.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 80))]
    pub display_name: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    #[validate(custom(function = validate_tags))]
    pub skills: Option<Vec<String>>,
    #[validate(custom(function = validate_tags))]
    pub languages: Option<Vec<String>>,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub hourly_rate: Option<f64>,
    #[validate(custom(function = validate_links))]
    pub links: Option<Vec<String>>,
}

/// Query parameters for the public profile directory.
#[derive(Debug, Deserialize)]
pub struct ProfileListParams {
    /// Free-text filter matched against display names and skills.
    pub q: Option<String>,
}

/// Validates a tag list (skills, languages): bounded count, bounded length.
fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 20 {
        return Err(validator::ValidationError::new("too_many_tags"));
    }
    for tag in tags {
        if tag.is_empty() || tag.len() > 50 {
            return Err(validator::ValidationError::new("invalid_tag"));
        }
    }
    Ok(())
}

/// Validates a collection of URLs, ensuring each meets length and format requirements.
fn validate_links(links: &[String]) -> Result<(), validator::ValidationError> {
    if links.len() > 10 {
        return Err(validator::ValidationError::new("too_many_links"));
    }
    for link in links {
        if link.len() > 500 {
            return Err(validator::ValidationError::new("url_too_long"));
        }
        if Url::parse(link).is_err() {
            return Err(validator::ValidationError::new("invalid_url"));
        }
    }
    Ok(())
}
