// src/models/favorite.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'favorites' table: a (user, kind, target) bookmark,
/// unique per tuple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Favorite {
    pub id: i64,

    pub user_id: i64,

    /// 'gig' or 'seller'.
    pub kind: String,

    /// Gig id, or the seller's user id, depending on kind.
    pub target_id: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for saving a bookmark.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFavoriteRequest {
    #[validate(custom(function = validate_favorite_kind))]
    pub kind: String,
    pub target_id: i64,
}

/// Query parameters for listing the caller's bookmarks.
#[derive(Debug, Deserialize)]
pub struct FavoriteListParams {
    pub kind: Option<String>,
}

pub fn validate_favorite_kind(kind: &str) -> Result<(), validator::ValidationError> {
    match kind {
        "gig" | "seller" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_favorite_kind")),
    }
}
