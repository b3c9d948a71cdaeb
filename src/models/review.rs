// src/models/review.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'reviews' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,

    pub seller_id: i64,
    pub buyer_id: i64,

    /// The qualifying order that entitled the buyer to review.
    pub order_id: i64,

    /// 1 to 5.
    pub rating: i64,

    pub text: String,

    /// Optional label naming what the work was about.
    pub project: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Review row joined with the reviewer's public name.
#[derive(Debug, Serialize, FromRow)]
pub struct ReviewItem {
    pub id: i64,
    pub seller_id: i64,
    pub buyer_id: i64,
    pub buyer_name: String,
    pub rating: i64,
    pub text: String,
    pub project: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for posting a review.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i64,
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[validate(length(max = 120))]
    pub project: Option<String>,
}
