// src/models/inquiry.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'inquiries' table: a contact-form message to a seller,
/// from an account or an anonymous visitor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Inquiry {
    pub id: i64,

    /// User id of the seller being contacted.
    pub seller_id: i64,

    /// Present when the sender was signed in.
    pub user_id: Option<i64>,

    pub gig_id: Option<i64>,

    pub name: String,
    pub email: String,

    pub message: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting an inquiry. Signed-in senders may omit name and
/// email; anonymous senders must provide both.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInquiryRequest {
    pub seller_id: i64,
    pub gig_id: Option<i64>,
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Message length must be between 1 and 5000 characters."
    ))]
    pub message: String,
}
