// src/models/chat.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Ephemeral typing signal; entries past `expires_at` are pruned on the
/// next thread read or write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEntry {
    pub user_id: i64,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// File attached to a message, referenced by its uploaded URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: Option<String>,
}

/// Represents the 'threads' table: one conversation between a buyer and
/// a seller, optionally tied to a gig.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Thread {
    pub id: i64,

    pub gig_id: Option<i64>,

    pub buyer_id: i64,
    pub seller_id: i64,

    /// User ids allowed to read the thread. Should always contain buyer
    /// and seller; lookups repair the list when it does not.
    pub participants: Json<Vec<i64>>,

    pub typing: Json<Vec<TypingEntry>>,

    pub last_activity: chrono::DateTime<chrono::Utc>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'messages' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,

    pub thread_id: i64,
    pub sender_id: i64,

    pub body: String,

    pub attachments: Json<Vec<Attachment>>,

    /// User ids that have read the message; the sender is included
    /// at creation time.
    pub read_by: Json<Vec<i64>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Thread row plus inbox decorations for the list view.
#[derive(Debug, Serialize, FromRow)]
pub struct ThreadSummary {
    pub id: i64,
    pub gig_id: Option<i64>,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub participants: Json<Vec<i64>>,
    pub last_activity: chrono::DateTime<chrono::Utc>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Body of the most recent message, if any.
    pub last_message: Option<String>,
    /// Messages from others the caller has not read yet.
    pub unread: i64,
}

/// Full thread payload returned by the detail endpoint.
#[derive(Debug, Serialize)]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: Thread,
    pub messages: Vec<Message>,
}

/// DTO for opening (or finding) a conversation with a seller.
#[derive(Debug, Deserialize)]
pub struct OpenThreadRequest {
    /// User id of the seller to talk to.
    pub seller_id: i64,
    pub gig_id: Option<i64>,
}

/// DTO for posting a message. At least one of body or attachments must
/// be present; the handler enforces that.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(max = 5000))]
    pub body: Option<String>,
    #[validate(custom(function = validate_attachments))]
    pub attachments: Option<Vec<Attachment>>,
}

/// Validates attachments: bounded count, each with a usable URL.
fn validate_attachments(items: &[Attachment]) -> Result<(), validator::ValidationError> {
    if items.len() > 10 {
        return Err(validator::ValidationError::new("too_many_attachments"));
    }
    for item in items {
        if item.url.is_empty() || item.url.len() > 500 {
            return Err(validator::ValidationError::new("invalid_attachment_url"));
        }
    }
    Ok(())
}
