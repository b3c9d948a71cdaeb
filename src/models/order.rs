// src/models/order.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Order lifecycle. 'cancelled' is absorbing; 'complete' is reached only
/// through the two-party acknowledgment recorded on the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Delivered,
    Complete,
    Cancelled,
}

impl OrderStatus {
    /// Parses a client-supplied status string. Unknown values are a
    /// validation error, not a deserialization failure.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "in_progress" => Some(OrderStatus::InProgress),
            "delivered" => Some(OrderStatus::Delivered),
            "complete" => Some(OrderStatus::Complete),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Represents the 'orders' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,

    pub gig_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,

    /// Price captured at order time (base gig price or chosen package).
    pub price: f64,

    pub status: OrderStatus,

    /// Populated only on cancellation: the mandatory reason and which
    /// role ('buyer', 'seller' or 'admin') cancelled.
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<String>,

    /// Per-party completion acknowledgments.
    pub buyer_completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub seller_completed_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for placing an order.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    /// Seller storefront slug the buyer is ordering from.
    #[validate(length(min = 1, max = 120))]
    pub seller_slug: String,
    pub gig_id: i64,
    /// Optional package choice; omitted means the base offer.
    pub package_id: Option<i64>,
}

/// DTO for the single "set status" operation.
#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    #[validate(length(min = 1, max = 30))]
    pub status: String,
    /// Required when requesting cancellation.
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Query parameters for listing the caller's orders.
#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    /// 'seller' lists sales; anything else lists purchases.
    pub role: Option<String>,
}
