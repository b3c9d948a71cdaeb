// src/models/analytics.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'analytics_events' table: immutable view events
/// consumed only by read-side aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalyticsEvent {
    pub id: i64,

    /// Currently always 'gig_view'.
    pub event_type: String,

    pub seller_id: i64,

    /// Present when the viewer was signed in.
    pub viewer_id: Option<i64>,

    pub gig_id: Option<i64>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for recording a view event.
#[derive(Debug, Deserialize)]
pub struct RecordViewRequest {
    pub seller_id: i64,
    pub gig_id: Option<i64>,
}

/// Query parameters for the seller engagement report.
#[derive(Debug, Deserialize)]
pub struct SellerReportParams {
    /// Rolling window size; defaults to 30 days.
    pub window_days: Option<i64>,
    /// Response SLA threshold; defaults to 24 hours.
    pub sla_hours: Option<f64>,
    /// Admins may inspect another seller; ignored for everyone else.
    pub seller_id: Option<i64>,
}

/// Aggregated engagement metrics for one seller over a window.
#[derive(Debug, Serialize)]
pub struct SellerReport {
    pub window_days: i64,
    pub sla_hours: f64,

    pub views: i64,
    pub orders: i64,
    /// orders / views; 0 when there are no views.
    pub conversion_rate: f64,

    pub buyer_messages: i64,
    pub seller_messages: i64,
    /// Buyer messages that received a later seller reply.
    pub responded: i64,
    pub within_sla: i64,
    /// within_sla / buyer_messages, so unanswered messages count against
    /// compliance; 0 when there were no buyer messages.
    pub sla_rate: f64,
    /// Mean response time in hours, two decimals; 0 with no responses.
    pub avg_response_hours: f64,
}
