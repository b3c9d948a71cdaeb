// src/handlers/analytics.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use sqlx::prelude::FromRow;

use crate::{
    config::{DEFAULT_SLA_HOURS, DEFAULT_WINDOW_DAYS},
    error::AppError,
    models::analytics::{RecordViewRequest, SellerReport, SellerReportParams},
    utils::jwt::{Claims, MaybeClaims},
};

/// One loaded message, the minimum needed for response pairing.
#[derive(Debug, FromRow)]
struct MessageStamp {
    thread_id: i64,
    sender_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default, PartialEq)]
struct ResponseMetrics {
    buyer_messages: i64,
    seller_messages: i64,
    responded: i64,
    within_sla: i64,
    total_response_secs: i64,
}

/// Single pass over messages sorted by (thread_id, created_at): buyer
/// messages queue up per thread, and the next seller-authored message
/// answers everything queued. One seller reply therefore counts as the
/// response to every buyer message still waiting in that thread, and a
/// buyer message with no later seller message goes unanswered.
fn response_metrics(messages: &[MessageStamp], seller_id: i64, sla: Duration) -> ResponseMetrics {
    let mut metrics = ResponseMetrics::default();
    let mut current_thread: Option<i64> = None;
    let mut pending: Vec<DateTime<Utc>> = Vec::new();

    for message in messages {
        if current_thread != Some(message.thread_id) {
            current_thread = Some(message.thread_id);
            pending.clear();
        }

        if message.sender_id == seller_id {
            metrics.seller_messages += 1;
            for sent_at in pending.drain(..) {
                let elapsed = message.created_at - sent_at;
                metrics.responded += 1;
                if elapsed <= sla {
                    metrics.within_sla += 1;
                }
                metrics.total_response_secs += elapsed.num_seconds();
            }
        } else {
            metrics.buyer_messages += 1;
            pending.push(message.created_at);
        }
    }

    metrics
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Records a gig-view event. Anonymous viewers are accepted; signed-in
/// viewers are attributed.
pub async fn record_view(
    State(pool): State<SqlitePool>,
    Extension(MaybeClaims(claims)): Extension<MaybeClaims>,
    Json(payload): Json<RecordViewRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. The viewed seller must exist
    sqlx::query_scalar::<_, i64>("SELECT id FROM sellers WHERE user_id = ?1")
        .bind(payload.seller_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Seller not found".to_string()))?;

    if let Some(gig_id) = payload.gig_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM gigs WHERE id = ?1")
            .bind(gig_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .ok_or(AppError::NotFound("Gig not found".to_string()))?;
    }

    let viewer_id = match &claims {
        Some(claims) => Some(claims.user_id()?),
        None => None,
    };

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO analytics_events (event_type, seller_id, viewer_id, gig_id, created_at)
        VALUES ('gig_view', ?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(payload.seller_id)
    .bind(viewer_id)
    .bind(payload.gig_id)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record view: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Engagement report for a seller over a rolling window: view and order
/// counts, conversion, and response-time SLA metrics derived from chat
/// activity. Admins may inspect another seller via ?seller_id.
pub async fn seller_report(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SellerReportParams>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != "seller" && claims.role != "admin" {
        return Err(AppError::Forbidden("Seller account required".to_string()));
    }

    let seller_id = match (claims.role.as_str(), params.seller_id) {
        ("admin", Some(target)) => target,
        _ => claims.user_id()?,
    };

    let window_days = params.window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !(1..=365).contains(&window_days) {
        return Err(AppError::BadRequest(
            "window_days must be between 1 and 365".to_string(),
        ));
    }

    let sla_hours = params.sla_hours.unwrap_or(DEFAULT_SLA_HOURS);
    if !sla_hours.is_finite() || sla_hours <= 0.0 {
        return Err(AppError::BadRequest(
            "sla_hours must be positive".to_string(),
        ));
    }

    let window_start = Utc::now() - Duration::days(window_days);
    let sla = Duration::seconds((sla_hours * 3600.0) as i64);

    // 1. Simple event counts
    let views = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM analytics_events
        WHERE seller_id = ?1 AND event_type = 'gig_view' AND created_at >= ?2
        "#,
    )
    .bind(seller_id)
    .bind(window_start)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let orders = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE seller_id = ?1 AND created_at >= ?2",
    )
    .bind(seller_id)
    .bind(window_start)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    // 2. Response pairing over the seller's threads
    let messages = sqlx::query_as::<_, MessageStamp>(
        r#"
        SELECT m.thread_id, m.sender_id, m.created_at
        FROM messages m
        JOIN threads t ON t.id = m.thread_id
        WHERE t.seller_id = ?1 AND m.created_at >= ?2
        ORDER BY m.thread_id ASC, m.created_at ASC, m.id ASC
        "#,
    )
    .bind(seller_id)
    .bind(window_start)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load messages for report: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let metrics = response_metrics(&messages, seller_id, sla);

    let conversion_rate = if views == 0 {
        0.0
    } else {
        orders as f64 / views as f64
    };
    // Unanswered buyer messages count against SLA compliance
    let sla_rate = if metrics.buyer_messages == 0 {
        0.0
    } else {
        metrics.within_sla as f64 / metrics.buyer_messages as f64
    };
    let avg_response_hours = if metrics.responded == 0 {
        0.0
    } else {
        round2(metrics.total_response_secs as f64 / metrics.responded as f64 / 3600.0)
    };

    Ok(Json(SellerReport {
        window_days,
        sla_hours,
        views,
        orders,
        conversion_rate,
        buyer_messages: metrics.buyer_messages,
        seller_messages: metrics.seller_messages,
        responded: metrics.responded,
        within_sla: metrics.within_sla,
        sla_rate,
        avg_response_hours,
    }))
}
