// src/handlers/chats.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use sqlx::types::Json as SqlJson;
use validator::Validate;

use crate::{
    config::TYPING_TTL_SECONDS,
    error::AppError,
    models::chat::{
        Attachment, Message, OpenThreadRequest, SendMessageRequest, Thread, ThreadDetail,
        ThreadSummary, TypingEntry,
    },
    utils::{html::clean_html, jwt::Claims},
};

async fn load_thread(pool: &SqlitePool, id: i64) -> Result<Thread, AppError> {
    sqlx::query_as::<_, Thread>("SELECT * FROM threads WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Conversation not found".to_string()))
}

/// Authorizes the caller against a thread, repairing the participant
/// list first when the rightful buyer or seller is missing from it.
/// The repaired list is persisted before the authorization re-check.
async fn authorize_thread(
    pool: &SqlitePool,
    thread: &mut Thread,
    claims: &Claims,
) -> Result<i64, AppError> {
    let user_id = claims.user_id()?;

    let mut participants = thread.participants.0.clone();
    if !participants.contains(&user_id)
        && (user_id == thread.buyer_id || user_id == thread.seller_id)
    {
        for party in [thread.buyer_id, thread.seller_id] {
            if !participants.contains(&party) {
                participants.push(party);
            }
        }
        sqlx::query("UPDATE threads SET participants = ?1 WHERE id = ?2")
            .bind(SqlJson(participants.clone()))
            .bind(thread.id)
            .execute(pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        thread.participants = SqlJson(participants.clone());
    }

    if participants.contains(&user_id) || claims.role == "admin" {
        Ok(user_id)
    } else {
        Err(AppError::Forbidden(
            "You are not a participant in this conversation".to_string(),
        ))
    }
}

/// Drops expired typing entries, persisting only when something changed.
async fn prune_typing(
    pool: &SqlitePool,
    thread: &mut Thread,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let kept: Vec<TypingEntry> = thread
        .typing
        .0
        .iter()
        .filter(|t| t.expires_at > now)
        .cloned()
        .collect();

    if kept.len() != thread.typing.0.len() {
        sqlx::query("UPDATE threads SET typing = ?1 WHERE id = ?2")
            .bind(SqlJson(kept.clone()))
            .bind(thread.id)
            .execute(pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        thread.typing = SqlJson(kept);
    }

    Ok(())
}

/// Opens a conversation with a seller, or returns the existing one for
/// the same (buyer, seller, gig) triple.
pub async fn open_thread(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OpenThreadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let buyer_id = claims.user_id()?;

    if buyer_id == payload.seller_id {
        return Err(AppError::BadRequest(
            "You cannot message yourself".to_string(),
        ));
    }

    // 1. The recipient must be a seller
    sqlx::query_scalar::<_, i64>("SELECT id FROM sellers WHERE user_id = ?1")
        .bind(payload.seller_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Seller not found".to_string()))?;

    // 2. When tied to a gig, the gig must belong to that seller
    if let Some(gig_id) = payload.gig_id {
        let gig_seller = sqlx::query_scalar::<_, i64>("SELECT seller_id FROM gigs WHERE id = ?1")
            .bind(gig_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .ok_or(AppError::NotFound("Gig not found".to_string()))?;
        if gig_seller != payload.seller_id {
            return Err(AppError::BadRequest(
                "Gig does not belong to this seller".to_string(),
            ));
        }
    }

    // 3. Reuse the existing thread for this triple if there is one
    let existing = sqlx::query_as::<_, Thread>(
        "SELECT * FROM threads WHERE buyer_id = ?1 AND seller_id = ?2 AND gig_id IS ?3",
    )
    .bind(buyer_id)
    .bind(payload.seller_id)
    .bind(payload.gig_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if let Some(thread) = existing {
        return Ok((StatusCode::OK, Json(thread)));
    }

    let now = Utc::now();
    let thread = sqlx::query_as::<_, Thread>(
        r#"
        INSERT INTO threads (gig_id, buyer_id, seller_id, participants, typing, last_activity, created_at)
        VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?5)
        RETURNING *
        "#,
    )
    .bind(payload.gig_id)
    .bind(buyer_id)
    .bind(payload.seller_id)
    .bind(SqlJson(vec![buyer_id, payload.seller_id]))
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to open thread: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(thread)))
}

/// The caller's inbox: every conversation they are a side of, most
/// recently active first, with the last message body and unread count.
pub async fn list_threads(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let threads = sqlx::query_as::<_, ThreadSummary>(
        r#"
        SELECT t.id, t.gig_id, t.buyer_id, t.seller_id, t.participants,
               t.last_activity, t.created_at,
               (SELECT m.body FROM messages m
                WHERE m.thread_id = t.id
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT 1) AS last_message,
               (SELECT COUNT(*) FROM messages m
                WHERE m.thread_id = t.id
                  AND m.sender_id != ?1
                  AND NOT EXISTS (SELECT 1 FROM json_each(m.read_by) WHERE json_each.value = ?1)
               ) AS unread
        FROM threads t
        WHERE t.buyer_id = ?1 OR t.seller_id = ?1
        ORDER BY t.last_activity DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list threads: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(threads))
}

/// Fetches one conversation with its messages, oldest first.
///
/// Reading has side effects: the participant list is repaired if the
/// caller was missing, expired typing entries are pruned, and every
/// message from the other side is marked read by the caller.
pub async fn get_thread(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut thread = load_thread(&pool, id).await?;
    let user_id = authorize_thread(&pool, &mut thread, &claims).await?;
    prune_typing(&pool, &mut thread, Utc::now()).await?;

    let mut messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE thread_id = ?1 ORDER BY created_at ASC, id ASC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    // Mark everything from the other side as read, once
    for message in messages.iter_mut() {
        if message.sender_id != user_id && !message.read_by.0.contains(&user_id) {
            message.read_by.0.push(user_id);
            sqlx::query("UPDATE messages SET read_by = ?1 WHERE id = ?2")
                .bind(SqlJson(message.read_by.0.clone()))
                .bind(message.id)
                .execute(&pool)
                .await
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        }
    }

    Ok(Json(ThreadDetail { thread, messages }))
}

/// Posts a message to a conversation. The message must carry text, an
/// attachment, or both; posting clears the sender's typing entry and
/// bumps the thread's last activity.
pub async fn send_message(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut thread = load_thread(&pool, id).await?;
    let user_id = authorize_thread(&pool, &mut thread, &claims).await?;

    let body = payload.body.as_deref().map(str::trim).unwrap_or("");
    let attachments: Vec<Attachment> = payload.attachments.unwrap_or_default();
    if body.is_empty() && attachments.is_empty() {
        return Err(AppError::BadRequest(
            "Message must include text or an attachment".to_string(),
        ));
    }

    let now = Utc::now();
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (thread_id, sender_id, body, attachments, read_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(clean_html(body))
    .bind(SqlJson(attachments))
    .bind(SqlJson(vec![user_id]))
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to send message: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Sending also retires the sender's typing entry
    let typing: Vec<TypingEntry> = thread
        .typing
        .0
        .iter()
        .filter(|t| t.user_id != user_id && t.expires_at > now)
        .cloned()
        .collect();

    sqlx::query("UPDATE threads SET last_activity = ?1, typing = ?2 WHERE id = ?3")
        .bind(now)
        .bind(SqlJson(typing))
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Registers a short-lived typing signal for the caller and returns the
/// currently active entries.
pub async fn typing(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut thread = load_thread(&pool, id).await?;
    let user_id = authorize_thread(&pool, &mut thread, &claims).await?;

    let now = Utc::now();
    let mut typing: Vec<TypingEntry> = thread
        .typing
        .0
        .iter()
        .filter(|t| t.user_id != user_id && t.expires_at > now)
        .cloned()
        .collect();
    typing.push(TypingEntry {
        user_id,
        expires_at: now + chrono::Duration::seconds(TYPING_TTL_SECONDS),
    });

    sqlx::query("UPDATE threads SET typing = ?1 WHERE id = ?2")
        .bind(SqlJson(typing.clone()))
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({ "typing": typing })))
}
