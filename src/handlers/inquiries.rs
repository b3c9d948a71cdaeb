// src/handlers/inquiries.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        inquiry::{CreateInquiryRequest, Inquiry},
        user::User,
    },
    utils::{
        html::clean_html,
        jwt::{Claims, MaybeClaims},
    },
};

/// Submits a contact-form inquiry to a seller.
///
/// Signed-in senders are attributed and may omit name/email, which then
/// default to the account's. Anonymous senders must provide both.
pub async fn create_inquiry(
    State(pool): State<SqlitePool>,
    Extension(MaybeClaims(claims)): Extension<MaybeClaims>,
    Json(payload): Json<CreateInquiryRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    // 2. The recipient must be a seller
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

    // 3. Resolve sender identity
    let (user_id, name, email) = match &claims {
        Some(claims) => {
            let user_id = claims.user_id()?;
            let user = sqlx::query_as::<_, User>(
                "SELECT id, name, email, password, role, avatar_url, created_at FROM users WHERE id = ?1",
            )
            .bind(user_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

            let name = payload.name.clone().unwrap_or(user.name);
            let email = payload.email.clone().unwrap_or(user.email);
            (Some(user_id), name, email)
        }
        None => {
            let name = payload
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .ok_or(AppError::BadRequest("Name is required".to_string()))?;
            let email = payload
                .email
                .clone()
                .filter(|e| !e.trim().is_empty())
                .ok_or(AppError::BadRequest("Email is required".to_string()))?;
            (None, name, email)
        }
    };

    // 4. Insert
    let inquiry = sqlx::query_as::<_, Inquiry>(
        r#"
        INSERT INTO inquiries (seller_id, user_id, gig_id, name, email, message, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(payload.seller_id)
    .bind(user_id)
    .bind(payload.gig_id)
    .bind(name.trim())
    .bind(email.trim().to_lowercase())
    .bind(clean_html(payload.message.trim()))
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create inquiry: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// The seller's inbox of received inquiries, newest first.
pub async fn list_inquiries(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let inquiries = sqlx::query_as::<_, Inquiry>(
        "SELECT * FROM inquiries WHERE seller_id = ?1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list inquiries: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(inquiries))
}
