// src/handlers/reviews.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::review::{CreateReviewRequest, Review, ReviewItem},
    utils::{html::clean_html, jwt::Claims},
};

/// Public review feed for a seller, newest first, with count and
/// average rating.
pub async fn list_reviews(
    State(pool): State<SqlitePool>,
    Path(seller_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE seller_id = ?1")
        .bind(seller_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let average_rating = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(AVG(rating), 0.0) FROM reviews WHERE seller_id = ?1",
    )
    .bind(seller_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let reviews = sqlx::query_as::<_, ReviewItem>(
        r#"
        SELECT r.id, r.seller_id, r.buyer_id, u.name AS buyer_name,
               r.rating, r.text, r.project, r.created_at
        FROM reviews r
        JOIN users u ON u.id = r.buyer_id
        WHERE r.seller_id = ?1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(seller_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list reviews: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "count": count,
        "average_rating": average_rating,
        "reviews": reviews
    })))
}

/// Posts a review for a seller.
///
/// Gated on a qualifying order: the buyer must have an order with this
/// seller in status 'delivered' or 'complete'.
pub async fn create_review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(seller_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let buyer_id = claims.user_id()?;
    if buyer_id == seller_id {
        return Err(AppError::BadRequest(
            "You cannot review yourself".to_string(),
        ));
    }

    // 2. The target must be a seller
    sqlx::query_scalar::<_, i64>("SELECT id FROM sellers WHERE user_id = ?1")
        .bind(seller_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Seller not found".to_string()))?;

    // 3. Find a qualifying order
    let order_id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM orders
        WHERE buyer_id = ?1 AND seller_id = ?2 AND status IN ('delivered', 'complete')
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(buyer_id)
    .bind(seller_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::Forbidden(
        "A delivered or completed order is required to leave a review".to_string(),
    ))?;

    // 4. Insert
    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (seller_id, buyer_id, order_id, rating, text, project, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(seller_id)
    .bind(buyer_id)
    .bind(order_id)
    .bind(payload.rating)
    .bind(clean_html(payload.text.trim()))
    .bind(payload.project.as_deref().map(str::trim))
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create review: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(review)))
}
