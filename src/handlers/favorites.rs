// src/handlers/favorites.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::favorite::{
        CreateFavoriteRequest, Favorite, FavoriteListParams, validate_favorite_kind,
    },
    utils::jwt::Claims,
};

/// Checks that the bookmark target actually exists for its kind.
async fn target_exists(pool: &SqlitePool, kind: &str, target_id: i64) -> Result<bool, AppError> {
    let sql = match kind {
        "gig" => "SELECT id FROM gigs WHERE id = ?1",
        _ => "SELECT id FROM sellers WHERE user_id = ?1",
    };
    let found = sqlx::query_scalar::<_, i64>(sql)
        .bind(target_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(found.is_some())
}

/// Saves a bookmark. Saving the same (kind, target) twice is not an
/// error; the existing bookmark comes back with 200.
pub async fn create_favorite(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateFavoriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    if !target_exists(&pool, &payload.kind, payload.target_id).await? {
        return Err(AppError::NotFound("Favorite target not found".to_string()));
    }

    let existing = sqlx::query_as::<_, Favorite>(
        "SELECT * FROM favorites WHERE user_id = ?1 AND kind = ?2 AND target_id = ?3",
    )
    .bind(user_id)
    .bind(&payload.kind)
    .bind(payload.target_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if let Some(favorite) = existing {
        return Ok((StatusCode::OK, Json(favorite)));
    }

    let favorite = sqlx::query_as::<_, Favorite>(
        r#"
        INSERT INTO favorites (user_id, kind, target_id, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&payload.kind)
    .bind(payload.target_id)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // A concurrent insert of the same tuple trips the unique index
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict("Already favorited".to_string())
        } else {
            tracing::error!("Failed to create favorite: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(favorite)))
}

/// Lists the caller's bookmarks, optionally one kind only.
pub async fn list_favorites(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<FavoriteListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    if let Some(kind) = &params.kind {
        if validate_favorite_kind(kind).is_err() {
            return Err(AppError::BadRequest("Unknown favorite kind".to_string()));
        }
    }

    let favorites = sqlx::query_as::<_, Favorite>(
        r#"
        SELECT * FROM favorites
        WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(params.kind)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list favorites: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(favorites))
}

/// Removes a bookmark by kind and target.
pub async fn delete_favorite(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((kind, target_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    if validate_favorite_kind(&kind).is_err() {
        return Err(AppError::BadRequest("Unknown favorite kind".to_string()));
    }

    let user_id = claims.user_id()?;

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND kind = ?2 AND target_id = ?3")
        .bind(user_id)
        .bind(&kind)
        .bind(target_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete favorite: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Favorite not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
