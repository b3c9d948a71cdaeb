// src/handlers/profiles.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json as SqlJson;
use validator::Validate;

use crate::{
    error::AppError,
    models::profile::{
        CreateProfileRequest, ProfileListParams, SellerProfile, UpdateProfileRequest,
    },
    utils::{html::clean_html, jwt::Claims, slug::slugify},
};

/// Public seller directory, newest first. Supports a free-text filter
/// matched against display names and skills.
pub async fn list_profiles(
    State(pool): State<SqlitePool>,
    Query(params): Query<ProfileListParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params
        .q
        .as_deref()
        .map(|q| format!("%{}%", q.trim()))
        .filter(|p| p != "%%");

    let profiles = sqlx::query_as::<_, SellerProfile>(
        r#"
        SELECT *
        FROM sellers
        WHERE (?1 IS NULL
               OR display_name LIKE ?1
               OR EXISTS (SELECT 1 FROM json_each(sellers.skills) WHERE json_each.value LIKE ?1))
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(pattern)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list profiles: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(profiles))
}

/// Looks up a storefront by its slug.
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = sqlx::query_as::<_, SellerProfile>("SELECT * FROM sellers WHERE slug = ?1")
        .bind(&slug)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Seller not found".to_string()))?;

    Ok(Json(profile))
}

/// Creates the caller's seller profile and promotes the account to the
/// 'seller' role. One profile per user; the slug is derived from the
/// display name and must be unique.
pub async fn create_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    // 2. One profile per account
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM sellers WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if existing.is_some() {
        return Err(AppError::Conflict("Profile already exists".to_string()));
    }

    // 3. Derive the slug from the display name
    let display_name = payload.display_name.trim().to_string();
    let slug = slugify(&display_name);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Display name must contain at least one alphanumeric character".to_string(),
        ));
    }

    let bio = payload.bio.as_deref().map(clean_html);
    let now = Utc::now();

    let profile = sqlx::query_as::<_, SellerProfile>(
        r#"
        INSERT INTO sellers (user_id, display_name, slug, bio, skills, languages, hourly_rate, links, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&display_name)
    .bind(&slug)
    .bind(bio)
    .bind(SqlJson(payload.skills.unwrap_or_default()))
    .bind(SqlJson(payload.languages.unwrap_or_default()))
    .bind(payload.hourly_rate)
    .bind(SqlJson(payload.links.unwrap_or_default()))
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Display name '{}' is already taken", display_name))
        } else {
            tracing::error!("Failed to create profile: {:?}", e);
            AppError::from(e)
        }
    })?;

    // 4. Promote the account; admins keep their role
    sqlx::query("UPDATE users SET role = 'seller' WHERE id = ?1 AND role = 'buyer'")
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Updates the caller's seller profile. A display-name change
/// regenerates the slug; a slug collision yields 409.
pub async fn update_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let now = Utc::now();

    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM sellers WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    // Perform updates sequentially if fields are present
    if let Some(display_name) = &payload.display_name {
        let display_name = display_name.trim().to_string();
        let slug = slugify(&display_name);
        if slug.is_empty() {
            return Err(AppError::BadRequest(
                "Display name must contain at least one alphanumeric character".to_string(),
            ));
        }
        sqlx::query(
            "UPDATE sellers SET display_name = ?1, slug = ?2, updated_at = ?3 WHERE user_id = ?4",
        )
        .bind(&display_name)
        .bind(&slug)
        .bind(now)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::Conflict(format!("Display name '{}' is already taken", display_name))
            } else {
                tracing::error!("Failed to update profile: {:?}", e);
                AppError::from(e)
            }
        })?;
    }

    if let Some(bio) = &payload.bio {
        sqlx::query("UPDATE sellers SET bio = ?1, updated_at = ?2 WHERE user_id = ?3")
            .bind(clean_html(bio))
            .bind(now)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(skills) = payload.skills {
        sqlx::query("UPDATE sellers SET skills = ?1, updated_at = ?2 WHERE user_id = ?3")
            .bind(SqlJson(skills))
            .bind(now)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(languages) = payload.languages {
        sqlx::query("UPDATE sellers SET languages = ?1, updated_at = ?2 WHERE user_id = ?3")
            .bind(SqlJson(languages))
            .bind(now)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(hourly_rate) = payload.hourly_rate {
        sqlx::query("UPDATE sellers SET hourly_rate = ?1, updated_at = ?2 WHERE user_id = ?3")
            .bind(hourly_rate)
            .bind(now)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(links) = payload.links {
        sqlx::query("UPDATE sellers SET links = ?1, updated_at = ?2 WHERE user_id = ?3")
            .bind(SqlJson(links))
            .bind(now)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let profile = sqlx::query_as::<_, SellerProfile>("SELECT * FROM sellers WHERE user_id = ?1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(profile))
}
