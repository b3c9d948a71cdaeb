// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        profile::SellerProfile,
        user::{ChangePasswordRequest, LoginRequest, MeResponse, RegisterRequest, UpdateMeRequest, User},
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
        limiter::LoginRateLimiter,
    },
};

/// Registers a new user.
///
/// Emails are stored lowercase and must be unique. Hashes the password
/// using Argon2 before storing it. Returns 201 Created and the user
/// object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let role = payload.role.as_deref().unwrap_or("buyer");
    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password, role, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, name, email, password, role, avatar_url, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&email)
    .bind(&hashed_password)
    .bind(role)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Email '{}' is already registered", email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Failed attempts are throttled per email; once the window is
/// exhausted the endpoint answers 429 without touching the database.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(limiter): State<LoginRateLimiter>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    if !limiter.check(&email).await {
        return Err(AppError::TooManyRequests(
            "Too many login attempts; try again shortly".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, avatar_url, created_at
        FROM users
        WHERE email = ?1
        "#,
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user
    })))
}

/// Returns the current account, seller profile included when one exists.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, role, avatar_url, created_at FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let seller = sqlx::query_as::<_, SellerProfile>(
        "SELECT * FROM sellers WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(MeResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        avatar_url: user.avatar_url,
        created_at: user.created_at,
        seller,
    }))
}

/// Updates the current account's display fields.
pub async fn update_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Perform updates sequentially if fields are present
    if let Some(name) = &payload.name {
        sqlx::query("UPDATE users SET name = ?1 WHERE id = ?2")
            .bind(name.trim())
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(avatar_url) = &payload.avatar_url {
        sqlx::query("UPDATE users SET avatar_url = ?1 WHERE id = ?2")
            .bind(avatar_url)
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, role, avatar_url, created_at FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(user))
}

/// Changes the current account's password after re-verifying the old one.
pub async fn change_password(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password, role, avatar_url, created_at FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let is_valid = verify_password(&payload.current_password, &user.password)?;
    if !is_valid {
        return Err(AppError::AuthError(
            "Current password is incorrect".to_string(),
        ));
    }

    let hashed = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password = ?1 WHERE id = ?2")
        .bind(&hashed)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update password: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(json!({"message": "Password updated"})))
}
