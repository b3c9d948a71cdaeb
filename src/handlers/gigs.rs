// src/handlers/gigs.rs

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
    models::gig::{
        CreateGigRequest, Gig, GigListParams, GigPackage, GigResponse, GigStatus, MediaItem,
        MediaItemInput, PackageInput, UpdateGigRequest,
    },
    utils::{
        html::clean_html,
        jwt::{Claims, MaybeClaims},
    },
};

const GIG_COLUMNS: &str = r#"
    g.id, g.seller_id, g.title, g.category, g.description, g.price, g.status,
    g.media, g.packages, g.created_at, g.updated_at,
    s.display_name AS seller_display_name, s.slug AS seller_slug
"#;

/// Resolves incoming media entries, inferring the kind from the URL
/// when the client did not name one.
fn normalize_media(items: Vec<MediaItemInput>) -> Vec<MediaItem> {
    items
        .into_iter()
        .map(|item| {
            let kind = item.kind.unwrap_or_else(|| {
                crate::models::gig::MediaKind::infer(&item.url)
            });
            MediaItem { url: item.url, kind }
        })
        .collect()
}

/// Assigns sequential ids to incoming packages.
fn normalize_packages(items: Vec<PackageInput>) -> Vec<GigPackage> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, p)| GigPackage {
            id: (i + 1) as i64,
            name: p.name,
            description: p.description,
            price: p.price,
        })
        .collect()
}

/// Public catalog listing, newest first, keyset-paginated on created_at.
///
/// Anonymous callers and other users see published gigs only. When the
/// seller_id filter names the caller (or the caller is an admin), drafts
/// and archived gigs are included so dashboards can use the same route.
pub async fn list_gigs(
    State(pool): State<SqlitePool>,
    Extension(MaybeClaims(claims)): Extension<MaybeClaims>,
    Query(params): Query<GigListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100); // Default 20, max 100

    let include_unpublished = match (&claims, params.seller_id) {
        (Some(claims), Some(seller_id)) => {
            claims.role == "admin" || claims.user_id()? == seller_id
        }
        _ => false,
    };

    let pattern = params.q.as_deref().map(|q| format!("%{}%", q.trim()));

    let sql = format!(
        r#"
        SELECT {GIG_COLUMNS}
        FROM gigs g
        JOIN sellers s ON s.user_id = g.seller_id
        WHERE (?1 = 1 OR g.status = 'published')
          AND (?2 IS NULL OR g.category = ?2)
          AND (?3 IS NULL OR g.title LIKE ?3)
          AND (?4 IS NULL OR g.seller_id = ?4)
          AND (?5 IS NULL OR g.created_at < ?5)
        ORDER BY g.created_at DESC
        LIMIT ?6
        "#
    );

    let gigs = sqlx::query_as::<_, GigResponse>(&sql)
        .bind(include_unpublished as i64)
        .bind(params.category)
        .bind(pattern)
        .bind(params.seller_id)
        .bind(params.cursor)
        .bind(limit)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list gigs: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(gigs))
}

/// Fetches a single gig. Unpublished gigs are visible only to their
/// owner and admins; everyone else gets 404 rather than 403 so drafts
/// do not leak their existence.
pub async fn get_gig(
    State(pool): State<SqlitePool>,
    Extension(MaybeClaims(claims)): Extension<MaybeClaims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        r#"
        SELECT {GIG_COLUMNS}
        FROM gigs g
        JOIN sellers s ON s.user_id = g.seller_id
        WHERE g.id = ?1
        "#
    );

    let gig = sqlx::query_as::<_, GigResponse>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Gig not found".to_string()))?;

    if gig.status != GigStatus::Published {
        let allowed = match &claims {
            Some(claims) => claims.role == "admin" || claims.user_id()? == gig.seller_id,
            None => false,
        };
        if !allowed {
            return Err(AppError::NotFound("Gig not found".to_string()));
        }
    }

    Ok(Json(gig))
}

/// Creates a gig for the calling seller.
/// Requires a seller profile; new gigs default to 'draft'.
pub async fn create_gig(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateGigRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    // 2. Only sellers with a storefront may list
    sqlx::query_scalar::<_, i64>("SELECT id FROM sellers WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::Forbidden("Seller profile required".to_string()))?;

    let status = payload.status.unwrap_or(GigStatus::Draft);
    let media = normalize_media(payload.media.unwrap_or_default());
    let packages = normalize_packages(payload.packages.unwrap_or_default());
    let now = Utc::now();

    // 3. Insert
    let gig = sqlx::query_as::<_, Gig>(
        r#"
        INSERT INTO gigs (seller_id, title, category, description, price, status, media, packages, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(payload.title.trim())
    .bind(payload.category.trim())
    .bind(clean_html(&payload.description))
    .bind(payload.price)
    .bind(status)
    .bind(SqlJson(media))
    .bind(SqlJson(packages))
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create gig: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(gig)))
}

/// Updates a gig. Owner or admin only.
pub async fn update_gig(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateGigRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    // 1. Fetch to check ownership
    let gig = sqlx::query_as::<_, Gig>("SELECT * FROM gigs WHERE id = ?1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Gig not found".to_string()))?;

    // 2. Check permission
    if gig.seller_id != user_id && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You are not allowed to modify this gig".to_string(),
        ));
    }

    let now = Utc::now();

    // 3. Perform updates sequentially if fields are present
    if let Some(title) = &payload.title {
        sqlx::query("UPDATE gigs SET title = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(title.trim())
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(category) = &payload.category {
        sqlx::query("UPDATE gigs SET category = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(category.trim())
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(description) = &payload.description {
        sqlx::query("UPDATE gigs SET description = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(clean_html(description))
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(price) = payload.price {
        sqlx::query("UPDATE gigs SET price = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(price)
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(status) = payload.status {
        sqlx::query("UPDATE gigs SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(media) = payload.media {
        sqlx::query("UPDATE gigs SET media = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(SqlJson(normalize_media(media)))
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    if let Some(packages) = payload.packages {
        sqlx::query("UPDATE gigs SET packages = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(SqlJson(normalize_packages(packages)))
            .bind(now)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    }

    let updated = sqlx::query_as::<_, Gig>("SELECT * FROM gigs WHERE id = ?1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(updated))
}

/// Deletes a gig. Owner or admin only. Gigs referenced by orders or
/// conversations cannot be removed; archive them instead.
pub async fn delete_gig(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    // 1. Fetch to check ownership
    let gig = sqlx::query_as::<_, Gig>("SELECT * FROM gigs WHERE id = ?1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Gig not found".to_string()))?;

    // 2. Check permission
    if gig.seller_id != user_id && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this gig".to_string(),
        ));
    }

    // 3. Delete
    sqlx::query("DELETE FROM gigs WHERE id = ?1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("FOREIGN KEY constraint failed") {
                AppError::Conflict(
                    "Gig is referenced by orders or conversations; archive it instead".to_string(),
                )
            } else {
                tracing::error!("Failed to delete gig: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    Ok(StatusCode::NO_CONTENT)
}
