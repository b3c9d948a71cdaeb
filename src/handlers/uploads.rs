// src/handlers/uploads.rs

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{config::Config, error::AppError, models::gig::MediaKind};

/// Reads the first file field out of a multipart body and stores it in
/// the upload directory under a fresh uuid name, keeping a sanitized
/// copy of the original extension. Returns the public URL, the original
/// file name and the inferred media kind.
async fn save_upload(
    config: &Config,
    multipart: &mut Multipart,
    require_image: bool,
) -> Result<(String, String, MediaKind), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(original) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let kind = match field.content_type() {
            Some(ct) if ct.starts_with("image/") => MediaKind::Image,
            Some(ct) if ct.starts_with("video/") => MediaKind::Video,
            Some(_) => MediaKind::File,
            None => MediaKind::infer(&original),
        };
        if require_image && kind != MediaKind::Image {
            return Err(AppError::BadRequest(
                "An image file is required".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let ext = std::path::Path::new(&original)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase());
        let stored = match ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&config.upload_dir).await.map_err(|e| {
            tracing::error!("Failed to create upload dir: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
        let path = std::path::Path::new(&config.upload_dir).join(&stored);
        tokio::fs::write(&path, &data).await.map_err(|e| {
            tracing::error!("Failed to store upload: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        return Ok((format!("/uploads/{}", stored), original, kind));
    }

    Err(AppError::BadRequest("No file field in upload".to_string()))
}

/// Accepts any media file (gig galleries, chat attachments).
pub async fn upload_media(
    State(config): State<Config>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (url, name, kind) = save_upload(&config, &mut multipart, false).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "url": url, "name": name, "kind": kind })),
    ))
}

/// Accepts image files only (avatars, cover images).
pub async fn upload_image(
    State(config): State<Config>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (url, name, kind) = save_upload(&config, &mut multipart, true).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "url": url, "name": name, "kind": kind })),
    ))
}
