// src/models/gig.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::user::validate_link_or_path;

/// Listing lifecycle. Only 'published' gigs are visible to the public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum GigStatus {
    Draft,
    Published,
    Archived,
}

/// Media attachment kind, inferred from the file name when not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    /// Guesses the kind from a file name or URL extension. Extensionless
    /// URLs are treated as images, the common case for gallery entries.
    pub fn infer(path: &str) -> Self {
        match mime_guess::from_path(path).first() {
            Some(mime) => match mime.type_().as_str() {
                "image" => MediaKind::Image,
                "video" => MediaKind::Video,
                _ => MediaKind::File,
            },
            None => MediaKind::Image,
        }
    }
}

/// One gallery entry on a gig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    pub kind: MediaKind,
}

/// A named sub-offer with its own price. Identifiers are assigned
/// server-side, sequential within the gig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GigPackage {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

/// Represents the 'gigs' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gig {
    pub id: i64,

    /// User id of the owning seller.
    pub seller_id: i64,

    pub title: String,

    pub category: String,

    pub description: String,

    /// Base price; packages may override it per sub-offer.
    pub price: f64,

    pub status: GigStatus,

    /// Stored as JSON arrays in the database.
    pub media: Json<Vec<MediaItem>>,
    pub packages: Json<Vec<GigPackage>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Gig row joined with the owning seller's storefront identity.
#[derive(Debug, Serialize, FromRow)]
pub struct GigResponse {
    pub id: i64,
    pub seller_id: i64,
    pub title: String,
    pub category: String,
    pub description: String,
    pub price: f64,
    pub status: GigStatus,
    pub media: Json<Vec<MediaItem>>,
    pub packages: Json<Vec<GigPackage>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub seller_display_name: String,
    pub seller_slug: String,
}

/// Incoming media entry; kind is inferred from the URL when omitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaItemInput {
    pub url: String,
    pub kind: Option<MediaKind>,
}

/// Incoming package entry; ids are assigned on write.
#[derive(Debug, Serialize, Deserialize)]
pub struct PackageInput {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

/// DTO for creating a gig.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGigRequest {
    #[validate(length(
        min = 3,
        max = 120,
        message = "Title length must be between 3 and 120 characters."
    ))]
    pub title: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[validate(range(min = 0.0, max = 1000000.0, message = "Price must not be negative."))]
    pub price: f64,
    pub status: Option<GigStatus>,
    #[validate(custom(function = validate_media_items))]
    pub media: Option<Vec<MediaItemInput>>,
    #[validate(custom(function = validate_packages))]
    pub packages: Option<Vec<PackageInput>>,
}

/// DTO for partial gig updates.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGigRequest {
    #[validate(length(min = 3, max = 120))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 1000000.0))]
    pub price: Option<f64>,
    pub status: Option<GigStatus>,
    #[validate(custom(function = validate_media_items))]
    pub media: Option<Vec<MediaItemInput>>,
    #[validate(custom(function = validate_packages))]
    pub packages: Option<Vec<PackageInput>>,
}

/// Query parameters for the public catalog listing.
#[derive(Debug, Deserialize)]
pub struct GigListParams {
    pub category: Option<String>,
    /// Free-text filter matched against titles.
    pub q: Option<String>,
    /// Restrict to one seller (user id); the owner also sees unpublished gigs.
    pub seller_id: Option<i64>,
    /// Keyset cursor: return gigs created strictly before this instant.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
}

/// Validates a media list: bounded count, each entry a URL or upload path.
fn validate_media_items(items: &[MediaItemInput]) -> Result<(), validator::ValidationError> {
    if items.len() > 10 {
        return Err(validator::ValidationError::new("too_many_media_items"));
    }
    for item in items {
        validate_link_or_path(&item.url)?;
    }
    Ok(())
}

/// Validates a package list: bounded count, named, non-negative prices.
fn validate_packages(packages: &[PackageInput]) -> Result<(), validator::ValidationError> {
    if packages.len() > 10 {
        return Err(validator::ValidationError::new("too_many_packages"));
    }
    for package in packages {
        if package.name.is_empty() || package.name.len() > 80 {
            return Err(validator::ValidationError::new("invalid_package_name"));
        }
        if !package.price.is_finite() || package.price < 0.0 {
            return Err(validator::ValidationError::new("invalid_package_price"));
        }
    }
    Ok(())
}
