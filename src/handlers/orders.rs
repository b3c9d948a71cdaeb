// src/handlers/orders.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        gig::{Gig, GigStatus},
        order::{CreateOrderRequest, Order, OrderListParams, OrderStatus, StatusUpdateRequest},
    },
    utils::jwt::Claims,
};

/// Which side of the order is asking for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Buyer,
    Seller,
    Admin,
}

impl Actor {
    fn as_str(&self) -> &'static str {
        match self {
            Actor::Buyer => "buyer",
            Actor::Seller => "seller",
            Actor::Admin => "admin",
        }
    }
}

/// New column values produced by a status-change request.
#[derive(Debug, Clone, PartialEq)]
struct StatusChange {
    status: OrderStatus,
    cancel_reason: Option<String>,
    cancelled_by: Option<String>,
    buyer_completed_at: Option<DateTime<Utc>>,
    seller_completed_at: Option<DateTime<Utc>>,
}

/// Applies one "set status" request to an order.
///
/// Rules:
/// - 'cancelled' is absorbing: nothing moves out of it.
/// - Cancelling requires a non-empty reason and records which role did it.
/// - 'complete' records a per-role acknowledgment timestamp; the status
///   flips only once both sides have acknowledged.
/// - Every other status in the allowed set is applied directly.
fn apply_transition(
    order: &Order,
    requested: OrderStatus,
    actor: Actor,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::BadRequest(
            "Order is cancelled; no further status changes are accepted".to_string(),
        ));
    }

    let mut change = StatusChange {
        status: order.status,
        cancel_reason: order.cancel_reason.clone(),
        cancelled_by: order.cancelled_by.clone(),
        buyer_completed_at: order.buyer_completed_at,
        seller_completed_at: order.seller_completed_at,
    };

    match requested {
        OrderStatus::Cancelled => {
            let reason = reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest("Cancellation requires a reason".to_string())
                })?;
            change.status = OrderStatus::Cancelled;
            change.cancel_reason = Some(reason.to_string());
            change.cancelled_by = Some(actor.as_str().to_string());
        }
        OrderStatus::Complete => {
            match actor {
                Actor::Buyer => {
                    if change.buyer_completed_at.is_none() {
                        change.buyer_completed_at = Some(now);
                    }
                }
                Actor::Seller => {
                    if change.seller_completed_at.is_none() {
                        change.seller_completed_at = Some(now);
                    }
                }
                Actor::Admin => {
                    return Err(AppError::BadRequest(
                        "Only the buyer or seller can mark completion".to_string(),
                    ));
                }
            }
            if change.buyer_completed_at.is_some() && change.seller_completed_at.is_some() {
                change.status = OrderStatus::Complete;
            }
        }
        other => {
            change.status = other;
        }
    }

    Ok(change)
}

/// Places an order: the buyer picks a seller by slug, a gig, and
/// optionally one of its packages. The price is captured at order time.
pub async fn create_order(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let buyer_id = claims.user_id()?;

    // 2. Resolve the seller by storefront slug
    let seller_user_id =
        sqlx::query_scalar::<_, i64>("SELECT user_id FROM sellers WHERE slug = ?1")
            .bind(payload.seller_slug.trim())
            .fetch_optional(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .ok_or(AppError::NotFound("Seller not found".to_string()))?;

    // 3. The gig must belong to that seller and be live
    let gig = sqlx::query_as::<_, Gig>("SELECT * FROM gigs WHERE id = ?1")
        .bind(payload.gig_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Gig not found".to_string()))?;

    if gig.seller_id != seller_user_id {
        return Err(AppError::BadRequest(
            "Gig does not belong to this seller".to_string(),
        ));
    }
    if gig.status != GigStatus::Published {
        return Err(AppError::BadRequest(
            "Gig is not available for ordering".to_string(),
        ));
    }
    if buyer_id == seller_user_id {
        return Err(AppError::BadRequest(
            "You cannot order your own gig".to_string(),
        ));
    }

    // 4. Price comes from the chosen package, or the base offer
    let price = match payload.package_id {
        Some(package_id) => {
            gig.packages
                .0
                .iter()
                .find(|p| p.id == package_id)
                .map(|p| p.price)
                .ok_or(AppError::BadRequest("Unknown package".to_string()))?
        }
        None => gig.price,
    };

    let now = Utc::now();
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (gig_id, buyer_id, seller_id, price, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)
        RETURNING *
        "#,
    )
    .bind(gig.id)
    .bind(buyer_id)
    .bind(seller_user_id)
    .bind(price)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create order: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Lists the caller's orders, newest first. `?role=seller` switches
/// from purchases to sales.
pub async fn list_orders(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let as_seller = params.role.as_deref() == Some("seller");
    let sql = if as_seller {
        "SELECT * FROM orders WHERE seller_id = ?1 ORDER BY created_at DESC"
    } else {
        "SELECT * FROM orders WHERE buyer_id = ?1 ORDER BY created_at DESC"
    };

    let orders = sqlx::query_as::<_, Order>(sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list orders: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(orders))
}

/// Fetches one order. Only the two parties and admins may see it.
pub async fn get_order(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Order not found".to_string()))?;

    if order.buyer_id != user_id && order.seller_id != user_id && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You are not a party to this order".to_string(),
        ));
    }

    Ok(Json(order))
}

/// The single "set status" operation for an order.
///
/// Concurrency note: the read and the write are separate statements;
/// two simultaneous updates resolve by last-write-wins, matching the
/// store's per-row semantics.
pub async fn set_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;

    // 2. Fetch the order and place the caller
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or(AppError::NotFound("Order not found".to_string()))?;

    let actor = if claims.role == "admin" {
        Actor::Admin
    } else if order.buyer_id == user_id {
        Actor::Buyer
    } else if order.seller_id == user_id {
        Actor::Seller
    } else {
        return Err(AppError::Forbidden(
            "You are not a party to this order".to_string(),
        ));
    };

    // 3. Unknown status values are a validation error
    let requested = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status '{}'", payload.status)))?;

    let change = apply_transition(&order, requested, actor, payload.reason.as_deref(), Utc::now())?;

    // 4. Persist
    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = ?1, cancel_reason = ?2, cancelled_by = ?3,
            buyer_completed_at = ?4, seller_completed_at = ?5, updated_at = ?6
        WHERE id = ?7
        RETURNING *
        "#,
    )
    .bind(change.status)
    .bind(&change.cancel_reason)
    .bind(&change.cancelled_by)
    .bind(change.buyer_completed_at)
    .bind(change.seller_completed_at)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update order status: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(updated))
}
