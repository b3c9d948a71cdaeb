// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::MAX_UPLOAD_BYTES,
    handlers::{
        analytics, auth, chats, favorites, gigs, inquiries, orders, profiles, reviews, uploads,
    },
    state::AppState,
    utils::jwt::{auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profiles, gigs, orders, reviews,
///   chats, uploads, favorites, inquiries, analytics).
/// * Serves stored uploads under /uploads.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, login limiter).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
        "http://localhost:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected account routes
        .merge(
            Router::new()
                .route("/me", get(auth::me).put(auth::update_me))
                .route("/password", put(auth::change_password))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let profile_routes = Router::new()
        .route("/", get(profiles::list_profiles))
        .route("/{slug}", get(profiles::get_profile))
        .merge(
            Router::new()
                .route("/", post(profiles::create_profile).put(profiles::update_profile))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    // Catalog reads run with optional auth so owners can see their drafts
    let gig_routes = Router::new()
        .merge(
            Router::new()
                .route("/", get(gigs::list_gigs))
                .route("/{id}", get(gigs::get_gig))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/", post(gigs::create_gig))
                .route("/{id}", put(gigs::update_gig).delete(gigs::delete_gig))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let order_routes = Router::new()
        .route("/", post(orders::create_order).get(orders::list_orders))
        .route("/{id}", get(orders::get_order))
        .route("/{id}/status", put(orders::set_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let review_routes = Router::new()
        .route("/{seller_id}", get(reviews::list_reviews))
        .merge(
            Router::new()
                .route("/{seller_id}", post(reviews::create_review))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let chat_routes = Router::new()
        .route("/", post(chats::open_thread).get(chats::list_threads))
        .route("/{id}", get(chats::get_thread))
        .route("/{id}/messages", post(chats::send_message))
        .route("/{id}/typing", post(chats::typing))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let upload_routes = Router::new()
        .route("/media", post(uploads::upload_media))
        .route("/image", post(uploads::upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let favorite_routes = Router::new()
        .route(
            "/",
            post(favorites::create_favorite).get(favorites::list_favorites),
        )
        .route("/{kind}/{target_id}", delete(favorites::delete_favorite))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let inquiry_routes = Router::new()
        .merge(
            Router::new()
                .route("/", post(inquiries::create_inquiry))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/", get(inquiries::list_inquiries))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let analytics_routes = Router::new()
        .merge(
            Router::new()
                .route("/views", post(analytics::record_view))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                )),
        )
        .merge(
            Router::new()
                .route("/seller", get(analytics::seller_report))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profiles", profile_routes)
        .nest("/api/gigs", gig_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/reviews", review_routes)
        .nest("/api/chats", chat_routes)
        .nest("/api/uploads", upload_routes)
        .nest("/api/favorites", favorite_routes)
        .nest("/api/inquiries", inquiry_routes)
        .nest("/api/analytics", analytics_routes)
        // Stored uploads are served straight off the disk
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
