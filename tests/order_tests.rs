// tests/order_tests.rs

use gigmarket::{config::Config, routes, state::AppState};
use sqlx::sqlite::SqlitePoolOptions;

async fn spawn_app() -> String {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "order_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        upload_dir: tempfile::tempdir().unwrap().keep().to_string_lossy().into_owned(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState::new(pool, config);
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a fresh account and returns its bearer token and user id.
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    name: &str,
) -> (String, i64) {
    let email = format!(
        "{}_{}@example.com",
        name.to_lowercase().replace(' ', "."),
        &uuid::Uuid::new_v4().to_string()[..8]
    );
    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"name": name, "email": email, "password": "password123"}))
        .send()
        .await
        .expect("Register failed");

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    (
        login["token"].as_str().expect("Token not found").to_string(),
        login["user"]["id"].as_i64().expect("User id not found"),
    )
}

/// Sets up a seller with a storefront and one published gig carrying two
/// packages. Returns (token, user_id, slug, gig_id).
async fn create_seller_with_gig(
    client: &reqwest::Client,
    address: &str,
    name: &str,
) -> (String, i64, String, i64) {
    let (token, user_id) = register_and_login(client, address, name).await;

    let profile: serde_json::Value = client
        .post(&format!("{}/api/profiles", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"display_name": format!("{} Studio", name)}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let slug = profile["slug"].as_str().unwrap().to_string();

    let gig: serde_json::Value = client
        .post(&format!("{}/api/gigs", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Logo design",
            "category": "design",
            "description": "A nice logo",
            "price": 100.0,
            "status": "published",
            "packages": [
                {"name": "Basic", "price": 50.0},
                {"name": "Pro", "price": 120.0}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let gig_id = gig["id"].as_i64().unwrap();

    (token, user_id, slug, gig_id)
}

#[tokio::test]
async fn test_order_creation_rules() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (seller_token, _, slug, gig_id) =
        create_seller_with_gig(&client, &address, "Order Seller").await;
    let (_, _, other_slug, _) = create_seller_with_gig(&client, &address, "Other Seller").await;
    let (buyer_token, _) = register_and_login(&client, &address, "Order Buyer").await;

    // A draft from the same seller, not orderable
    let draft: serde_json::Value = client
        .post(&format!("{}/api/gigs", address))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({
            "title": "Draft gig",
            "category": "design",
            "description": "Not live yet",
            "price": 10.0
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let draft_id = draft["id"].as_i64().unwrap();

    // 1. Base price is captured when no package is chosen
    let order: serde_json::Value = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["price"], 100.0);

    // 2. A package overrides the price
    let pro: serde_json::Value = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id, "package_id": 2}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pro["price"], 120.0);

    // 3. Unknown package
    let bad_package = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id, "package_id": 99}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_package.status().as_u16(), 400);

    // 4. Unknown seller slug
    let bad_slug = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": "no-such-shop", "gig_id": gig_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_slug.status().as_u16(), 404);

    // 5. The gig must belong to the named seller
    let mismatch = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": other_slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(mismatch.status().as_u16(), 400);

    // 6. Drafts are not orderable
    let not_live = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": draft_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(not_live.status().as_u16(), 400);

    // 7. Sellers cannot order from themselves
    let self_order = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(self_order.status().as_u16(), 400);
}

#[tokio::test]
async fn test_order_visibility() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (seller_token, _, slug, gig_id) =
        create_seller_with_gig(&client, &address, "Visible Seller").await;
    let (buyer_token, _) = register_and_login(&client, &address, "Visible Buyer").await;
    let (stranger_token, _) = register_and_login(&client, &address, "Stranger").await;

    let order: serde_json::Value = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["id"].as_i64().unwrap();

    // 1. The buyer sees it among purchases
    let purchases: Vec<serde_json::Value> = client
        .get(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(purchases.len(), 1);

    // 2. The seller sees it among sales, not purchases
    let sales: Vec<serde_json::Value> = client
        .get(&format!("{}/api/orders?role=seller", address))
        .header("Authorization", format!("Bearer {}", seller_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sales.len(), 1);

    let seller_purchases: Vec<serde_json::Value> = client
        .get(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", seller_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(seller_purchases.is_empty());

    // 3. Third parties get nothing
    let foreign = client
        .get(&format!("{}/api/orders/{}", address, order_id))
        .header("Authorization", format!("Bearer {}", stranger_token))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 403);

    let own = client
        .get(&format!("{}/api/orders/{}", address, order_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status().as_u16(), 200);
}

#[tokio::test]
async fn test_order_completion_needs_both_parties() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (seller_token, _, slug, gig_id) =
        create_seller_with_gig(&client, &address, "Flow Seller").await;
    let (buyer_token, _) = register_and_login(&client, &address, "Flow Buyer").await;

    let order: serde_json::Value = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["id"].as_i64().unwrap();

    // 1. The seller walks the order forward
    for status in ["in_progress", "delivered"] {
        let updated: serde_json::Value = client
            .put(&format!("{}/api/orders/{}/status", address, order_id))
            .header("Authorization", format!("Bearer {}", seller_token))
            .json(&serde_json::json!({"status": status}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(updated["status"], status);
    }

    // 2. The buyer acknowledging alone does not complete the order
    let half: serde_json::Value = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"status": "complete"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(half["status"], "delivered");
    assert!(!half["buyer_completed_at"].is_null());
    assert!(half["seller_completed_at"].is_null());
    let first_ack = half["buyer_completed_at"].as_str().unwrap().to_string();

    // 3. Repeating the acknowledgment keeps the original timestamp
    let again: serde_json::Value = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"status": "complete"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["status"], "delivered");
    assert_eq!(again["buyer_completed_at"].as_str().unwrap(), first_ack);

    // 4. The seller's acknowledgment completes it
    let done: serde_json::Value = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({"status": "complete"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(done["status"], "complete");
    assert!(!done["buyer_completed_at"].is_null());
    assert!(!done["seller_completed_at"].is_null());
}

#[tokio::test]
async fn test_order_cancellation_is_terminal() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (seller_token, _, slug, gig_id) =
        create_seller_with_gig(&client, &address, "Cancel Seller").await;
    let (buyer_token, _) = register_and_login(&client, &address, "Cancel Buyer").await;

    let order: serde_json::Value = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["id"].as_i64().unwrap();

    // 1. A reason is mandatory
    let no_reason = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"status": "cancelled"}))
        .send()
        .await
        .unwrap();
    assert_eq!(no_reason.status().as_u16(), 400);

    // 2. Cancelling records the reason and who did it
    let cancelled: serde_json::Value = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"status": "cancelled", "reason": "Found someone else"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancelled_by"], "buyer");
    assert_eq!(cancelled["cancel_reason"], "Found someone else");

    // 3. Nothing moves out of cancelled
    let revive = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({"status": "in_progress"}))
        .send()
        .await
        .unwrap();
    assert_eq!(revive.status().as_u16(), 400);

    let cancel_again = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"status": "cancelled", "reason": "Still no"}))
        .send()
        .await
        .unwrap();
    assert_eq!(cancel_again.status().as_u16(), 400);

    // 4. Unknown status values are rejected outright
    let unknown = client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"status": "refunded"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 400);
}

#[tokio::test]
async fn test_review_requires_qualifying_order() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (seller_token, seller_id, slug, gig_id) =
        create_seller_with_gig(&client, &address, "Review Seller").await;
    let (buyer_token, _) = register_and_login(&client, &address, "Review Buyer").await;
    let (outsider_token, _) = register_and_login(&client, &address, "Outsider").await;

    let order: serde_json::Value = client
        .post(&format!("{}/api/orders", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["id"].as_i64().unwrap();

    // 1. A pending order does not qualify
    let premature = client
        .post(&format!("{}/api/reviews/{}", address, seller_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"rating": 5, "text": "Great!"}))
        .send()
        .await
        .unwrap();
    assert_eq!(premature.status().as_u16(), 403);

    // 2. Once delivered, the review goes through
    client
        .put(&format!("{}/api/orders/{}/status", address, order_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({"status": "delivered"}))
        .send()
        .await
        .unwrap();

    let review = client
        .post(&format!("{}/api/reviews/{}", address, seller_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({
            "rating": 5,
            "text": "Great <script>alert(1)</script>work",
            "project": "Logo refresh"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(review.status().as_u16(), 201);
    let review: serde_json::Value = review.json().await.unwrap();
    assert!(!review["text"].as_str().unwrap().contains("script"));

    // 3. Rating bounds are enforced
    let too_high = client
        .post(&format!("{}/api/reviews/{}", address, seller_id))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"rating": 6, "text": "Off the scale"}))
        .send()
        .await
        .unwrap();
    assert_eq!(too_high.status().as_u16(), 400);

    // 4. No order, no review
    let outsider = client
        .post(&format!("{}/api/reviews/{}", address, seller_id))
        .header("Authorization", format!("Bearer {}", outsider_token))
        .json(&serde_json::json!({"rating": 1, "text": "Never hired them"}))
        .send()
        .await
        .unwrap();
    assert_eq!(outsider.status().as_u16(), 403);

    // 5. Sellers cannot review themselves, and the target must be a seller
    let self_review = client
        .post(&format!("{}/api/reviews/{}", address, seller_id))
        .header("Authorization", format!("Bearer {}", seller_token))
        .json(&serde_json::json!({"rating": 5, "text": "I am the best"}))
        .send()
        .await
        .unwrap();
    assert_eq!(self_review.status().as_u16(), 400);

    let not_a_seller = client
        .post(&format!("{}/api/reviews/999999", address))
        .header("Authorization", format!("Bearer {}", buyer_token))
        .json(&serde_json::json!({"rating": 3, "text": "Who?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(not_a_seller.status().as_u16(), 404);

    // 6. The public feed aggregates count and average
    let feed: serde_json::Value = client
        .get(&format!("{}/api/reviews/{}", address, seller_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed["count"], 1);
    assert_eq!(feed["average_rating"], 5.0);
    assert_eq!(feed["reviews"][0]["buyer_name"], "Review Buyer");
}

#[tokio::test]
async fn test_review_average_over_multiple_buyers() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (seller_token, seller_id, slug, gig_id) =
        create_seller_with_gig(&client, &address, "Rated Seller").await;

    for (name, rating) in [("Happy Buyer", 5), ("Mild Buyer", 4)] {
        let (buyer_token, _) = register_and_login(&client, &address, name).await;

        let order: serde_json::Value = client
            .post(&format!("{}/api/orders", address))
            .header("Authorization", format!("Bearer {}", buyer_token))
            .json(&serde_json::json!({"seller_slug": slug, "gig_id": gig_id}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let order_id = order["id"].as_i64().unwrap();

        client
            .put(&format!("{}/api/orders/{}/status", address, order_id))
            .header("Authorization", format!("Bearer {}", seller_token))
            .json(&serde_json::json!({"status": "delivered"}))
            .send()
            .await
            .unwrap();

        let review = client
            .post(&format!("{}/api/reviews/{}", address, seller_id))
            .header("Authorization", format!("Bearer {}", buyer_token))
            .json(&serde_json::json!({"rating": rating, "text": "Done well"}))
            .send()
            .await
            .unwrap();
        assert_eq!(review.status().as_u16(), 201);
    }

    let feed: serde_json::Value = client
        .get(&format!("{}/api/reviews/{}", address, seller_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed["count"], 2);
    assert_eq!(feed["average_rating"], 4.5);
    assert_eq!(feed["reviews"].as_array().unwrap().len(), 2);
}
